//! Claim-Check Notify
//!
//! Downstream delivery for retrieved payloads. The receive workflow hands each
//! payload to a [`NotificationSink`] as an attachment; the sink decides how it
//! leaves the process (email transport, log line, channel to another task).

mod sink;

pub use sink::{ChannelNotificationSink, LogNotificationSink};

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
  /// The notification was rejected before sending (bad recipient, too large).
  #[error("notification rejected: {0}")]
  Rejected(String),

  /// The transport failed to send the notification.
  #[error("notification transport error: {0}")]
  Transport(String),
}

/// A file attached to a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
  pub name: String,
  pub content: Bytes,
}

/// A notification carrying one attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub to: String,
  pub subject: String,
  pub body: String,
  pub attachment: Attachment,
}

/// Sends notifications downstream.
#[async_trait]
pub trait NotificationSink: Send + Sync {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}
