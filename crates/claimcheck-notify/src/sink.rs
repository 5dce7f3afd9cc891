use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::{Notification, NotificationSink, NotifyError};

/// A sink that records each notification as a tracing event.
///
/// Useful for local runs where no mail transport is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    if notification.to.trim().is_empty() {
      return Err(NotifyError::Rejected("recipient is empty".to_string()));
    }

    info!(
      to = %notification.to,
      subject = %notification.subject,
      attachment = %notification.attachment.name,
      attachment_bytes = notification.attachment.content.len(),
      "notification sent"
    );
    Ok(())
  }
}

/// A sink that forwards notifications to an unbounded channel.
///
/// Sending fails with [`NotifyError::Transport`] once the receiver is dropped,
/// so a consumer going away surfaces as a delivery failure rather than a
/// silent loss.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
  sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
  pub fn new(sender: mpsc::UnboundedSender<Notification>) -> Self {
    Self { sender }
  }

  /// Create a sink together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

#[async_trait]
impl NotificationSink for ChannelNotificationSink {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    self
      .sender
      .send(notification)
      .map_err(|_| NotifyError::Transport("notification channel closed".to_string()))
  }
}
