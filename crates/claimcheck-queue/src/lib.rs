//! Claim-Check Queue
//!
//! This crate provides the queue client trait used by the claim-check
//! workflows and an in-memory broker implementing it.
//!
//! Delivery is at-least-once. Every received message carries a lease
//! ([`QueueMessageHandle`]) that the consumer must release exactly once, either
//! with [`QueueClient::complete`] (the message is removed) or with
//! [`QueueClient::abandon`] (the lock is released and the broker's own
//! redelivery policy decides what happens next).

mod memory;
mod types;

pub use memory::InMemoryQueue;
pub use types::{QueueMessageHandle, ReceivedMessage};

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
  /// The lease is unknown, expired, or was already released.
  #[error("lock lost for message {message_id} (lock token {lock_token})")]
  LockLost {
    message_id: String,
    lock_token: String,
  },

  /// The queue no longer accepts operations.
  #[error("queue '{0}' is closed")]
  Closed(String),

  /// The broker rejected or failed the operation.
  #[error("queue backend error: {0}")]
  Backend(String),
}

/// Client for a single named queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
  /// Name of the queue this client is bound to.
  fn queue_name(&self) -> &str;

  /// Publish a message body. Returns the broker-assigned message ID.
  async fn publish(&self, body: Bytes) -> Result<String, QueueError>;

  /// Receive up to `max_messages` messages, each locked for this consumer.
  ///
  /// Returns an empty batch when nothing is available.
  async fn receive(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, QueueError>;

  /// Remove a received message from the queue.
  async fn complete(&self, handle: &QueueMessageHandle) -> Result<(), QueueError>;

  /// Release the lock on a received message without removing it.
  async fn abandon(&self, handle: &QueueMessageHandle) -> Result<(), QueueError>;
}
