use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An opaque lease on a received queue message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessageHandle {
  pub message_id: String,
  pub lock_token: String,
}

/// A message as handed out by [`crate::QueueClient::receive`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
  pub message_id: String,
  pub body: Bytes,
  pub lock_token: String,
  /// How many times this message has been delivered, including this one.
  pub delivery_count: u32,
}

impl ReceivedMessage {
  /// The lease to release once processing finishes.
  pub fn handle(&self) -> QueueMessageHandle {
    QueueMessageHandle {
      message_id: self.message_id.clone(),
      lock_token: self.lock_token.clone(),
    }
  }
}
