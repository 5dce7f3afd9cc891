//! Wire types shared by the send and receive workflows.

use std::fmt;

use bytes::Bytes;
use claimcheck_queue::QueueMessageHandle;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Reference token correlating a stored payload with its claim message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(String);

impl ClaimId {
  /// A fresh random (v4 UUID) claim ID.
  pub fn generate() -> Self {
    Self(uuid::Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ClaimId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for ClaimId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

/// The small message that travels through the queue in place of the payload.
///
/// Missing fields deserialize as empty strings so that a malformed message
/// still reaches validation and is abandoned there.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimMessage {
  #[serde(alias = "messageId")]
  pub correlation_id: String,
  pub claim_id: String,
  pub file_name: String,
}

impl ClaimMessage {
  pub fn new(
    correlation_id: impl Into<String>,
    claim_id: &ClaimId,
    file_name: impl Into<String>,
  ) -> Self {
    Self {
      correlation_id: correlation_id.into(),
      claim_id: claim_id.to_string(),
      file_name: file_name.into(),
    }
  }

  /// Decode a queue message body.
  pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(body)
  }

  /// Encode as a JSON queue message body.
  pub fn to_body(&self) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(self).map(Bytes::from)
  }

  /// All three fields must be non-empty.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    if self.correlation_id.is_empty() {
      return Err(WorkflowError::Validation(
        "correlationId cannot be empty".to_string(),
      ));
    }
    if self.claim_id.is_empty() {
      return Err(WorkflowError::Validation("claimId cannot be empty".to_string()));
    }
    if self.file_name.is_empty() {
      return Err(WorkflowError::Validation("fileName cannot be empty".to_string()));
    }
    Ok(())
  }
}

/// Input to the send workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInput {
  #[serde(alias = "messageId")]
  pub correlation_id: String,
  pub file_name: String,
  /// Opaque payload. A JSON string is stored as its raw text; any other
  /// value is stored as serialized JSON.
  pub content: serde_json::Value,
}

impl SendInput {
  pub fn new(
    correlation_id: impl Into<String>,
    file_name: impl Into<String>,
    content: serde_json::Value,
  ) -> Self {
    Self {
      correlation_id: correlation_id.into(),
      file_name: file_name.into(),
      content,
    }
  }

  /// The claim message built from this input needs both fields non-empty.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    if self.correlation_id.is_empty() {
      return Err(WorkflowError::Validation(
        "correlationId cannot be empty".to_string(),
      ));
    }
    if self.file_name.is_empty() {
      return Err(WorkflowError::Validation("fileName cannot be empty".to_string()));
    }
    Ok(())
  }

  /// The bytes stored in the claim store.
  pub fn payload(&self) -> Bytes {
    match &self.content {
      serde_json::Value::String(text) => Bytes::from(text.clone().into_bytes()),
      other => Bytes::from(other.to_string().into_bytes()),
    }
  }
}

/// Result of a send workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SendOutput {
  Success {
    #[serde(rename = "claimId")]
    claim_id: String,
  },
  Failed {
    error: String,
  },
}

impl SendOutput {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success { .. })
  }
}

/// Input to the receive workflow: the decoded claim and its queue lease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveInput {
  pub message: ClaimMessage,
  pub handle: QueueMessageHandle,
}
