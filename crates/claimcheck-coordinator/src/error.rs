//! Coordinator error types.

use std::time::Duration;

use claimcheck_store::StoreError;

/// Errors returned by the coordinator's caller-facing operations.
///
/// Workflow failures are not errors here; they are reported as a Failed
/// status on the instance.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
  /// No instance with this ID exists.
  #[error("instance '{0}' not found")]
  NotFound(String),

  /// The caller stopped waiting. The instance keeps running.
  #[error("timed out after {waited:?} waiting for instance '{instance_id}'")]
  Timeout {
    instance_id: String,
    waited: Duration,
  },

  /// Workflow input or checkpoint could not be (de)serialized.
  #[error("invalid workflow data: {0}")]
  InvalidData(#[from] serde_json::Error),

  /// The instance store failed.
  #[error("instance store error: {0}")]
  Store(#[source] StoreError),
}

impl From<StoreError> for CoordinatorError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::NotFound(id) => Self::NotFound(id),
      other => Self::Store(other),
    }
  }
}
