//! Workflow error taxonomy.

use claimcheck_blob::BlobError;
use claimcheck_notify::NotifyError;
use claimcheck_queue::QueueError;

/// Every collaborator failure is classified into one of these at the step
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
  /// A claim message is missing a required field.
  #[error("validation failed: {0}")]
  Validation(String),

  /// Claim store put/get/delete failed.
  #[error("storage error for claim '{claim_id}': {source}")]
  Storage {
    claim_id: String,
    #[source]
    source: BlobError,
  },

  /// The notification sink failed to deliver the payload.
  #[error("delivery failed for claim '{claim_id}': {source}")]
  Delivery {
    claim_id: String,
    #[source]
    source: NotifyError,
  },

  /// Publish, complete, or abandon failed on the queue.
  #[error("queue protocol error on '{queue}': {source}")]
  QueueProtocol {
    queue: String,
    #[source]
    source: QueueError,
  },
}

impl WorkflowError {
  /// Short classification used as a structured log field.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Storage { .. } => "storage",
      Self::Delivery { .. } => "delivery",
      Self::QueueProtocol { .. } => "queue_protocol",
    }
  }
}
