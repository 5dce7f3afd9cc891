//! Step state persistence between suspension points.

use async_trait::async_trait;

/// Error type for checkpoint persistence.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
  #[error("failed to serialize workflow state: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to persist checkpoint: {0}")]
  Persist(String),
}

/// Receives the workflow state after every step.
///
/// A failed save does not fail the workflow; the step's side effect has
/// already happened, so the instance keeps running and only loses the ability
/// to resume from that exact step.
#[async_trait]
pub trait Checkpoint: Send + Sync {
  async fn save(&self, phase: &str, state: serde_json::Value) -> Result<(), CheckpointError>;
}

/// A checkpoint that discards every state.
///
/// Used by the one-shot `run` entry points.
#[derive(Debug, Clone, Default)]
pub struct NoopCheckpoint;

#[async_trait]
impl Checkpoint for NoopCheckpoint {
  async fn save(&self, _phase: &str, _state: serde_json::Value) -> Result<(), CheckpointError> {
    Ok(())
  }
}
