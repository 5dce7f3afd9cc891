//! Send workflow: store the payload, publish the claim.

use std::sync::Arc;

use claimcheck_blob::ClaimStore;
use claimcheck_queue::QueueClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::{Checkpoint, NoopCheckpoint};
use crate::error::WorkflowError;
use crate::message::{ClaimId, ClaimMessage, SendInput, SendOutput};

/// Where a send instance is in its step sequence.
///
/// Input is validated in `Started`; an invalid input goes straight to
/// `Failed` without storing or publishing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendPhase {
  Started,
  Storing,
  Publishing,
  Completed,
  Failed,
}

impl SendPhase {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Started => "started",
      Self::Storing => "storing",
      Self::Publishing => "publishing",
      Self::Completed => "completed",
      Self::Failed => "failed",
    }
  }
}

/// Checkpointed state of a send instance.
///
/// The claim ID is assigned in the first step and persisted before the
/// payload is stored, so a resumed instance keeps its claim ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendState {
  pub input: SendInput,
  pub phase: SendPhase,
  pub claim_id: Option<ClaimId>,
  pub error: Option<String>,
}

impl SendState {
  pub fn new(input: SendInput) -> Self {
    Self {
      input,
      phase: SendPhase::Started,
      claim_id: None,
      error: None,
    }
  }

  /// The final result, once the state is terminal.
  pub fn output(&self) -> Option<SendOutput> {
    match self.phase {
      SendPhase::Completed => Some(match &self.claim_id {
        Some(id) => SendOutput::Success {
          claim_id: id.to_string(),
        },
        None => SendOutput::Failed {
          error: "send completed without a claim id".to_string(),
        },
      }),
      SendPhase::Failed => Some(SendOutput::Failed {
        error: self
          .error
          .clone()
          .unwrap_or_else(|| "send workflow failed".to_string()),
      }),
      _ => None,
    }
  }

  fn fail(mut self, err: WorkflowError) -> Self {
    error!(error = %err, error_kind = err.kind(), "send workflow failed");
    self.error = Some(err.to_string());
    self.phase = SendPhase::Failed;
    self
  }
}

/// Stores a payload under a fresh claim ID and publishes the claim message.
///
/// No step is retried. A publish failure leaves the stored payload orphaned;
/// it is not rolled back.
pub struct SendWorkflow {
  store: Arc<dyn ClaimStore>,
  queue: Arc<dyn QueueClient>,
}

impl SendWorkflow {
  pub fn new(store: Arc<dyn ClaimStore>, queue: Arc<dyn QueueClient>) -> Self {
    Self { store, queue }
  }

  /// Run a send from the beginning without persisting checkpoints.
  pub async fn run(&self, input: SendInput) -> SendOutput {
    self.resume(SendState::new(input), &NoopCheckpoint).await
  }

  /// Drive `state` to a terminal phase, saving it after every step.
  #[instrument(
    name = "send_workflow",
    skip(self, state, checkpoint),
    fields(
      correlation_id = %state.input.correlation_id,
      file_name = %state.input.file_name,
    )
  )]
  pub async fn resume(&self, mut state: SendState, checkpoint: &dyn Checkpoint) -> SendOutput {
    loop {
      if let Some(output) = state.output() {
        return output;
      }

      state = self.step(state).await;

      let phase = state.phase.as_str();
      match serde_json::to_value(&state) {
        Ok(value) => {
          if let Err(e) = checkpoint.save(phase, value).await {
            warn!(phase, error = %e, "failed to checkpoint send state");
          }
        }
        Err(e) => warn!(phase, error = %e, "failed to serialize send state"),
      }
    }
  }

  async fn step(&self, mut state: SendState) -> SendState {
    match state.phase {
      SendPhase::Started => {
        if let Err(err) = state.input.validate() {
          return state.fail(err);
        }

        let claim_id = ClaimId::generate();
        info!(claim_id = %claim_id, "generated claim id");
        state.claim_id = Some(claim_id);
        state.phase = SendPhase::Storing;
        state
      }

      SendPhase::Storing => {
        let Some(claim_id) = state.claim_id.clone() else {
          // Checkpoints written by this workflow always carry the claim id
          // from Storing onwards; regenerate rather than fail.
          state.phase = SendPhase::Started;
          return state;
        };

        let payload = state.input.payload();
        debug!(claim_id = %claim_id, bytes = payload.len(), "storing payload");

        match self.store.put(claim_id.as_str(), payload).await {
          Ok(()) => {
            info!(claim_id = %claim_id, "payload stored");
            state.phase = SendPhase::Publishing;
            state
          }
          Err(source) => state.fail(WorkflowError::Storage {
            claim_id: claim_id.to_string(),
            source,
          }),
        }
      }

      SendPhase::Publishing => {
        let Some(claim_id) = state.claim_id.clone() else {
          state.phase = SendPhase::Started;
          return state;
        };

        let message = ClaimMessage::new(
          state.input.correlation_id.clone(),
          &claim_id,
          state.input.file_name.clone(),
        );
        let body = match message.to_body() {
          Ok(body) => body,
          Err(e) => {
            return state.fail(WorkflowError::Validation(format!(
              "failed to encode claim message: {}",
              e
            )));
          }
        };

        match self.queue.publish(body).await {
          Ok(message_id) => {
            info!(
              claim_id = %claim_id,
              message_id = %message_id,
              queue = %self.queue.queue_name(),
              "claim message published"
            );
            state.phase = SendPhase::Completed;
            state
          }
          Err(source) => {
            warn!(claim_id = %claim_id, "publish failed, stored payload is orphaned");
            state.fail(WorkflowError::QueueProtocol {
              queue: self.queue.queue_name().to_string(),
              source,
            })
          }
        }
      }

      SendPhase::Completed | SendPhase::Failed => state,
    }
  }
}
