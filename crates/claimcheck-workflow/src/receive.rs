//! Receive workflow: validate, retrieve, deliver, clean up, release the lease.

use std::sync::Arc;

use bytes::Bytes;
use claimcheck_blob::ClaimStore;
use claimcheck_notify::{Attachment, Notification, NotificationSink};
use claimcheck_queue::QueueClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::{Checkpoint, NoopCheckpoint};
use crate::error::WorkflowError;
use crate::message::ReceiveInput;

const SUCCESS_NOTE: &str = "Successfully processed claim check message.";

/// Where a receive instance is in its step sequence.
///
/// Transitions only move forward:
/// `Started → Validating → Retrieving → Delivering → Finalizing → Completed`,
/// or from any of Validating/Retrieving/Delivering to `Failed → Abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivePhase {
  Started,
  Validating,
  Retrieving,
  Delivering,
  Finalizing,
  Completed,
  Failed,
  Abandoned,
}

impl ReceivePhase {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Started => "started",
      Self::Validating => "validating",
      Self::Retrieving => "retrieving",
      Self::Delivering => "delivering",
      Self::Finalizing => "finalizing",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Abandoned => "abandoned",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Abandoned)
  }
}

/// Which terminal action released the queue lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
  Completed,
  Abandoned,
}

/// Final result of a receive run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOutcome {
  pub disposition: Disposition,
  pub notes: Vec<String>,
  pub error: Option<String>,
}

/// Checkpointed state of a receive instance.
///
/// The payload itself is never part of the state. A resumed instance whose
/// checkpoint says `Delivering` reads it again from the claim store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveState {
  pub input: ReceiveInput,
  pub phase: ReceivePhase,
  pub notes: Vec<String>,
  pub error: Option<String>,
}

impl ReceiveState {
  pub fn new(input: ReceiveInput) -> Self {
    Self {
      input,
      phase: ReceivePhase::Started,
      notes: Vec::new(),
      error: None,
    }
  }

  /// The final result, once the state is terminal.
  pub fn outcome(&self) -> Option<ReceiveOutcome> {
    let disposition = match self.phase {
      ReceivePhase::Completed => Disposition::Completed,
      ReceivePhase::Abandoned => Disposition::Abandoned,
      _ => return None,
    };
    Some(ReceiveOutcome {
      disposition,
      notes: self.notes.clone(),
      error: self.error.clone(),
    })
  }

  fn fail(&mut self, err: WorkflowError) {
    error!(
      error = %err,
      error_kind = err.kind(),
      message_id = %self.input.handle.message_id,
      "claim check receive failed"
    );
    self.notes.push(format!("Error: {}", err));
    self.error = Some(err.to_string());
    self.phase = ReceivePhase::Failed;
  }
}

/// Recipient and body of the notification carrying the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
  pub to: String,
  pub body: String,
}

impl NotificationTemplate {
  fn render(&self, input: &ReceiveInput, payload: Bytes) -> Notification {
    Notification {
      to: self.to.clone(),
      subject: format!("Message received (ID {})", input.message.correlation_id),
      body: self.body.clone(),
      attachment: Attachment {
        name: input.message.file_name.clone(),
        content: payload,
      },
    }
  }
}

/// Consumes one claim message and releases its lease exactly once.
///
/// - The payload is deleted only after the notification was sent.
/// - A delete failure is logged and does not prevent `complete`.
/// - Any failure before delivery succeeds ends in `abandon`; the payload is
///   left in place so a redelivery can succeed.
/// - Failures of `complete`/`abandon` themselves are logged only.
pub struct ReceiveWorkflow {
  store: Arc<dyn ClaimStore>,
  queue: Arc<dyn QueueClient>,
  sink: Arc<dyn NotificationSink>,
  template: NotificationTemplate,
}

impl ReceiveWorkflow {
  pub fn new(
    store: Arc<dyn ClaimStore>,
    queue: Arc<dyn QueueClient>,
    sink: Arc<dyn NotificationSink>,
    template: NotificationTemplate,
  ) -> Self {
    Self {
      store,
      queue,
      sink,
      template,
    }
  }

  /// Run a receive from the beginning without persisting checkpoints.
  pub async fn run(&self, input: ReceiveInput) -> ReceiveOutcome {
    self.resume(ReceiveState::new(input), &NoopCheckpoint).await
  }

  /// Drive `state` to a terminal phase, saving it after every step.
  #[instrument(
    name = "receive_workflow",
    skip(self, state, checkpoint),
    fields(
      message_id = %state.input.handle.message_id,
      claim_id = %state.input.message.claim_id,
    )
  )]
  pub async fn resume(
    &self,
    mut state: ReceiveState,
    checkpoint: &dyn Checkpoint,
  ) -> ReceiveOutcome {
    let mut payload: Option<Bytes> = None;

    loop {
      if let Some(outcome) = state.outcome() {
        return outcome;
      }

      self.step(&mut state, &mut payload).await;

      let phase = state.phase.as_str();
      match serde_json::to_value(&state) {
        Ok(value) => {
          if let Err(e) = checkpoint.save(phase, value).await {
            warn!(phase, error = %e, "failed to checkpoint receive state");
          }
        }
        Err(e) => warn!(phase, error = %e, "failed to serialize receive state"),
      }
    }
  }

  async fn step(&self, state: &mut ReceiveState, payload: &mut Option<Bytes>) {
    match state.phase {
      ReceivePhase::Started => {
        info!(lock_token = %state.input.handle.lock_token, "claim check receive started");
        state.notes.push(format!(
          "Received message with ID: {}",
          state.input.handle.message_id
        ));
        state.phase = ReceivePhase::Validating;
      }

      ReceivePhase::Validating => match state.input.message.validate() {
        Ok(()) => {
          debug!("claim message validated");
          state.phase = ReceivePhase::Retrieving;
        }
        Err(err) => state.fail(err),
      },

      ReceivePhase::Retrieving => {
        let claim_id = &state.input.message.claim_id;
        match self.store.get(claim_id).await {
          Ok(bytes) => {
            info!(bytes = bytes.len(), "payload retrieved");
            *payload = Some(bytes);
            state.phase = ReceivePhase::Delivering;
          }
          Err(source) => {
            let claim_id = claim_id.clone();
            state.fail(WorkflowError::Storage { claim_id, source });
          }
        }
      }

      ReceivePhase::Delivering => {
        let Some(bytes) = payload.take() else {
          // Resumed from a checkpoint; the payload is not persisted.
          debug!("payload not in memory, retrieving again");
          state.phase = ReceivePhase::Retrieving;
          return;
        };

        let notification = self.template.render(&state.input, bytes);
        match self.sink.send(notification).await {
          Ok(()) => {
            info!(to = %self.template.to, "notification delivered");
            state.phase = ReceivePhase::Finalizing;
          }
          Err(source) => {
            let claim_id = state.input.message.claim_id.clone();
            state.fail(WorkflowError::Delivery { claim_id, source });
          }
        }
      }

      ReceivePhase::Finalizing => {
        let claim_id = &state.input.message.claim_id;
        if let Err(source) = self.store.delete(claim_id).await {
          let err = WorkflowError::Storage {
            claim_id: claim_id.clone(),
            source,
          };
          warn!(error = %err, "payload cleanup failed, blob left in store");
        }

        if let Err(source) = self.queue.complete(&state.input.handle).await {
          let err = WorkflowError::QueueProtocol {
            queue: self.queue.queue_name().to_string(),
            source,
          };
          error!(error = %err, error_kind = err.kind(), "failed to complete message");
        }

        info!("claim check message completed");
        state.notes.push(SUCCESS_NOTE.to_string());
        state.phase = ReceivePhase::Completed;
      }

      ReceivePhase::Failed => {
        if let Err(source) = self.queue.abandon(&state.input.handle).await {
          let err = WorkflowError::QueueProtocol {
            queue: self.queue.queue_name().to_string(),
            source,
          };
          error!(error = %err, error_kind = err.kind(), "failed to abandon message");
        }

        info!("claim check message abandoned");
        state.phase = ReceivePhase::Abandoned;
      }

      ReceivePhase::Completed | ReceivePhase::Abandoned => {}
    }
  }
}
