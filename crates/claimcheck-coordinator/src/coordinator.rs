//! Instance lifecycle: start, execute, report, resume.

use std::sync::Arc;
use std::time::Duration;

use claimcheck_store::{InstanceStatus, InstanceStore, Json, WorkflowInstance, WorkflowKind};
use claimcheck_workflow::{
  Disposition, ReceiveInput, ReceiveState, ReceiveWorkflow, SendInput, SendOutput, SendState,
  SendWorkflow,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::InstanceCheckpoint;
use crate::error::CoordinatorError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::status::StatusReport;

/// Input for a new workflow instance.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowInput {
  Send(SendInput),
  Receive(ReceiveInput),
}

impl WorkflowInput {
  pub fn kind(&self) -> WorkflowKind {
    match self {
      Self::Send(_) => WorkflowKind::Send,
      Self::Receive(_) => WorkflowKind::Receive,
    }
  }

  fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
    match self {
      Self::Send(input) => serde_json::to_value(input),
      Self::Receive(input) => serde_json::to_value(input),
    }
  }
}

/// Step state an instance task starts from.
enum ExecutionState {
  Send(SendState),
  Receive(ReceiveState),
}

impl ExecutionState {
  fn fresh(input: WorkflowInput) -> Self {
    match input {
      WorkflowInput::Send(input) => Self::Send(SendState::new(input)),
      WorkflowInput::Receive(input) => Self::Receive(ReceiveState::new(input)),
    }
  }

  /// Rebuild state from a stored record: the checkpoint if one was taken,
  /// otherwise the stored input.
  fn restore(record: &WorkflowInstance) -> Result<Self, serde_json::Error> {
    let checkpoint = record.checkpoint.as_ref().map(|json| json.0.clone());
    let input = record.input.0.clone();

    Ok(match (record.kind, checkpoint) {
      (WorkflowKind::Send, Some(state)) => Self::Send(serde_json::from_value(state)?),
      (WorkflowKind::Send, None) => Self::Send(SendState::new(serde_json::from_value(input)?)),
      (WorkflowKind::Receive, Some(state)) => Self::Receive(serde_json::from_value(state)?),
      (WorkflowKind::Receive, None) => {
        Self::Receive(ReceiveState::new(serde_json::from_value(input)?))
      }
    })
  }
}

/// Terminal result of one instance run, ready to be written to its record.
struct Conclusion {
  status: InstanceStatus,
  output: Option<serde_json::Value>,
  error: Option<String>,
}

const RESULT_WRITE_ATTEMPTS: u32 = 3;
const RESULT_WRITE_BACKOFF: Duration = Duration::from_millis(50);

/// Starts workflow instances and tracks them in an [`InstanceStore`].
///
/// Each instance runs as its own tokio task; the caller of [`start`] gets
/// the instance ID back immediately. Cloning is cheap and clones share the
/// same store and workflows.
///
/// [`start`]: WorkflowCoordinator::start
#[derive(Clone)]
pub struct WorkflowCoordinator {
  store: Arc<dyn InstanceStore>,
  send: Arc<SendWorkflow>,
  receive: Arc<ReceiveWorkflow>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl WorkflowCoordinator {
  pub fn new(store: Arc<dyn InstanceStore>, send: SendWorkflow, receive: ReceiveWorkflow) -> Self {
    Self {
      store,
      send: Arc::new(send),
      receive: Arc::new(receive),
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Replace the execution event notifier.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Create an instance for `input`, mark it Running, and spawn its task.
  #[instrument(skip(self, input), fields(kind = ?input.kind()))]
  pub async fn start(&self, input: WorkflowInput) -> Result<String, CoordinatorError> {
    let instance_id = uuid::Uuid::new_v4().to_string();
    let kind = input.kind();

    let mut record = WorkflowInstance::pending(instance_id.clone(), kind, input.to_value()?);
    self.store.create_instance(&record).await?;

    record.status = InstanceStatus::Running;
    record.updated_at = chrono::Utc::now();
    self.store.update_instance(&record).await?;

    info!(instance_id = %instance_id, "workflow instance started");
    self.notifier.notify(ExecutionEvent::InstanceStarted {
      instance_id: instance_id.clone(),
      kind,
    });

    self.spawn(record, ExecutionState::fresh(input));
    Ok(instance_id)
  }

  /// Current status of an instance.
  pub async fn get_status(&self, instance_id: &str) -> Result<StatusReport, CoordinatorError> {
    let record = self.store.get_instance(instance_id).await?;
    Ok(StatusReport::from(record))
  }

  /// Poll until the instance is terminal or `timeout` elapses.
  ///
  /// A timeout only stops the wait; the instance keeps running and a later
  /// [`get_status`](Self::get_status) reports its eventual outcome.
  pub async fn await_completion(
    &self,
    instance_id: &str,
    poll_interval: Duration,
    timeout: Duration,
  ) -> Result<StatusReport, CoordinatorError> {
    let deadline = Instant::now() + timeout;

    loop {
      let report = self.get_status(instance_id).await?;
      if report.is_terminal() {
        return Ok(report);
      }

      let now = Instant::now();
      if now >= deadline {
        warn!(instance_id, ?timeout, "stopped waiting for instance");
        return Err(CoordinatorError::Timeout {
          instance_id: instance_id.to_string(),
          waited: timeout,
        });
      }

      debug!(instance_id, status = ?report.status, "instance not finished yet");
      tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
  }

  /// Start an instance and wait for it to finish.
  pub async fn run_to_completion(
    &self,
    input: WorkflowInput,
    poll_interval: Duration,
    timeout: Duration,
  ) -> Result<StatusReport, CoordinatorError> {
    let instance_id = self.start(input).await?;
    self
      .await_completion(&instance_id, poll_interval, timeout)
      .await
  }

  /// Resume every Pending or Running instance from its last checkpoint.
  ///
  /// Instances whose stored state cannot be decoded are marked Failed.
  /// Returns the IDs of the instances that were resumed.
  #[instrument(skip(self))]
  pub async fn resume_incomplete(&self) -> Result<Vec<String>, CoordinatorError> {
    let unfinished = self.store.list_unfinished().await?;
    let mut resumed = Vec::with_capacity(unfinished.len());

    for mut record in unfinished {
      let state = match ExecutionState::restore(&record) {
        Ok(state) => state,
        Err(e) => {
          error!(instance_id = %record.instance_id, error = %e, "cannot restore instance state");
          let message = format!("cannot restore instance state: {}", e);
          record.status = InstanceStatus::Failed;
          record.error = Some(message.clone());
          record.updated_at = chrono::Utc::now();
          self.store.update_instance(&record).await?;
          self.notifier.notify(ExecutionEvent::InstanceFailed {
            instance_id: record.instance_id,
            error: message,
          });
          continue;
        }
      };

      if record.status == InstanceStatus::Pending {
        record.status = InstanceStatus::Running;
        record.updated_at = chrono::Utc::now();
        self.store.update_instance(&record).await?;
      }

      info!(instance_id = %record.instance_id, kind = ?record.kind, "resuming instance");
      resumed.push(record.instance_id.clone());
      self.spawn(record, state);
    }

    Ok(resumed)
  }

  /// Spawn the instance task plus a watcher that fails the instance if the
  /// task dies without recording a result.
  fn spawn(&self, record: WorkflowInstance, state: ExecutionState) {
    let instance_id = record.instance_id.clone();
    let task = tokio::spawn(self.clone().execute(record, state));

    let coordinator = self.clone();
    tokio::spawn(async move {
      let Err(e) = task.await else {
        return;
      };
      error!(instance_id = %instance_id, error = %e, "workflow task aborted");

      match coordinator.store.get_instance(&instance_id).await {
        Ok(record) => {
          let error = format!("workflow task aborted: {}", e);
          coordinator
            .finish(record, InstanceStatus::Failed, None, Some(error))
            .await;
        }
        Err(e) => {
          error!(instance_id = %instance_id, error = %e, "cannot load aborted instance");
        }
      }
    });
  }

  async fn execute(self, record: WorkflowInstance, state: ExecutionState) {
    let instance_id = record.instance_id.clone();
    let checkpoint = InstanceCheckpoint::new(self.store.clone(), self.notifier.clone(), record);

    let conclusion = match state {
      ExecutionState::Send(state) => {
        let output = self.send.resume(state, &checkpoint).await;
        let (status, error) = match &output {
          SendOutput::Success { .. } => (InstanceStatus::Completed, None),
          SendOutput::Failed { error } => (InstanceStatus::Failed, Some(error.clone())),
        };
        Conclusion {
          status,
          error,
          output: output_value(&instance_id, &output),
        }
      }
      ExecutionState::Receive(state) => {
        let outcome = self.receive.resume(state, &checkpoint).await;
        Conclusion {
          status: match outcome.disposition {
            Disposition::Completed => InstanceStatus::Completed,
            Disposition::Abandoned => InstanceStatus::Failed,
          },
          output: output_value(&instance_id, &outcome),
          error: outcome.error.clone(),
        }
      }
    };

    self
      .finish(
        checkpoint.into_record(),
        conclusion.status,
        conclusion.output,
        conclusion.error,
      )
      .await;
  }

  /// Write the terminal status, retrying with backoff. If every full write
  /// fails, a status-only update is attempted on the stored record so the
  /// instance does not stay Running.
  async fn finish(
    &self,
    mut record: WorkflowInstance,
    status: InstanceStatus,
    output: Option<serde_json::Value>,
    error: Option<String>,
  ) {
    let instance_id = record.instance_id.clone();
    record.status = status;
    record.output = output.map(Json);
    record.error = error.clone();

    let mut recorded = false;
    for attempt in 1..=RESULT_WRITE_ATTEMPTS {
      record.updated_at = chrono::Utc::now();
      match self.store.update_instance(&record).await {
        Ok(()) => {
          recorded = true;
          break;
        }
        Err(e) => {
          warn!(instance_id = %instance_id, attempt, error = %e, "failed to record instance result");
          if attempt < RESULT_WRITE_ATTEMPTS {
            tokio::time::sleep(RESULT_WRITE_BACKOFF * attempt).await;
          }
        }
      }
    }

    if !recorded {
      recorded = self.record_status_only(&instance_id, status, error.clone()).await;
    }
    if !recorded {
      error!(instance_id = %instance_id, status = ?status, "instance result lost");
      return;
    }

    match status {
      InstanceStatus::Completed => {
        info!(instance_id = %instance_id, "workflow instance completed");
        self
          .notifier
          .notify(ExecutionEvent::InstanceCompleted { instance_id });
      }
      _ => {
        let error = error.unwrap_or_else(|| "workflow failed".to_string());
        warn!(instance_id = %instance_id, error = %error, "workflow instance failed");
        self
          .notifier
          .notify(ExecutionEvent::InstanceFailed { instance_id, error });
      }
    }
  }

  async fn record_status_only(
    &self,
    instance_id: &str,
    status: InstanceStatus,
    error: Option<String>,
  ) -> bool {
    let result = async {
      let mut latest = self.store.get_instance(instance_id).await?;
      latest.status = status;
      latest.error = error;
      latest.updated_at = chrono::Utc::now();
      self.store.update_instance(&latest).await
    }
    .await;

    match result {
      Ok(()) => {
        warn!(instance_id, "recorded instance status without output");
        true
      }
      Err(e) => {
        error!(instance_id, error = %e, "failed to record instance status");
        false
      }
    }
  }
}

/// Serialize a workflow result for the instance record.
fn output_value<T: serde::Serialize>(instance_id: &str, value: &T) -> Option<serde_json::Value> {
  match serde_json::to_value(value) {
    Ok(value) => Some(value),
    Err(e) => {
      error!(instance_id, error = %e, "failed to serialize instance output");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[test]
  fn test_output_value_drops_unserializable_output() {
    assert_eq!(
      output_value("inst-1", &serde_json::json!({"status": "Success"})),
      Some(serde_json::json!({"status": "Success"}))
    );

    // Map keys must serialize as strings.
    let unserializable: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
    assert_eq!(output_value("inst-1", &unserializable), None);
  }
}
