//! Persists workflow step state into the instance record.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use claimcheck_store::{InstanceStore, Json, StoreError, WorkflowInstance};
use claimcheck_workflow::{Checkpoint, CheckpointError};

use crate::events::{ExecutionEvent, ExecutionNotifier};

/// Checkpoint sink for one running instance.
///
/// Holds the latest copy of the instance record; each save updates the copy
/// and writes it through to the store. The lock is released before the write.
pub(crate) struct InstanceCheckpoint {
  store: Arc<dyn InstanceStore>,
  notifier: Arc<dyn ExecutionNotifier>,
  record: Mutex<WorkflowInstance>,
}

impl InstanceCheckpoint {
  pub(crate) fn new(
    store: Arc<dyn InstanceStore>,
    notifier: Arc<dyn ExecutionNotifier>,
    record: WorkflowInstance,
  ) -> Self {
    Self {
      store,
      notifier,
      record: Mutex::new(record),
    }
  }

  /// Apply `f` to the record and persist the result.
  pub(crate) async fn write(
    &self,
    f: impl FnOnce(&mut WorkflowInstance),
  ) -> Result<WorkflowInstance, StoreError> {
    let snapshot = {
      let mut record = self
        .record
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
      f(&mut record);
      record.updated_at = Utc::now();
      record.clone()
    };
    self.store.update_instance(&snapshot).await?;
    Ok(snapshot)
  }

  /// Latest copy of the record, including the last saved checkpoint.
  pub(crate) fn into_record(self) -> WorkflowInstance {
    self
      .record
      .into_inner()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[async_trait]
impl Checkpoint for InstanceCheckpoint {
  async fn save(&self, phase: &str, state: serde_json::Value) -> Result<(), CheckpointError> {
    let record = self
      .write(|record| record.checkpoint = Some(Json(state)))
      .await
      .map_err(|e| CheckpointError::Persist(e.to_string()))?;

    self.notifier.notify(ExecutionEvent::StepCompleted {
      instance_id: record.instance_id,
      phase: phase.to_string(),
    });
    Ok(())
  }
}
