use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Which workflow an instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WorkflowKind {
  Send,
  Receive,
}

/// Status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InstanceStatus {
  Pending,
  Running,
  Completed,
  Failed,
}

impl InstanceStatus {
  /// Completed and Failed are terminal; no further step executes.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }
}

/// A workflow instance as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowInstance {
  pub instance_id: String,
  pub kind: WorkflowKind,
  pub status: InstanceStatus,
  pub input: Json<serde_json::Value>,
  pub output: Option<Json<serde_json::Value>>,
  pub error: Option<String>,
  pub checkpoint: Option<Json<serde_json::Value>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
  /// A fresh Pending instance with no output and no checkpoint.
  pub fn pending(instance_id: String, kind: WorkflowKind, input: serde_json::Value) -> Self {
    let now = Utc::now();
    Self {
      instance_id,
      kind,
      status: InstanceStatus::Pending,
      input: Json(input),
      output: None,
      error: None,
      checkpoint: None,
      created_at: now,
      updated_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_terminal_statuses() {
    assert!(!InstanceStatus::Pending.is_terminal());
    assert!(!InstanceStatus::Running.is_terminal());
    assert!(InstanceStatus::Completed.is_terminal());
    assert!(InstanceStatus::Failed.is_terminal());
  }

  #[test]
  fn test_pending_instance() {
    let instance = WorkflowInstance::pending(
      "inst-1".to_string(),
      WorkflowKind::Send,
      serde_json::json!({"fileName": "f.txt"}),
    );
    assert_eq!(instance.status, InstanceStatus::Pending);
    assert_eq!(instance.input.0["fileName"], "f.txt");
    assert!(instance.checkpoint.is_none());
    assert_eq!(instance.created_at, instance.updated_at);
  }
}
