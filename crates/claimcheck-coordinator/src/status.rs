use chrono::{DateTime, Utc};
use claimcheck_store::{InstanceStatus, WorkflowInstance, WorkflowKind};
use serde::{Deserialize, Serialize};

/// What a caller sees when querying an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
  pub instance_id: String,
  pub kind: WorkflowKind,
  pub status: InstanceStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl StatusReport {
  pub fn is_terminal(&self) -> bool {
    self.status.is_terminal()
  }
}

impl From<WorkflowInstance> for StatusReport {
  fn from(instance: WorkflowInstance) -> Self {
    Self {
      instance_id: instance.instance_id,
      kind: instance.kind,
      status: instance.status,
      output: instance.output.map(|json| json.0),
      error: instance.error,
      created_at: instance.created_at,
      updated_at: instance.updated_at,
    }
  }
}
