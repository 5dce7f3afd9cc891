use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{InstanceStore, StoreError, WorkflowInstance};

/// In-memory instance store.
///
/// Instances survive only as long as the process; use [`crate::SqliteInstanceStore`]
/// when instances must be resumable after a restart.
#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
  instances: RwLock<HashMap<String, WorkflowInstance>>,
}

impl InMemoryInstanceStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
  async fn create_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    let mut instances = self.instances.write().await;
    if instances.contains_key(&instance.instance_id) {
      return Err(StoreError::AlreadyExists(instance.instance_id.clone()));
    }
    instances.insert(instance.instance_id.clone(), instance.clone());
    Ok(())
  }

  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, StoreError> {
    self
      .instances
      .read()
      .await
      .get(instance_id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(instance_id.to_string()))
  }

  async fn update_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    let mut instances = self.instances.write().await;
    let existing = instances
      .get_mut(&instance.instance_id)
      .ok_or_else(|| StoreError::NotFound(instance.instance_id.clone()))?;

    existing.status = instance.status;
    existing.output = instance.output.clone();
    existing.error = instance.error.clone();
    existing.checkpoint = instance.checkpoint.clone();
    existing.updated_at = instance.updated_at;
    Ok(())
  }

  async fn list_unfinished(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
    let mut unfinished: Vec<WorkflowInstance> = self
      .instances
      .read()
      .await
      .values()
      .filter(|i| !i.status.is_terminal())
      .cloned()
      .collect();
    unfinished.sort_by_key(|i| i.created_at);
    Ok(unfinished)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{InstanceStatus, WorkflowKind};

  fn instance(id: &str) -> WorkflowInstance {
    WorkflowInstance::pending(id.to_string(), WorkflowKind::Send, serde_json::json!({}))
  }

  #[tokio::test]
  async fn test_create_and_get() {
    let store = InMemoryInstanceStore::new();
    store.create_instance(&instance("a")).await.unwrap();

    assert_eq!(store.get_instance("a").await.unwrap().instance_id, "a");
    assert!(matches!(
      store.create_instance(&instance("a")).await,
      Err(StoreError::AlreadyExists(_))
    ));
    assert!(matches!(
      store.get_instance("missing").await,
      Err(StoreError::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_update_keeps_input() {
    let store = InMemoryInstanceStore::new();
    let mut record = instance("a");
    store.create_instance(&record).await.unwrap();

    record.status = InstanceStatus::Completed;
    record.output = Some(sqlx::types::Json(serde_json::json!({"status": "Success"})));
    record.input = sqlx::types::Json(serde_json::json!({"ignored": true}));
    store.update_instance(&record).await.unwrap();

    let stored = store.get_instance("a").await.unwrap();
    assert_eq!(stored.status, InstanceStatus::Completed);
    assert_eq!(stored.input.0, serde_json::json!({}));
  }

  #[tokio::test]
  async fn test_list_unfinished() {
    let store = InMemoryInstanceStore::new();
    store.create_instance(&instance("a")).await.unwrap();
    let mut done = instance("b");
    store.create_instance(&done).await.unwrap();
    done.status = InstanceStatus::Failed;
    store.update_instance(&done).await.unwrap();

    let unfinished = store.list_unfinished().await.unwrap();
    assert_eq!(unfinished.len(), 1);
    assert_eq!(unfinished[0].instance_id, "a");
  }
}
