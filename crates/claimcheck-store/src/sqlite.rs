use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{InstanceStore, StoreError, WorkflowInstance};

/// SQLite-based instance store.
pub struct SqliteInstanceStore {
  pool: SqlitePool,
}

impl SqliteInstanceStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
  matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl InstanceStore for SqliteInstanceStore {
  async fn create_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            INSERT INTO workflow_instances (instance_id, kind, status, input, output, error, checkpoint, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&instance.instance_id)
    .bind(instance.kind)
    .bind(instance.status)
    .bind(&instance.input)
    .bind(&instance.output)
    .bind(&instance.error)
    .bind(&instance.checkpoint)
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        StoreError::AlreadyExists(instance.instance_id.clone())
      } else {
        StoreError::Database(e)
      }
    })?;

    Ok(())
  }

  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, StoreError> {
    sqlx::query_as(
      r#"
            SELECT instance_id, kind, status, input, output, error, checkpoint, created_at, updated_at
            FROM workflow_instances
            WHERE instance_id = ?
            "#,
    )
    .bind(instance_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| StoreError::NotFound(instance_id.to_string()))
  }

  async fn update_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_instances
            SET status = ?, output = ?, error = ?, checkpoint = ?, updated_at = ?
            WHERE instance_id = ?
            "#,
    )
    .bind(instance.status)
    .bind(&instance.output)
    .bind(&instance.error)
    .bind(&instance.checkpoint)
    .bind(instance.updated_at)
    .bind(&instance.instance_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(instance.instance_id.clone()));
    }
    Ok(())
  }

  async fn list_unfinished(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
    let instances = sqlx::query_as(
      r#"
            SELECT instance_id, kind, status, input, output, error, checkpoint, created_at, updated_at
            FROM workflow_instances
            WHERE status IN ('pending', 'running')
            ORDER BY created_at ASC
            "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(instances)
  }
}

#[cfg(test)]
mod tests {
  use sqlx::sqlite::SqlitePoolOptions;
  use sqlx::types::Json;

  use super::*;
  use crate::{InstanceStatus, WorkflowKind};

  async fn store() -> SqliteInstanceStore {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .unwrap();
    let store = SqliteInstanceStore::new(pool);
    store.migrate().await.unwrap();
    store
  }

  #[tokio::test]
  async fn test_round_trips_instance() {
    let store = store().await;
    let instance = WorkflowInstance::pending(
      "inst-1".to_string(),
      WorkflowKind::Receive,
      serde_json::json!({"message": {"claimId": "abc"}}),
    );
    store.create_instance(&instance).await.unwrap();

    let stored = store.get_instance("inst-1").await.unwrap();
    assert_eq!(stored.kind, WorkflowKind::Receive);
    assert_eq!(stored.status, InstanceStatus::Pending);
    assert_eq!(stored.input.0["message"]["claimId"], "abc");
    assert!(stored.output.is_none());
  }

  #[tokio::test]
  async fn test_duplicate_create_is_rejected() {
    let store = store().await;
    let instance =
      WorkflowInstance::pending("inst-1".to_string(), WorkflowKind::Send, serde_json::json!({}));
    store.create_instance(&instance).await.unwrap();

    assert!(matches!(
      store.create_instance(&instance).await,
      Err(StoreError::AlreadyExists(id)) if id == "inst-1"
    ));
  }

  #[tokio::test]
  async fn test_update_and_list_unfinished() {
    let store = store().await;
    let mut first =
      WorkflowInstance::pending("first".to_string(), WorkflowKind::Send, serde_json::json!({}));
    let second =
      WorkflowInstance::pending("second".to_string(), WorkflowKind::Send, serde_json::json!({}));
    store.create_instance(&first).await.unwrap();
    store.create_instance(&second).await.unwrap();

    first.status = InstanceStatus::Completed;
    first.output = Some(Json(serde_json::json!({"status": "Success", "claimId": "c"})));
    first.checkpoint = Some(Json(serde_json::json!({"phase": "completed"})));
    store.update_instance(&first).await.unwrap();

    let stored = store.get_instance("first").await.unwrap();
    assert_eq!(stored.status, InstanceStatus::Completed);
    assert_eq!(stored.output.unwrap().0["claimId"], "c");

    let unfinished = store.list_unfinished().await.unwrap();
    assert_eq!(unfinished.len(), 1);
    assert_eq!(unfinished[0].instance_id, "second");
  }

  #[tokio::test]
  async fn test_missing_instance() {
    let store = store().await;
    assert!(matches!(
      store.get_instance("nope").await,
      Err(StoreError::NotFound(_))
    ));

    let ghost =
      WorkflowInstance::pending("ghost".to_string(), WorkflowKind::Send, serde_json::json!({}));
    assert!(matches!(
      store.update_instance(&ghost).await,
      Err(StoreError::NotFound(_))
    ));
  }
}
