//! Claim-Check Store
//!
//! This crate provides the storage trait and implementations for workflow
//! instances owned by the coordinator. Each record carries the instance's
//! status, input, terminal output or error, and the checkpoint of its step
//! state so a restarted process can resume it.
//!
//! The [`InstanceStore`] trait defines operations for:
//! - Creating and updating workflow instances
//! - Looking up an instance by ID
//! - Listing instances that have not reached a terminal status

mod memory;
mod sqlite;
mod types;

pub use memory::InMemoryInstanceStore;
pub use sqlite::SqliteInstanceStore;
pub use sqlx::types::Json;
pub use types::{InstanceStatus, WorkflowInstance, WorkflowKind};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("instance not found: {0}")]
  NotFound(String),

  /// A record with the same ID already exists.
  #[error("instance already exists: {0}")]
  AlreadyExists(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for workflow instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
  /// Create a new workflow instance.
  async fn create_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError>;

  /// Get a workflow instance by ID.
  async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance, StoreError>;

  /// Replace the mutable fields (status, output, error, checkpoint, updated_at)
  /// of an existing instance.
  async fn update_instance(&self, instance: &WorkflowInstance) -> Result<(), StoreError>;

  /// List instances that are still Pending or Running, oldest first.
  async fn list_unfinished(&self) -> Result<Vec<WorkflowInstance>, StoreError>;
}
