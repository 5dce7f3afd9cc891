//! Claim-Check Coordinator
//!
//! This crate owns workflow instances. It starts send and receive workflows
//! as independent tokio tasks, persists their status and step checkpoints
//! through an [`claimcheck_store::InstanceStore`], and lets synchronous
//! callers poll an instance until it reaches a terminal status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    WorkflowCoordinator                      │
//! │  - start(input) → instance_id (Pending → Running)           │
//! │  - get_status(instance_id) → StatusReport                   │
//! │  - await_completion(instance_id, poll, timeout)             │
//! │  - resume_incomplete() after a restart                      │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ spawns one task per instance
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              SendWorkflow / ReceiveWorkflow                 │
//! │  - resume(state, checkpoint) → terminal result              │
//! │  - checkpoint after every step → InstanceStore              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let coordinator = WorkflowCoordinator::new(instances, send, receive);
//!
//! let instance_id = coordinator.start(WorkflowInput::Send(input)).await?;
//! let report = coordinator
//!     .await_completion(&instance_id, Duration::from_millis(500), Duration::from_secs(60))
//!     .await?;
//! ```

mod checkpoint;
mod coordinator;
mod error;
mod events;
mod status;

pub use coordinator::{WorkflowCoordinator, WorkflowInput};
pub use error::CoordinatorError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier, TracingNotifier};
pub use status::StatusReport;
