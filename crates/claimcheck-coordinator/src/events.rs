//! Instance lifecycle events.
//!
//! The coordinator reports each instance start, checkpointed step, and
//! terminal status through an [`ExecutionNotifier`].

use claimcheck_store::WorkflowKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// Created and handed to its task.
  InstanceStarted {
    instance_id: String,
    kind: WorkflowKind,
  },

  /// One step ran and its state was checkpointed.
  StepCompleted { instance_id: String, phase: String },

  InstanceCompleted { instance_id: String },

  InstanceFailed { instance_id: String, error: String },
}

impl ExecutionEvent {
  pub fn instance_id(&self) -> &str {
    match self {
      Self::InstanceStarted { instance_id, .. }
      | Self::StepCompleted { instance_id, .. }
      | Self::InstanceCompleted { instance_id }
      | Self::InstanceFailed { instance_id, .. } => instance_id,
    }
  }

  /// Whether no further events follow for this instance.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      Self::InstanceCompleted { .. } | Self::InstanceFailed { .. }
    )
  }
}

/// Receives lifecycle events. Called inline from instance tasks, so
/// implementations must not block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Writes every event as a debug-level tracing event.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl ExecutionNotifier for TracingNotifier {
  fn notify(&self, event: ExecutionEvent) {
    debug!(instance_id = %event.instance_id(), event = ?event, "instance event");
  }
}

/// Forwards events to an unbounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// A notifier and the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // A dropped receiver only means nobody is watching.
    let _ = self.sender.send(event);
  }
}
