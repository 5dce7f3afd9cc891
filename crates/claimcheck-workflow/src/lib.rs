//! Claim-Check Workflows
//!
//! This crate provides the two halves of the claim-check pattern:
//!
//! - [`SendWorkflow`]: store a payload under a fresh claim ID and publish the
//!   claim message.
//! - [`ReceiveWorkflow`]: validate a claim message, retrieve its payload,
//!   deliver it downstream, delete it, and release the queue lease.
//!
//! # Architecture
//!
//! ```text
//! SendWorkflow
//! └── Started → Storing → Publishing → Completed
//!                  └──────────┴──────→ Failed
//!
//! ReceiveWorkflow
//! └── Started → Validating → Retrieving → Delivering → Finalizing → Completed
//!                   └────────────┴────────────┴──────→ Failed → Abandoned
//! ```
//!
//! Both workflows are explicit state machines. Each step advances a
//! serializable state value and hands it to a [`Checkpoint`] before the next
//! step runs, so a coordinator can persist the state and resume an instance
//! after a restart without redoing completed steps.
//!
//! # Usage
//!
//! ```ignore
//! let send = SendWorkflow::new(store.clone(), queue.clone());
//! let output = send.run(SendInput::new("c1", "f.txt", json!("hello"))).await;
//!
//! let receive = ReceiveWorkflow::new(store, queue, sink, template);
//! let outcome = receive.run(ReceiveInput { message, handle }).await;
//! ```

mod checkpoint;
mod error;
mod message;
mod receive;
mod send;

pub use checkpoint::{Checkpoint, CheckpointError, NoopCheckpoint};
pub use error::WorkflowError;
pub use message::{ClaimId, ClaimMessage, ReceiveInput, SendInput, SendOutput};
pub use receive::{
  Disposition, NotificationTemplate, ReceiveOutcome, ReceivePhase, ReceiveState, ReceiveWorkflow,
};
pub use send::{SendPhase, SendState, SendWorkflow};
