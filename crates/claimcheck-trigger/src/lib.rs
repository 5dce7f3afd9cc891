//! Claim-Check Triggers
//!
//! Adapters that turn external events into coordinator calls:
//!
//! - [`router`]: an axum router exposing `POST /claim-check`, which runs a
//!   send workflow to completion and answers with its result, and
//!   `GET /instances/:id` for status queries.
//! - [`QueueListener`]: drains the claim queue in batches and runs one
//!   receive workflow per message, one message at a time.

mod http;
mod listener;

use std::time::Duration;

use claimcheck_config::CoordinatorConfig;

pub use http::{INVALID_REQUEST, WORKFLOW_FAILED, router};
pub use listener::QueueListener;

/// How long and how often a trigger polls an instance it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwaitPolicy {
  pub poll_interval: Duration,
  pub timeout: Duration,
}

impl From<&CoordinatorConfig> for AwaitPolicy {
  fn from(config: &CoordinatorConfig) -> Self {
    Self {
      poll_interval: config.poll_interval(),
      timeout: config.timeout(),
    }
  }
}
