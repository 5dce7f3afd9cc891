//! HTTP entry point.

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use claimcheck_coordinator::{CoordinatorError, WorkflowCoordinator, WorkflowInput};
use claimcheck_store::InstanceStatus;
use claimcheck_workflow::SendInput;
use tracing::{error, info, warn};

use crate::AwaitPolicy;

/// Body of a 400 response.
pub const INVALID_REQUEST: &str = "Invalid request format.";

/// Body of a 500 response for a failed or timed-out send.
pub const WORKFLOW_FAILED: &str = "Claim check workflow failed to complete successfully.";

#[derive(Clone)]
struct HttpState {
  coordinator: WorkflowCoordinator,
  policy: AwaitPolicy,
}

/// Build the trigger router.
pub fn router(coordinator: WorkflowCoordinator, policy: AwaitPolicy) -> Router {
  Router::new()
    .route("/claim-check", post(send_claim))
    .route("/instances/:id", get(instance_status))
    .with_state(HttpState {
      coordinator,
      policy,
    })
}

/// Start a send instance and block until it is terminal.
async fn send_claim(State(state): State<HttpState>, body: Bytes) -> Response {
  let input: SendInput = match serde_json::from_slice(&body) {
    Ok(input) => input,
    Err(e) => {
      warn!(error = %e, "failed to parse claim check request");
      return (StatusCode::BAD_REQUEST, INVALID_REQUEST).into_response();
    }
  };

  info!(
    correlation_id = %input.correlation_id,
    file_name = %input.file_name,
    "received claim check request"
  );

  let policy = state.policy;
  let result = state
    .coordinator
    .run_to_completion(
      WorkflowInput::Send(input),
      policy.poll_interval,
      policy.timeout,
    )
    .await;

  match result {
    Ok(report) if report.status == InstanceStatus::Completed => match report.output {
      Some(output) => (StatusCode::OK, Json(output)).into_response(),
      None => {
        error!(instance_id = %report.instance_id, "completed instance has no output");
        workflow_failed()
      }
    },
    Ok(report) => {
      warn!(
        instance_id = %report.instance_id,
        error = report.error.as_deref().unwrap_or("unknown"),
        "claim check send failed"
      );
      workflow_failed()
    }
    Err(e) => {
      error!(error = %e, "claim check send did not finish");
      workflow_failed()
    }
  }
}

async fn instance_status(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
  match state.coordinator.get_status(&id).await {
    Ok(report) => Json(report).into_response(),
    Err(CoordinatorError::NotFound(_)) => {
      (StatusCode::NOT_FOUND, format!("instance '{}' not found", id)).into_response()
    }
    Err(e) => {
      error!(instance_id = %id, error = %e, "failed to load instance status");
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
    }
  }
}

fn workflow_failed() -> Response {
  (StatusCode::INTERNAL_SERVER_ERROR, WORKFLOW_FAILED).into_response()
}
