//! Queue listener driving receive workflows.

use std::sync::Arc;
use std::time::Duration;

use claimcheck_coordinator::{WorkflowCoordinator, WorkflowInput};
use claimcheck_queue::{QueueClient, QueueError, ReceivedMessage};
use claimcheck_workflow::{ClaimMessage, ReceiveInput};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::AwaitPolicy;

/// Pulls claim messages off the queue and runs a receive instance for each.
///
/// Messages in a batch are handled one at a time: the listener waits for each
/// instance to finish before starting the next.
///
/// # Usage
///
/// ```ignore
/// let listener = QueueListener::new(queue, coordinator, policy)
///     .with_batch_size(10)
///     .with_idle_interval(Duration::from_secs(1));
///
/// let cancel = CancellationToken::new();
/// listener.run(cancel).await;
/// ```
pub struct QueueListener {
  queue: Arc<dyn QueueClient>,
  coordinator: WorkflowCoordinator,
  policy: AwaitPolicy,
  batch_size: usize,
  idle_interval: Duration,
}

impl QueueListener {
  pub fn new(
    queue: Arc<dyn QueueClient>,
    coordinator: WorkflowCoordinator,
    policy: AwaitPolicy,
  ) -> Self {
    Self {
      queue,
      coordinator,
      policy,
      batch_size: 10,
      idle_interval: Duration::from_secs(1),
    }
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
    self.idle_interval = idle_interval;
    self
  }

  /// Run until `cancel` fires or the queue is closed.
  ///
  /// The token is checked between batches and during the idle sleep only.
  /// A received batch is always processed to the end, so every lease it
  /// took is completed or abandoned before the listener returns.
  pub async fn run(self, cancel: CancellationToken) {
    info!(queue = %self.queue.queue_name(), "starting queue listener");

    while !cancel.is_cancelled() {
      match self.poll_once().await {
        Ok(0) => {}
        Ok(count) => {
          debug!(count, "batch processed");
          continue;
        }
        Err(QueueError::Closed(queue)) => {
          info!(queue = %queue, "queue closed, stopping listener");
          return;
        }
        Err(e) => error!(error = %e, "failed to receive from queue"),
      }

      tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(self.idle_interval) => {}
      }
    }

    info!(queue = %self.queue.queue_name(), "queue listener cancelled");
  }

  /// Receive one batch and process every message in it.
  ///
  /// Returns the number of messages received.
  pub async fn poll_once(&self) -> Result<usize, QueueError> {
    let batch = self.queue.receive(self.batch_size).await?;
    let count = batch.len();

    for message in batch {
      self.process(message).await;
    }
    Ok(count)
  }

  async fn process(&self, message: ReceivedMessage) {
    let claim = ClaimMessage::from_slice(&message.body).unwrap_or_else(|e| {
      warn!(
        message_id = %message.message_id,
        error = %e,
        "undecodable claim message, handing it on with empty fields"
      );
      ClaimMessage::default()
    });

    let input = ReceiveInput {
      message: claim,
      handle: message.handle(),
    };

    let result = self
      .coordinator
      .run_to_completion(
        WorkflowInput::Receive(input),
        self.policy.poll_interval,
        self.policy.timeout,
      )
      .await;

    match result {
      Ok(report) => info!(
        message_id = %message.message_id,
        delivery_count = message.delivery_count,
        instance_id = %report.instance_id,
        status = ?report.status,
        "claim message processed"
      ),
      Err(e) => error!(
        message_id = %message.message_id,
        error = %e,
        "claim message processing did not finish"
      ),
    }
  }
}
