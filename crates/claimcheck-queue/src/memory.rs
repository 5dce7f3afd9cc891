use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{QueueClient, QueueError, QueueMessageHandle, ReceivedMessage};

const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct StoredMessage {
  message_id: String,
  body: Bytes,
  delivery_count: u32,
}

#[derive(Debug)]
struct Lease {
  message: StoredMessage,
  locked_until: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
  ready: VecDeque<StoredMessage>,
  locked: HashMap<String, Lease>,
  dead_letters: Vec<StoredMessage>,
  closed: bool,
}

/// In-memory queue with lease semantics.
///
/// - `receive` locks each handed-out message under a fresh lock token for
///   `lock_duration`. An expired lease returns to the ready list on the next
///   receive or release attempt, whichever comes first, and its token fails
///   with `LockLost` from then on.
/// - `complete` removes the message.
/// - `abandon` puts the message back at the tail of the ready list, or moves
///   it to the dead-letter list once it has been delivered
///   `max_delivery_count` times.
#[derive(Debug)]
pub struct InMemoryQueue {
  name: String,
  max_delivery_count: u32,
  lock_duration: Duration,
  state: Mutex<QueueState>,
}

impl InMemoryQueue {
  pub fn new(name: impl Into<String>, max_delivery_count: u32) -> Self {
    Self::with_lock_duration(name, max_delivery_count, DEFAULT_LOCK_DURATION)
  }

  pub fn with_lock_duration(
    name: impl Into<String>,
    max_delivery_count: u32,
    lock_duration: Duration,
  ) -> Self {
    Self {
      name: name.into(),
      max_delivery_count: max_delivery_count.max(1),
      lock_duration,
      state: Mutex::new(QueueState::default()),
    }
  }

  /// Stop accepting publishes and receives. Outstanding leases can still be
  /// released.
  pub fn close(&self) {
    self.lock_state().closed = true;
  }

  /// Number of messages waiting to be received.
  pub fn ready_len(&self) -> usize {
    self.lock_state().ready.len()
  }

  /// Number of messages currently leased to a consumer.
  pub fn in_flight_len(&self) -> usize {
    self.lock_state().locked.len()
  }

  /// IDs of messages moved to the dead-letter list, oldest first.
  pub fn dead_letters(&self) -> Vec<String> {
    self
      .lock_state()
      .dead_letters
      .iter()
      .map(|m| m.message_id.clone())
      .collect()
  }

  fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
    // Every mutation is a single container operation, so poisoned state is still consistent.
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn reclaim_expired(&self, state: &mut QueueState, now: Instant) {
    let expired: Vec<String> = state
      .locked
      .iter()
      .filter(|(_, lease)| lease.locked_until <= now)
      .map(|(token, _)| token.clone())
      .collect();

    for token in expired {
      if let Some(lease) = state.locked.remove(&token) {
        warn!(
          queue = %self.name,
          message_id = %lease.message.message_id,
          lock_token = %token,
          "lease expired, message returned to queue"
        );
        self.requeue(state, lease.message);
      }
    }
  }

  fn requeue(&self, state: &mut QueueState, message: StoredMessage) {
    if message.delivery_count >= self.max_delivery_count {
      warn!(
        queue = %self.name,
        message_id = %message.message_id,
        delivery_count = message.delivery_count,
        "max delivery count reached, message dead-lettered"
      );
      state.dead_letters.push(message);
    } else {
      state.ready.push_back(message);
    }
  }

  /// Remove the lease for `handle`. A lease past its lock duration is
  /// returned to the queue and reported as lost.
  fn take_lease(
    &self,
    state: &mut QueueState,
    handle: &QueueMessageHandle,
    now: Instant,
  ) -> Result<StoredMessage, QueueError> {
    let lost = || QueueError::LockLost {
      message_id: handle.message_id.clone(),
      lock_token: handle.lock_token.clone(),
    };

    match state.locked.get(&handle.lock_token) {
      Some(lease) if lease.message.message_id == handle.message_id => {}
      _ => return Err(lost()),
    }
    let lease = state.locked.remove(&handle.lock_token).ok_or_else(lost)?;

    if lease.locked_until <= now {
      warn!(
        queue = %self.name,
        message_id = %handle.message_id,
        lock_token = %handle.lock_token,
        "lease expired before release, message returned to queue"
      );
      self.requeue(state, lease.message);
      return Err(lost());
    }
    Ok(lease.message)
  }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
  fn queue_name(&self) -> &str {
    &self.name
  }

  async fn publish(&self, body: Bytes) -> Result<String, QueueError> {
    let mut state = self.lock_state();
    if state.closed {
      return Err(QueueError::Closed(self.name.clone()));
    }

    let message_id = uuid::Uuid::new_v4().to_string();
    state.ready.push_back(StoredMessage {
      message_id: message_id.clone(),
      body,
      delivery_count: 0,
    });

    debug!(queue = %self.name, message_id = %message_id, "message published");
    Ok(message_id)
  }

  async fn receive(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, QueueError> {
    let now = Instant::now();
    let mut state = self.lock_state();
    if state.closed {
      return Err(QueueError::Closed(self.name.clone()));
    }

    self.reclaim_expired(&mut state, now);

    let mut batch = Vec::new();
    while batch.len() < max_messages {
      let Some(mut message) = state.ready.pop_front() else {
        break;
      };
      message.delivery_count += 1;

      let lock_token = uuid::Uuid::new_v4().to_string();
      batch.push(ReceivedMessage {
        message_id: message.message_id.clone(),
        body: message.body.clone(),
        lock_token: lock_token.clone(),
        delivery_count: message.delivery_count,
      });
      state.locked.insert(
        lock_token,
        Lease {
          message,
          locked_until: now + self.lock_duration,
        },
      );
    }

    Ok(batch)
  }

  async fn complete(&self, handle: &QueueMessageHandle) -> Result<(), QueueError> {
    let now = Instant::now();
    let mut state = self.lock_state();
    self.take_lease(&mut state, handle, now)?;
    debug!(queue = %self.name, message_id = %handle.message_id, "message completed");
    Ok(())
  }

  async fn abandon(&self, handle: &QueueMessageHandle) -> Result<(), QueueError> {
    let now = Instant::now();
    let mut state = self.lock_state();
    let message = self.take_lease(&mut state, handle, now)?;
    debug!(queue = %self.name, message_id = %handle.message_id, "message abandoned");
    self.requeue(&mut state, message);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn body(text: &'static str) -> Bytes {
    Bytes::from_static(text.as_bytes())
  }

  #[tokio::test]
  async fn test_receive_locks_messages() {
    let queue = InMemoryQueue::new("q", 3);
    queue.publish(body("a")).await.unwrap();
    queue.publish(body("b")).await.unwrap();

    let batch = queue.receive(10).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].body, body("a"));
    assert_eq!(batch[0].delivery_count, 1);
    assert_eq!(queue.ready_len(), 0);
    assert_eq!(queue.in_flight_len(), 2);

    // Locked messages are not handed out again.
    assert!(queue.receive(10).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_receive_respects_batch_size() {
    let queue = InMemoryQueue::new("q", 3);
    for _ in 0..5 {
      queue.publish(body("x")).await.unwrap();
    }

    assert_eq!(queue.receive(2).await.unwrap().len(), 2);
    assert_eq!(queue.ready_len(), 3);
  }

  #[tokio::test]
  async fn test_complete_removes_message() {
    let queue = InMemoryQueue::new("q", 3);
    queue.publish(body("a")).await.unwrap();

    let message = queue.receive(1).await.unwrap().remove(0);
    queue.complete(&message.handle()).await.unwrap();

    assert_eq!(queue.ready_len(), 0);
    assert_eq!(queue.in_flight_len(), 0);
  }

  #[tokio::test]
  async fn test_release_twice_fails_with_lock_lost() {
    let queue = InMemoryQueue::new("q", 3);
    queue.publish(body("a")).await.unwrap();

    let handle = queue.receive(1).await.unwrap().remove(0).handle();
    queue.complete(&handle).await.unwrap();

    assert!(matches!(
      queue.complete(&handle).await,
      Err(QueueError::LockLost { .. })
    ));
    assert!(matches!(
      queue.abandon(&handle).await,
      Err(QueueError::LockLost { .. })
    ));
  }

  #[tokio::test]
  async fn test_abandon_redelivers_with_new_lock() {
    let queue = InMemoryQueue::new("q", 3);
    queue.publish(body("a")).await.unwrap();

    let first = queue.receive(1).await.unwrap().remove(0);
    queue.abandon(&first.handle()).await.unwrap();

    let second = queue.receive(1).await.unwrap().remove(0);
    assert_eq!(second.message_id, first.message_id);
    assert_ne!(second.lock_token, first.lock_token);
    assert_eq!(second.delivery_count, 2);
  }

  #[tokio::test]
  async fn test_abandon_dead_letters_after_max_deliveries() {
    let queue = InMemoryQueue::new("q", 2);
    let message_id = queue.publish(body("poison")).await.unwrap();

    for _ in 0..2 {
      let message = queue.receive(1).await.unwrap().remove(0);
      queue.abandon(&message.handle()).await.unwrap();
    }

    assert_eq!(queue.ready_len(), 0);
    assert_eq!(queue.dead_letters(), vec![message_id]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_lease_is_redelivered() {
    let queue = InMemoryQueue::with_lock_duration("q", 3, Duration::from_secs(5));
    queue.publish(body("a")).await.unwrap();

    let first = queue.receive(1).await.unwrap().remove(0);
    tokio::time::advance(Duration::from_secs(6)).await;

    let second = queue.receive(1).await.unwrap().remove(0);
    assert_eq!(second.message_id, first.message_id);

    // The stale token no longer releases anything.
    assert!(matches!(
      queue.complete(&first.handle()).await,
      Err(QueueError::LockLost { .. })
    ));
    queue.complete(&second.handle()).await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_lease_cannot_be_released() {
    let queue = InMemoryQueue::with_lock_duration("q", 3, Duration::from_secs(5));
    queue.publish(body("a")).await.unwrap();

    let received = queue.receive(1).await.unwrap().remove(0);
    tokio::time::advance(Duration::from_secs(6)).await;

    // No receive in between has reclaimed the lease.
    assert!(matches!(
      queue.complete(&received.handle()).await,
      Err(QueueError::LockLost { .. })
    ));
    assert_eq!(queue.in_flight_len(), 0);
    assert_eq!(queue.ready_len(), 1);

    let redelivered = queue.receive(1).await.unwrap().remove(0);
    assert_eq!(redelivered.message_id, received.message_id);
    assert_eq!(redelivered.delivery_count, 2);
    queue.abandon(&redelivered.handle()).await.unwrap();
  }

  #[tokio::test]
  async fn test_closed_queue_rejects_publish() {
    let queue = InMemoryQueue::new("q", 3);
    queue.close();
    assert!(matches!(
      queue.publish(body("a")).await,
      Err(QueueError::Closed(name)) if name == "q"
    ));
  }
}
