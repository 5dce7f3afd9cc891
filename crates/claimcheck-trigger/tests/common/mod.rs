//! In-memory wiring shared by the trigger tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use claimcheck_blob::{BlobError, ClaimStore, InMemoryClaimStore};
use claimcheck_coordinator::WorkflowCoordinator;
use claimcheck_notify::{ChannelNotificationSink, Notification, NotificationSink, NotifyError};
use claimcheck_queue::InMemoryQueue;
use claimcheck_store::InMemoryInstanceStore;
use claimcheck_trigger::AwaitPolicy;
use claimcheck_workflow::{NotificationTemplate, ReceiveWorkflow, SendWorkflow};
use tokio::sync::mpsc;

pub const POLICY: AwaitPolicy = AwaitPolicy {
  poll_interval: Duration::from_millis(5),
  timeout: Duration::from_secs(5),
};

/// Delays every put, or refuses it.
#[derive(Default)]
pub struct GatedStore {
  pub inner: InMemoryClaimStore,
  pub put_delay: Duration,
  pub refuse_put: bool,
}

#[async_trait]
impl ClaimStore for GatedStore {
  async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
    if self.refuse_put {
      return Err(BlobError::Backend("put refused".to_string()));
    }
    tokio::time::sleep(self.put_delay).await;
    self.inner.put(key, data).await
  }

  async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
    self.inner.get(key).await
  }

  async fn delete(&self, key: &str) -> Result<(), BlobError> {
    self.inner.delete(key).await
  }
}

/// Forwards to a channel after a fixed delay.
pub struct SlowSink {
  inner: ChannelNotificationSink,
  delay: Duration,
}

#[async_trait]
impl NotificationSink for SlowSink {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    tokio::time::sleep(self.delay).await;
    self.inner.send(notification).await
  }
}

pub struct Harness {
  pub coordinator: WorkflowCoordinator,
  pub store: Arc<GatedStore>,
  pub queue: Arc<InMemoryQueue>,
  pub notifications: mpsc::UnboundedReceiver<Notification>,
}

pub fn harness(store: GatedStore) -> Harness {
  harness_with_notify_delay(store, Duration::ZERO)
}

pub fn harness_with_notify_delay(store: GatedStore, notify_delay: Duration) -> Harness {
  let store = Arc::new(store);
  let queue = Arc::new(InMemoryQueue::new("claim-check-pattern", 3));
  let (inner, notifications) = ChannelNotificationSink::channel();
  let sink = SlowSink {
    inner,
    delay: notify_delay,
  };

  let send = SendWorkflow::new(store.clone(), queue.clone());
  let receive = ReceiveWorkflow::new(
    store.clone(),
    queue.clone(),
    Arc::new(sink),
    NotificationTemplate {
      to: "recipient@example.com".to_string(),
      body: "<p>Check attachment.</p>".to_string(),
    },
  );

  Harness {
    coordinator: WorkflowCoordinator::new(Arc::new(InMemoryInstanceStore::new()), send, receive),
    store,
    queue,
    notifications,
  }
}
