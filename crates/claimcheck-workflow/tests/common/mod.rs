//! Recording fakes for the collaborator traits.
//!
//! Every fake appends to a shared journal so tests can assert on the order of
//! side effects across collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use claimcheck_blob::{BlobError, ClaimStore};
use claimcheck_notify::{Notification, NotificationSink, NotifyError};
use claimcheck_queue::{QueueClient, QueueError, QueueMessageHandle, ReceivedMessage};
use claimcheck_workflow::{
  Checkpoint, CheckpointError, ClaimMessage, NotificationTemplate, ReceiveInput,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  Put(String),
  Get(String),
  Delete(String),
  Publish(Bytes),
  Complete(String),
  Abandon(String),
  Notify(Notification),
}

pub type Journal = Arc<Mutex<Vec<Call>>>;

pub fn calls(journal: &Journal) -> Vec<Call> {
  journal.lock().unwrap().clone()
}

/// Which collaborator operations should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
  pub put: bool,
  pub get: bool,
  pub delete: bool,
  pub publish: bool,
  pub complete: bool,
  pub abandon: bool,
  pub notify: bool,
}

pub struct FakeStore {
  journal: Journal,
  faults: Faults,
  data: Mutex<HashMap<String, Bytes>>,
}

impl FakeStore {
  pub fn contains(&self, key: &str) -> bool {
    self.data.lock().unwrap().contains_key(key)
  }

  pub fn insert(&self, key: &str, data: &'static [u8]) {
    self
      .data
      .lock()
      .unwrap()
      .insert(key.to_string(), Bytes::from_static(data));
  }
}

#[async_trait]
impl ClaimStore for FakeStore {
  async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
    self.journal.lock().unwrap().push(Call::Put(key.to_string()));
    if self.faults.put {
      return Err(BlobError::Backend("put refused".to_string()));
    }
    self.data.lock().unwrap().insert(key.to_string(), data);
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
    self.journal.lock().unwrap().push(Call::Get(key.to_string()));
    if self.faults.get {
      return Err(BlobError::Backend("get refused".to_string()));
    }
    self
      .data
      .lock()
      .unwrap()
      .get(key)
      .cloned()
      .ok_or_else(|| BlobError::NotFound(key.to_string()))
  }

  async fn delete(&self, key: &str) -> Result<(), BlobError> {
    self.journal.lock().unwrap().push(Call::Delete(key.to_string()));
    if self.faults.delete {
      return Err(BlobError::Backend("delete refused".to_string()));
    }
    self
      .data
      .lock()
      .unwrap()
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| BlobError::NotFound(key.to_string()))
  }
}

pub struct FakeQueue {
  journal: Journal,
  faults: Faults,
}

impl FakeQueue {
  /// Bodies published so far, decoded as claim messages.
  pub fn published(&self) -> Vec<ClaimMessage> {
    calls(&self.journal)
      .into_iter()
      .filter_map(|call| match call {
        Call::Publish(body) => Some(ClaimMessage::from_slice(&body).unwrap()),
        _ => None,
      })
      .collect()
  }
}

#[async_trait]
impl QueueClient for FakeQueue {
  fn queue_name(&self) -> &str {
    "fake-queue"
  }

  async fn publish(&self, body: Bytes) -> Result<String, QueueError> {
    self.journal.lock().unwrap().push(Call::Publish(body));
    if self.faults.publish {
      return Err(QueueError::Backend("publish refused".to_string()));
    }
    Ok("msg-1".to_string())
  }

  async fn receive(&self, _max_messages: usize) -> Result<Vec<ReceivedMessage>, QueueError> {
    Ok(Vec::new())
  }

  async fn complete(&self, handle: &QueueMessageHandle) -> Result<(), QueueError> {
    self
      .journal
      .lock()
      .unwrap()
      .push(Call::Complete(handle.lock_token.clone()));
    if self.faults.complete {
      return Err(QueueError::LockLost {
        message_id: handle.message_id.clone(),
        lock_token: handle.lock_token.clone(),
      });
    }
    Ok(())
  }

  async fn abandon(&self, handle: &QueueMessageHandle) -> Result<(), QueueError> {
    self
      .journal
      .lock()
      .unwrap()
      .push(Call::Abandon(handle.lock_token.clone()));
    if self.faults.abandon {
      return Err(QueueError::Backend("abandon refused".to_string()));
    }
    Ok(())
  }
}

pub struct FakeSink {
  journal: Journal,
  faults: Faults,
}

#[async_trait]
impl NotificationSink for FakeSink {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    self
      .journal
      .lock()
      .unwrap()
      .push(Call::Notify(notification));
    if self.faults.notify {
      return Err(NotifyError::Transport("smtp unavailable".to_string()));
    }
    Ok(())
  }
}

/// Records every checkpoint as `(phase, state)`.
#[derive(Default)]
pub struct RecordingCheckpoint {
  pub saved: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingCheckpoint {
  pub fn phases(&self) -> Vec<String> {
    self
      .saved
      .lock()
      .unwrap()
      .iter()
      .map(|(phase, _)| phase.clone())
      .collect()
  }
}

#[async_trait]
impl Checkpoint for RecordingCheckpoint {
  async fn save(&self, phase: &str, state: serde_json::Value) -> Result<(), CheckpointError> {
    self
      .saved
      .lock()
      .unwrap()
      .push((phase.to_string(), state));
    Ok(())
  }
}

pub struct Fakes {
  pub journal: Journal,
  pub store: Arc<FakeStore>,
  pub queue: Arc<FakeQueue>,
  pub sink: Arc<FakeSink>,
}

pub fn fakes(faults: Faults) -> Fakes {
  let journal: Journal = Arc::new(Mutex::new(Vec::new()));
  Fakes {
    store: Arc::new(FakeStore {
      journal: journal.clone(),
      faults,
      data: Mutex::new(HashMap::new()),
    }),
    queue: Arc::new(FakeQueue {
      journal: journal.clone(),
      faults,
    }),
    sink: Arc::new(FakeSink {
      journal: journal.clone(),
      faults,
    }),
    journal,
  }
}

pub fn template() -> NotificationTemplate {
  NotificationTemplate {
    to: "recipient@example.com".to_string(),
    body: "<p>Check attachment.</p>".to_string(),
  }
}

pub fn receive_input(correlation_id: &str, claim_id: &str, file_name: &str) -> ReceiveInput {
  ReceiveInput {
    message: ClaimMessage {
      correlation_id: correlation_id.to_string(),
      claim_id: claim_id.to_string(),
      file_name: file_name.to_string(),
    },
    handle: QueueMessageHandle {
      message_id: "msg-1".to_string(),
      lock_token: "lock-1".to_string(),
    },
  }
}
