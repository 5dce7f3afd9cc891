use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Blob storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
  /// Container name; payloads live under `{data_dir}/blobs/{container}`.
  pub container: String,
}

impl Default for BlobConfig {
  fn default() -> Self {
    Self {
      container: "claim-check-pattern".to_string(),
    }
  }
}

/// Queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
  pub name: String,
  /// Deliveries after which an abandoned message is dead-lettered.
  pub max_delivery_count: u32,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      name: "claim-check-pattern".to_string(),
      max_delivery_count: 10,
    }
  }
}

/// Notification (email) settings for the receive workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub to: String,
  /// HTML body of the notification; the payload travels as the attachment.
  pub body: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      to: "recipient@example.com".to_string(),
      body: "<p>This message was received by the claim-check pattern. Check attachment.</p>"
        .to_string(),
    }
  }
}

/// Polling contract used by synchronous callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
  pub poll_interval_ms: u64,
  pub timeout_ms: u64,
}

impl CoordinatorConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

impl Default for CoordinatorConfig {
  fn default() -> Self {
    Self {
      poll_interval_ms: 500,
      timeout_ms: 60_000,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub listen_addr: String,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      listen_addr: "127.0.0.1:7071".to_string(),
    }
  }
}

/// Queue listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
  /// Maximum number of messages received per batch.
  pub batch_size: usize,
  /// Sleep between receives when the queue is empty.
  pub idle_interval_ms: u64,
}

impl ListenerConfig {
  pub fn idle_interval(&self) -> Duration {
    Duration::from_millis(self.idle_interval_ms)
  }
}

impl Default for ListenerConfig {
  fn default() -> Self {
    Self {
      batch_size: 10,
      idle_interval_ms: 1_000,
    }
  }
}
