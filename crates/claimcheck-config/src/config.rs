use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::sections::{
  BlobConfig, CoordinatorConfig, HttpConfig, ListenerConfig, NotificationConfig, QueueConfig,
};

/// Top-level configuration for a claim-check deployment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimCheckConfig {
  pub blob: BlobConfig,
  pub queue: QueueConfig,
  pub notification: NotificationConfig,
  pub coordinator: CoordinatorConfig,
  pub http: HttpConfig,
  pub listener: ListenerConfig,
}

impl ClaimCheckConfig {
  /// Parse a configuration from a JSON string.
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Load a configuration from a JSON file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.display().to_string(),
      source,
    })?;

    let config = Self::from_json(&content).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })?;

    config.validate()?;
    Ok(config)
  }

  /// Check values that deserialize fine but cannot drive the workflows.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.queue.name.trim().is_empty() {
      return Err(ConfigError::Invalid("queue.name must not be empty".to_string()));
    }
    if self.queue.max_delivery_count == 0 {
      return Err(ConfigError::Invalid(
        "queue.max_delivery_count must be at least 1".to_string(),
      ));
    }
    if self.notification.to.trim().is_empty() {
      return Err(ConfigError::Invalid(
        "notification.to must not be empty".to_string(),
      ));
    }
    if self.coordinator.poll_interval_ms == 0 {
      return Err(ConfigError::Invalid(
        "coordinator.poll_interval_ms must be greater than zero".to_string(),
      ));
    }
    if self.listener.batch_size == 0 {
      return Err(ConfigError::Invalid(
        "listener.batch_size must be at least 1".to_string(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_object_uses_defaults() {
    let config = ClaimCheckConfig::from_json("{}").unwrap();
    assert_eq!(config, ClaimCheckConfig::default());
    assert_eq!(config.queue.name, "claim-check-pattern");
    assert_eq!(config.coordinator.poll_interval_ms, 500);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_sections_keep_other_defaults() {
    let config = ClaimCheckConfig::from_json(
      r#"{
        "queue": { "max_delivery_count": 3 },
        "notification": { "to": "ops@example.com" },
        "http": { "listen_addr": "0.0.0.0:9000" }
      }"#,
    )
    .unwrap();

    assert_eq!(config.queue.max_delivery_count, 3);
    assert_eq!(config.queue.name, "claim-check-pattern");
    assert_eq!(config.notification.to, "ops@example.com");
    assert_eq!(config.http.listen_addr, "0.0.0.0:9000");
    assert_eq!(config.listener.batch_size, 10);
  }

  #[test]
  fn test_validate_rejects_zero_delivery_count() {
    let mut config = ClaimCheckConfig::default();
    config.queue.max_delivery_count = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claimcheck.json");
    std::fs::write(&path, r#"{ "coordinator": { "timeout_ms": 1000 } }"#).unwrap();

    let config = ClaimCheckConfig::load(&path).unwrap();
    assert_eq!(config.coordinator.timeout_ms, 1000);
  }

  #[test]
  fn test_load_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ClaimCheckConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }

  #[test]
  fn test_load_missing_file() {
    let err = ClaimCheckConfig::load("/nonexistent/claimcheck.json").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
