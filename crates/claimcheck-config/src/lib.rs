//! Claim-Check Config
//!
//! This crate contains the serializable configuration types for the claim-check
//! workflows. Every field has a default, so an empty JSON object (or no file at
//! all) yields a working configuration.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=claimcheck.json`)
//! - Built-in defaults (`ClaimCheckConfig::default()`)

mod config;
mod sections;

pub use config::ClaimCheckConfig;
pub use sections::{
  BlobConfig, CoordinatorConfig, HttpConfig, ListenerConfig, NotificationConfig, QueueConfig,
};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The configuration file could not be read.
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// The configuration file is not valid JSON for [`ClaimCheckConfig`].
  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  /// A value parsed but is not usable.
  #[error("invalid config: {0}")]
  Invalid(String),
}
