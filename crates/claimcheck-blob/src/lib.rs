//! Claim-Check Blob
//!
//! This crate provides the claim store trait and implementations. Payloads
//! are raw bytes stored out-of-band, keyed by the claim ID that travels
//! through the queue in their place.
//!
//! The [`ClaimStore`] trait is the only thing the workflows depend on.
//! Implementations must guarantee per-key atomicity for put/get/delete.

mod fs;
mod memory;

pub use fs::FsClaimStore;
pub use memory::InMemoryClaimStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for claim store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
  /// No payload is stored under the key.
  #[error("blob not found: {0}")]
  NotFound(String),

  /// The key cannot be mapped to a storage location.
  #[error("invalid blob key: {0}")]
  InvalidKey(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The backend rejected or failed the operation.
  #[error("storage backend error: {0}")]
  Backend(String),
}

/// Payload storage keyed by claim ID.
#[async_trait]
pub trait ClaimStore: Send + Sync {
  /// Store a payload, replacing any payload already under the key.
  async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError>;

  /// Retrieve a payload by key.
  async fn get(&self, key: &str) -> Result<Bytes, BlobError>;

  /// Delete a payload by key.
  async fn delete(&self, key: &str) -> Result<(), BlobError>;
}
