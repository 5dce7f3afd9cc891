use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{BlobError, ClaimStore};

/// In-memory claim store.
///
/// Suitable for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
  data: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryClaimStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether a payload is currently stored under the key.
  pub async fn contains(&self, key: &str) -> bool {
    self.data.read().await.contains_key(key)
  }

  /// Number of stored payloads.
  pub async fn len(&self) -> usize {
    self.data.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.data.read().await.is_empty()
  }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
  async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
    self.data.write().await.insert(key.to_string(), data);
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
    self
      .data
      .read()
      .await
      .get(key)
      .cloned()
      .ok_or_else(|| BlobError::NotFound(key.to_string()))
  }

  async fn delete(&self, key: &str) -> Result<(), BlobError> {
    self
      .data
      .write()
      .await
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| BlobError::NotFound(key.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_in_memory_claim_store() {
    let store = InMemoryClaimStore::new();

    assert!(matches!(store.get("key").await, Err(BlobError::NotFound(_))));

    store.put("key", Bytes::from_static(b"value")).await.unwrap();
    assert_eq!(store.get("key").await.unwrap(), Bytes::from_static(b"value"));
    assert!(store.contains("key").await);

    store.delete("key").await.unwrap();
    assert!(!store.contains("key").await);
    assert!(store.is_empty().await);
  }
}
