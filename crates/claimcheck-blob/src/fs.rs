use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{BlobError, ClaimStore};

/// Filesystem-based claim store.
///
/// Each payload is stored at `{base_path}/{key}`. Keys are claim IDs, so path
/// separators and relative components are rejected. Writes go to a temporary
/// sibling file that is renamed into place, so a reader never sees a partial
/// payload.
pub struct FsClaimStore {
  base_path: PathBuf,
}

impl FsClaimStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  fn key_to_path(&self, key: &str) -> Result<PathBuf, BlobError> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
      return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(self.base_path.join(key))
  }
}

fn not_found_or_io(key: &str, e: std::io::Error) -> BlobError {
  if e.kind() == std::io::ErrorKind::NotFound {
    BlobError::NotFound(key.to_string())
  } else {
    BlobError::Io(e)
  }
}

#[async_trait]
impl ClaimStore for FsClaimStore {
  async fn put(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
    let path = self.key_to_path(key)?;
    fs::create_dir_all(&self.base_path).await?;

    let tmp_path = self.base_path.join(format!(".{}.partial", key));
    let mut file = File::create(&tmp_path).await?;
    file.write_all(&data).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, &path).await?;
    debug!(key = %key, bytes = data.len(), "blob stored");
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Bytes, BlobError> {
    let path = self.key_to_path(key)?;
    let data = fs::read(&path)
      .await
      .map_err(|e| not_found_or_io(key, e))?;
    Ok(Bytes::from(data))
  }

  async fn delete(&self, key: &str) -> Result<(), BlobError> {
    let path = self.key_to_path(key)?;
    fs::remove_file(&path)
      .await
      .map_err(|e| not_found_or_io(key, e))?;
    debug!(key = %key, "blob deleted");
    Ok(())
  }
}
