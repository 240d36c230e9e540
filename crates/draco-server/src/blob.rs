//! Filesystem-backed blob storage for evidence files.

use std::path::PathBuf;

use draco_core::blob::{BlobStore, StoredBlob};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
  #[error("blob path escapes the storage root: {0}")]
  InvalidPath(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Writes blobs under `root` and returns URLs joined to `base_url`.
#[derive(Clone)]
pub struct FsBlobStore {
  root:     PathBuf,
  base_url: String,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_owned();
    Self { root: root.into(), base_url }
  }
}

impl BlobStore for FsBlobStore {
  type Error = BlobError;

  async fn store(&self, path: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
    // Relative segments only; no empty, `.` or `..` components.
    let escapes = path
      .split('/')
      .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes || path.contains('\\') {
      return Err(BlobError::InvalidPath(path.to_owned()));
    }

    let target = self.root.join(path);
    if let Some(parent) = target.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, bytes).await?;

    Ok(StoredBlob {
      url:          format!("{}/{path}", self.base_url),
      content_hash: hex::encode(Sha256::digest(bytes)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_root() -> PathBuf {
    std::env::temp_dir().join(format!("draco-blob-{}", uuid::Uuid::new_v4()))
  }

  #[tokio::test]
  async fn stores_bytes_and_reports_hash_and_url() {
    let root = scratch_root();
    let blobs = FsBlobStore::new(&root, "http://localhost:8080/files/");

    let stored = blobs
      .store("evidence/case-1/photo.png", b"hello")
      .await
      .unwrap();

    assert_eq!(stored.url, "http://localhost:8080/files/evidence/case-1/photo.png");
    // sha256("hello")
    assert_eq!(
      stored.content_hash,
      "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );

    let on_disk = tokio::fs::read(root.join("evidence/case-1/photo.png"))
      .await
      .unwrap();
    assert_eq!(on_disk, b"hello");

    tokio::fs::remove_dir_all(&root).await.unwrap();
  }

  #[tokio::test]
  async fn rejects_escaping_paths() {
    let blobs = FsBlobStore::new(scratch_root(), "http://localhost");

    for path in ["../outside", "a/../../b", "/absolute", "a//b", "."] {
      assert!(matches!(
        blobs.store(path, b"x").await,
        Err(BlobError::InvalidPath(_))
      ));
    }
  }
}
