//! The `BlobStore` trait — where evidence files actually live.
//!
//! The core treats file storage as a black box: bytes go in under a path,
//! a public URL and content hash come back. `draco-server` provides a
//! filesystem implementation.

use std::future::Future;

/// The outcome of storing a blob.
#[derive(Debug, Clone)]
pub struct StoredBlob {
  /// Public URL the stored bytes can be fetched from.
  pub url:          String,
  /// SHA-256 hex digest of the stored bytes.
  pub content_hash: String,
}

/// Abstraction over evidence file storage.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `bytes` under `path` (relative, forward-slash separated) and
  /// return the resulting public URL and content hash.
  fn store<'a>(
    &'a self,
    path: &'a str,
    bytes: &'a [u8],
  ) -> impl Future<Output = Result<StoredBlob, Self::Error>> + Send + 'a;
}
