//! Error type for `draco-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] draco_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("case not found: {0}")]
  CaseNotFound(uuid::Uuid),

  #[error("evidence not found: {0}")]
  EvidenceNotFound(uuid::Uuid),

  #[error("email already registered: {0}")]
  DuplicateEmail(String),

  /// Repeated inquiry-number collisions; practically unreachable but the
  /// retry loop is bounded.
  #[error("could not generate a unique inquiry number")]
  InquiryNumberExhausted,
}

impl Error {
  pub fn is_validation(&self) -> bool {
    matches!(self, Error::Core(e) if e.is_validation())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
