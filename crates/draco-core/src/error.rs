//! Error types for `draco-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("case title must not be empty")]
  EmptyCaseTitle,

  #[error("evidence description must not be empty")]
  EmptyEvidenceDescription,

  #[error("message content must not be empty")]
  EmptyMessageContent,

  #[error("notification title must not be empty")]
  EmptyNotificationTitle,

  #[error("password must be at least {min} characters", min = crate::account::MIN_PASSWORD_LEN)]
  PasswordTooShort,

  #[error("malformed inquiry number: {0:?}")]
  MalformedInquiryNumber(String),

  #[error("unknown {field} value: {value:?}")]
  UnknownEnumToken { field: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether this error is a caller mistake (empty field, weak password)
  /// rather than an internal failure. Callers surface these inline.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Error::EmptyCaseTitle
        | Error::EmptyEvidenceDescription
        | Error::EmptyMessageContent
        | Error::EmptyNotificationTitle
        | Error::PasswordTooShort
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
