//! Accounts and sessions.
//!
//! An account pairs an email and password hash with a profile. Sessions are
//! persisted rows keyed by the SHA-256 of the bearer token, so a restarted
//! server re-derives the signed-in state from the token the client presents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, profile::NewProfile};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reject passwords below [`MIN_PASSWORD_LEN`]. Called before hashing so a
/// weak password never reaches the store.
pub fn validate_password(password: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::PasswordTooShort);
  }
  Ok(())
}

/// A sign-in credential record. `password_hash` is an argon2 PHC string;
/// the plaintext never leaves the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub profile_id:    Uuid,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to account creation: credentials plus the profile created alongside
/// them in the same transaction.
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         String,
  pub password_hash: String,
  pub profile:       NewProfile,
}

/// A persisted session. Only the hash of the token is stored; the token
/// itself is returned to the client once and never kept server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub token_hash: String,
  pub profile_id: Uuid,
  pub created_at: DateTime<Utc>,
}

impl Session {
  pub fn new(token_hash: String, profile_id: Uuid) -> Self {
    Self { token_hash, profile_id, created_at: Utc::now() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_of_five_chars_is_rejected() {
    assert!(matches!(
      validate_password("12345"),
      Err(Error::PasswordTooShort)
    ));
  }

  #[test]
  fn password_of_six_chars_is_accepted() {
    assert!(validate_password("123456").is_ok());
  }
}
