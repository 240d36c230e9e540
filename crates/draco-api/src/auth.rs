//! Sign-up, sign-in, and the bearer-token session extractor.
//!
//! Tokens are 32 random bytes, base64url-encoded, handed to the client once.
//! Only the SHA-256 hex of the token is persisted, so a leaked store never
//! yields usable credentials.

use std::{
  collections::HashMap,
  sync::Mutex,
  time::{Duration, Instant},
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, StatusCode, request::Parts},
  response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use draco_core::{
  account::{NewAccount, Session, validate_password},
  profile::{NewProfile, Profile, Role},
  store::CaseStore,
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ApiState, error::ApiError};

// ─── User-facing auth messages ───────────────────────────────────────────────

pub const MSG_INVALID_CREDENTIALS: &str = "incorrect email or password";
pub const MSG_INACTIVE_ACCOUNT: &str = "account deactivated";
pub const MSG_RATE_LIMITED: &str = "too many sign-in attempts; try again shortly";
pub const MSG_DUPLICATE_EMAIL: &str = "email already registered";
pub const MSG_WEAK_PASSWORD: &str = "password must be at least 6 characters";
pub const MSG_AUTH_REQUIRED: &str = "authentication required";

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh bearer token: 32 random bytes, base64url without padding.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64URL.encode(bytes)
}

/// The persisted form of a token.
pub fn token_hash(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}

// ─── Sign-in throttle ────────────────────────────────────────────────────────

/// Per-email failed-sign-in counter over a sliding window.
pub struct LoginThrottle {
  window:       Duration,
  max_failures: u32,
  failures:     Mutex<HashMap<String, (u32, Instant)>>,
}

impl LoginThrottle {
  pub fn new(window: Duration, max_failures: u32) -> Self {
    Self { window, max_failures, failures: Mutex::new(HashMap::new()) }
  }

  /// Reject the attempt if the email has exhausted its failure budget.
  pub fn check(&self, email: &str) -> Result<(), ApiError> {
    let mut failures = self.failures.lock().unwrap();
    Self::sweep(&mut failures, self.window);
    if let Some((count, _)) = failures.get(email)
      && *count >= self.max_failures
    {
      return Err(ApiError::RateLimited(MSG_RATE_LIMITED.into()));
    }
    Ok(())
  }

  pub fn record_failure(&self, email: &str) {
    let mut failures = self.failures.lock().unwrap();
    Self::sweep(&mut failures, self.window);
    failures.entry(email.to_owned()).or_insert((0, Instant::now())).0 += 1;
  }

  pub fn clear(&self, email: &str) {
    self.failures.lock().unwrap().remove(email);
  }

  /// Drop entries whose window has lapsed so a scan over many distinct
  /// emails cannot grow the map without bound.
  fn sweep(failures: &mut HashMap<String, (u32, Instant)>, window: Duration) {
    failures.retain(|_, (_, since)| since.elapsed() < window);
  }

  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.failures.lock().unwrap().len()
  }
}

impl Default for LoginThrottle {
  fn default() -> Self {
    Self::new(Duration::from_secs(60), 5)
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The signed-in caller: present in a handler means the bearer token resolved
/// to an active profile.
pub struct CurrentUser {
  pub profile:    Profile,
  pub token_hash: String,
}

impl<S, B> FromRequestParts<ApiState<S, B>> for CurrentUser
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, B>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)
      .ok_or_else(|| ApiError::Unauthorized(MSG_AUTH_REQUIRED.into()))?;
    let hash = token_hash(token);

    let profile = state
      .store
      .session_profile(&hash)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::Unauthorized(MSG_AUTH_REQUIRED.into()))?;

    if !profile.active {
      return Err(ApiError::Unauthorized(MSG_INACTIVE_ACCOUNT.into()));
    }

    Ok(CurrentUser { profile, token_hash: hash })
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:        String,
  pub password:     String,
  pub full_name:    String,
  pub badge_number: String,
  #[serde(default)]
  pub role:         Option<Role>,
  #[serde(default)]
  pub unit:         Option<String>,
  #[serde(default)]
  pub phone:        Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
  pub token:   String,
  pub profile: Profile,
}

/// `POST /auth/signup`
pub async fn signup<S, B>(
  State(state): State<ApiState<S, B>>,
  Json(body): Json<SignupBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  validate_password(&body.password)
    .map_err(|_| ApiError::BadRequest(MSG_WEAK_PASSWORD.into()))?;

  let existing = state
    .store
    .account_by_email(&body.email)
    .await
    .map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(ApiError::Conflict(MSG_DUPLICATE_EMAIL.into()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let password_hash = Argon2::default()
    .hash_password(body.password.as_bytes(), &salt)
    .map_err(|e| ApiError::Store(e.to_string().into()))?
    .to_string();

  let (_, profile) = state
    .store
    .create_account(NewAccount {
      email: body.email.clone(),
      password_hash,
      profile: NewProfile {
        badge_number: body.badge_number,
        full_name:    body.full_name,
        role:         body.role.unwrap_or(Role::Agent),
        unit:         body.unit,
        phone:        body.phone,
        email:        Some(body.email.clone()),
      },
    })
    .await
    .map_err(ApiError::store)?;

  let token = issue_session(&state, &profile).await?;
  tracing::info!(badge = %profile.badge_number, "account created");

  Ok((StatusCode::CREATED, Json(AuthResponse { token, profile })))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S, B>(
  State(state): State<ApiState<S, B>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<AuthResponse>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  state.throttle.check(&body.email)?;

  let account = state
    .store
    .account_by_email(&body.email)
    .await
    .map_err(ApiError::store)?;

  let Some(account) = account else {
    state.throttle.record_failure(&body.email);
    return Err(ApiError::Unauthorized(MSG_INVALID_CREDENTIALS.into()));
  };

  let verified = PasswordHash::new(&account.password_hash)
    .and_then(|hash| Argon2::default().verify_password(body.password.as_bytes(), &hash));
  if verified.is_err() {
    state.throttle.record_failure(&body.email);
    return Err(ApiError::Unauthorized(MSG_INVALID_CREDENTIALS.into()));
  }

  let profile = state
    .store
    .get_profile(account.profile_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Unauthorized(MSG_INVALID_CREDENTIALS.into()))?;

  if !profile.active {
    return Err(ApiError::Unauthorized(MSG_INACTIVE_ACCOUNT.into()));
  }

  state.throttle.clear(&body.email);
  let token = issue_session(&state, &profile).await?;
  tracing::info!(badge = %profile.badge_number, "signed in");

  Ok(Json(AuthResponse { token, profile }))
}

/// `POST /auth/logout`
pub async fn logout<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  state
    .store
    .delete_session(&user.token_hash)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me<S, B>(user: CurrentUser) -> Json<Profile>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  Json(user.profile)
}

async fn issue_session<S, B>(
  state: &ApiState<S, B>,
  profile: &Profile,
) -> Result<String, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let token = generate_token();
  state
    .store
    .insert_session(Session::new(token_hash(&token), profile.profile_id))
    .await
    .map_err(ApiError::store)?;
  Ok(token)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_opaque_and_distinct() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    // 32 bytes base64url without padding
    assert_eq!(a.len(), 43);
    assert_eq!(token_hash(&a).len(), 64);
    assert_ne!(token_hash(&a), token_hash(&b));
  }

  #[test]
  fn throttle_blocks_after_budget_is_spent() {
    let throttle = LoginThrottle::new(Duration::from_secs(60), 3);
    for _ in 0..3 {
      assert!(throttle.check("x@y.test").is_ok());
      throttle.record_failure("x@y.test");
    }
    assert!(matches!(
      throttle.check("x@y.test"),
      Err(ApiError::RateLimited(_))
    ));
    // other emails are unaffected
    assert!(throttle.check("other@y.test").is_ok());
  }

  #[test]
  fn throttle_window_expires() {
    let throttle = LoginThrottle::new(Duration::from_millis(0), 1);
    throttle.record_failure("x@y.test");
    assert!(throttle.check("x@y.test").is_ok());
  }

  #[test]
  fn expired_entries_are_swept_on_the_next_attempt() {
    let throttle = LoginThrottle::new(Duration::from_millis(0), 5);
    for i in 0..100 {
      throttle.record_failure(&format!("scan-{i}@y.test"));
    }
    // every recorded window has already lapsed
    assert!(throttle.check("anyone@y.test").is_ok());
    assert_eq!(throttle.tracked(), 0);
  }

  #[test]
  fn success_clears_failures() {
    let throttle = LoginThrottle::new(Duration::from_secs(60), 1);
    throttle.record_failure("x@y.test");
    throttle.clear("x@y.test");
    assert!(throttle.check("x@y.test").is_ok());
  }
}
