//! JSON REST API for DRACO.
//!
//! Exposes an axum [`Router`] backed by any [`draco_core::store::CaseStore`]
//! and any [`draco_core::blob::BlobStore`]. Transport, TLS, and process
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", draco_api::api_router(state.clone()))
//! ```

pub mod auth;
pub mod cases;
pub mod error;
pub mod evidence;
pub mod feed;
pub mod messages;
pub mod notifications;
pub mod profiles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use draco_core::{blob::BlobStore, store::CaseStore};

pub use auth::{CurrentUser, LoginThrottle};
pub use error::ApiError;
pub use feed::{MessageFeed, ThreadEvent, ThreadWatch};

/// Shared state behind every handler.
pub struct ApiState<S, B> {
  pub store:    Arc<S>,
  pub blobs:    Arc<B>,
  pub feed:     MessageFeed,
  pub throttle: Arc<LoginThrottle>,
}

impl<S, B> ApiState<S, B> {
  pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
    Self {
      store,
      blobs,
      feed: MessageFeed::default(),
      throttle: Arc::new(LoginThrottle::default()),
    }
  }
}

impl<S, B> Clone for ApiState<S, B> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      blobs:    Arc::clone(&self.blobs),
      feed:     self.feed.clone(),
      throttle: Arc::clone(&self.throttle),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, B>(state: ApiState<S, B>) -> Router<()>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: BlobStore + 'static,
{
  Router::new()
    // Auth
    .route("/auth/signup", post(auth::signup::<S, B>))
    .route("/auth/login", post(auth::login::<S, B>))
    .route("/auth/logout", post(auth::logout::<S, B>))
    .route("/auth/me", get(auth::me::<S, B>))
    // Cases
    .route("/cases", get(cases::list::<S, B>).post(cases::create::<S, B>))
    .route("/cases/stats", get(cases::stats::<S, B>))
    .route(
      "/cases/{id}",
      get(cases::get_one::<S, B>).patch(cases::update::<S, B>),
    )
    .route(
      "/cases/{id}/evidence",
      get(evidence::list_for_case::<S, B>).post(evidence::create::<S, B>),
    )
    // Evidence
    .route("/evidence/{id}", get(evidence::get_one::<S, B>))
    .route("/evidence/{id}/custody", post(evidence::append_custody::<S, B>))
    // Profiles
    .route("/profiles", get(profiles::list::<S, B>))
    // Messages
    .route("/messages", post(messages::send::<S, B>))
    .route("/messages/thread/{other_id}", get(messages::thread::<S, B>))
    .route("/messages/case/{case_id}", get(messages::case_log::<S, B>))
    // Notifications
    .route(
      "/notifications",
      get(notifications::list::<S, B>).post(notifications::create::<S, B>),
    )
    .route(
      "/notifications/unread_count",
      get(notifications::unread_count::<S, B>),
    )
    .route("/notifications/{id}/read", post(notifications::mark_read::<S, B>))
    .route("/notifications/{id}", delete(notifications::remove::<S, B>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use draco_core::blob::{BlobStore, StoredBlob};
  use draco_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use sha2::{Digest, Sha256};
  use tower::ServiceExt as _;

  use super::*;

  struct MemoryBlobStore;

  impl BlobStore for MemoryBlobStore {
    type Error = std::convert::Infallible;

    async fn store(&self, path: &str, bytes: &[u8]) -> Result<StoredBlob, Self::Error> {
      Ok(StoredBlob {
        url:          format!("mem://{path}"),
        content_hash: hex::encode(Sha256::digest(bytes)),
      })
    }
  }

  type TestState = ApiState<SqliteStore, MemoryBlobStore>;

  async fn make_state() -> TestState {
    let store = SqliteStore::open_in_memory().await.unwrap();
    ApiState::new(Arc::new(store), Arc::new(MemoryBlobStore))
  }

  async fn send(
    state: &TestState,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(value) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Sign up a user and return their bearer token and profile id.
  async fn signup(state: &TestState, name: &str, role: &str) -> (String, String) {
    let resp = send(
      state,
      "POST",
      "/auth/signup",
      None,
      Some(json!({
        "email": format!("{name}@draco.test"),
        "password": "hunter2",
        "full_name": name,
        "badge_number": format!("B-{name}"),
        "role": role,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    (
      body["token"].as_str().unwrap().to_owned(),
      body["profile"]["profile_id"].as_str().unwrap().to_owned(),
    )
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn signup_login_me_roundtrip() {
    let state = make_state().await;
    let (token, profile_id) = signup(&state, "silva", "agent").await;

    let resp = send(&state, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["profile_id"], profile_id.as_str());

    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({"email": "silva@draco.test", "password": "hunter2"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fresh = json_body(resp).await["token"].as_str().unwrap().to_owned();
    assert_ne!(fresh, token);
  }

  #[tokio::test]
  async fn weak_password_creates_no_account() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/auth/signup",
      None,
      Some(json!({
        "email": "short@draco.test",
        "password": "12345",
        "full_name": "Short",
        "badge_number": "B-0",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], auth::MSG_WEAK_PASSWORD);

    // the email is still free
    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({"email": "short@draco.test", "password": "12345"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn duplicate_signup_conflicts() {
    let state = make_state().await;
    signup(&state, "dup", "agent").await;

    let resp = send(
      &state,
      "POST",
      "/auth/signup",
      None,
      Some(json!({
        "email": "dup@draco.test",
        "password": "hunter2",
        "full_name": "Dup Two",
        "badge_number": "B-2",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn repeated_bad_logins_are_throttled() {
    let state = make_state().await;
    signup(&state, "target", "agent").await;

    let bad = json!({"email": "target@draco.test", "password": "wrong!!"});
    for _ in 0..5 {
      let resp = send(&state, "POST", "/auth/login", None, Some(bad.clone())).await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = send(&state, "POST", "/auth/login", None, Some(bad)).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
  }

  #[tokio::test]
  async fn logout_invalidates_the_token() {
    let state = make_state().await;
    let (token, _) = signup(&state, "bye", "agent").await;

    let resp = send(&state, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn missing_token_is_rejected() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/cases", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Cases ───────────────────────────────────────────────────────────────────

  async fn create_case(state: &TestState, token: &str, title: &str, priority: &str) -> Value {
    let resp = send(
      state,
      "POST",
      "/cases",
      Some(token),
      Some(json!({"title": title, "priority": priority})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
  }

  #[tokio::test]
  async fn urgent_case_starts_active_with_wellformed_number() {
    let state = make_state().await;
    let (token, profile_id) = signup(&state, "agent", "agent").await;

    let case = create_case(&state, &token, "Armed robbery", "urgent").await;
    assert_eq!(case["status"], "active");
    assert_eq!(case["priority"], "urgent");
    assert_eq!(case["responsible_agent"], profile_id.as_str());
    let number = case["inquiry_number"].as_str().unwrap();
    assert!(number.starts_with("INQ-"));
    assert_eq!(number.len(), "INQ-2026-000000".len());
  }

  #[tokio::test]
  async fn agents_cannot_see_foreign_cases() {
    let state = make_state().await;
    let (token_a, _) = signup(&state, "a", "agent").await;
    let (token_b, _) = signup(&state, "b", "agent").await;
    let (token_chief, _) = signup(&state, "chief", "delegate").await;

    let case = create_case(&state, &token_a, "Private", "low").await;
    let id = case["case_id"].as_str().unwrap();

    let resp = send(&state, "GET", &format!("/cases/{id}"), Some(&token_b), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&state, "GET", &format!("/cases/{id}"), Some(&token_chief), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&state, "GET", "/cases", Some(&token_b), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn list_filters_combine() {
    let state = make_state().await;
    let (token, _) = signup(&state, "agent", "agent").await;
    create_case(&state, &token, "Warehouse arson", "urgent").await;
    create_case(&state, &token, "Stolen bicycle", "low").await;

    let resp = send(
      &state,
      "GET",
      "/cases?search=warehouse&priority=urgent",
      Some(&token),
      None,
    )
    .await;
    let cases = json_body(resp).await;
    assert_eq!(cases.as_array().unwrap().len(), 1);
    assert_eq!(cases[0]["title"], "Warehouse arson");
  }

  #[tokio::test]
  async fn patch_closes_and_reopens() {
    let state = make_state().await;
    let (token, _) = signup(&state, "agent", "agent").await;
    let case = create_case(&state, &token, "Fraud", "medium").await;
    let id = case["case_id"].as_str().unwrap();

    let resp = send(
      &state,
      "PATCH",
      &format!("/cases/{id}"),
      Some(&token),
      Some(json!({"status": "closed"})),
    )
    .await;
    let closed = json_body(resp).await;
    assert_eq!(closed["status"], "closed");
    assert!(!closed["closed_at"].is_null());

    let resp = send(
      &state,
      "PATCH",
      &format!("/cases/{id}"),
      Some(&token),
      Some(json!({"status": "investigation", "priority": "high"})),
    )
    .await;
    let reopened = json_body(resp).await;
    assert_eq!(reopened["status"], "investigation");
    assert_eq!(reopened["priority"], "high");
    assert!(reopened["closed_at"].is_null());
  }

  #[tokio::test]
  async fn stats_are_scoped_to_the_caller() {
    let state = make_state().await;
    let (token_a, _) = signup(&state, "a", "agent").await;
    let (token_chief, _) = signup(&state, "chief", "delegate").await;
    create_case(&state, &token_a, "One", "urgent").await;
    create_case(&state, &token_chief, "Two", "low").await;

    let resp = send(&state, "GET", "/cases/stats", Some(&token_a), None).await;
    let stats = json_body(resp).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["urgent"], 1);

    let resp = send(&state, "GET", "/cases/stats", Some(&token_chief), None).await;
    assert_eq!(json_body(resp).await["total"], 2);
  }

  // ── Evidence ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn evidence_upload_stores_the_blob_and_opens_the_trail() {
    let state = make_state().await;
    let (token, _) = signup(&state, "agent", "agent").await;
    let case = create_case(&state, &token, "Theft", "medium").await;
    let id = case["case_id"].as_str().unwrap();

    let resp = send(
      &state,
      "POST",
      &format!("/cases/{id}/evidence"),
      Some(&token),
      Some(json!({
        "kind": "photo",
        "description": "CCTV frame",
        "file_name": "frame 01.png",
        "file_base64": "aGVsbG8=",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let evidence = json_body(resp).await;

    let url = evidence["file"]["url"].as_str().unwrap();
    assert!(url.starts_with(&format!("mem://evidence/{id}/")));
    assert_eq!(evidence["file"]["name"], "frame_01.png");
    assert_eq!(evidence["file"]["content_hash"].as_str().unwrap().len(), 64);

    let trail = evidence["custody_trail"].as_array().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0]["action"], "upload");
  }

  #[tokio::test]
  async fn a_file_name_without_a_payload_is_rejected() {
    let state = make_state().await;
    let (token, _) = signup(&state, "agent", "agent").await;
    let case = create_case(&state, &token, "Theft", "medium").await;
    let id = case["case_id"].as_str().unwrap();

    let resp = send(
      &state,
      "POST",
      &format!("/cases/{id}/evidence"),
      Some(&token),
      Some(json!({
        "kind": "photo",
        "description": "CCTV frame",
        "file_name": "frame.png",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", &format!("/cases/{id}/evidence"), Some(&token), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn custody_appends_through_the_api() {
    let state = make_state().await;
    let (token, _) = signup(&state, "agent", "agent").await;
    let case = create_case(&state, &token, "Homicide", "urgent").await;
    let case_id = case["case_id"].as_str().unwrap();

    let resp = send(
      &state,
      "POST",
      &format!("/cases/{case_id}/evidence"),
      Some(&token),
      Some(json!({"kind": "digital", "description": "Seized phone"})),
    )
    .await;
    let evidence_id = json_body(resp).await["evidence_id"].as_str().unwrap().to_owned();

    let resp = send(
      &state,
      "POST",
      &format!("/evidence/{evidence_id}/custody"),
      Some(&token),
      Some(json!({"action": "transfer", "note": "handed to lab"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&state, "GET", &format!("/evidence/{evidence_id}"), Some(&token), None).await;
    let trail = json_body(resp).await["custody_trail"].as_array().unwrap().len();
    assert_eq!(trail, 2);
  }

  #[tokio::test]
  async fn foreign_evidence_is_invisible_to_agents() {
    let state = make_state().await;
    let (token_a, _) = signup(&state, "a", "agent").await;
    let (token_b, _) = signup(&state, "b", "agent").await;
    let case = create_case(&state, &token_a, "Private", "low").await;
    let case_id = case["case_id"].as_str().unwrap();

    let resp = send(
      &state,
      "POST",
      &format!("/cases/{case_id}/evidence"),
      Some(&token_a),
      Some(json!({"kind": "document", "description": "Ledger"})),
    )
    .await;
    let evidence_id = json_body(resp).await["evidence_id"].as_str().unwrap().to_owned();

    let resp = send(&state, "GET", &format!("/evidence/{evidence_id}"), Some(&token_b), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Messages ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn direct_messages_build_a_thread_and_hit_the_feed() {
    let state = make_state().await;
    let (token_a, id_a) = signup(&state, "a", "agent").await;
    let (token_b, id_b) = signup(&state, "b", "agent").await;

    let a: uuid::Uuid = id_a.parse().unwrap();
    let b: uuid::Uuid = id_b.parse().unwrap();
    let mut watch = state.feed.watch_thread(a, b);

    let resp = send(
      &state,
      "POST",
      "/messages",
      Some(&token_a),
      Some(json!({"recipient_id": id_b, "content": "hello"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    send(
      &state,
      "POST",
      "/messages",
      Some(&token_b),
      Some(json!({"recipient_id": id_a, "content": "hi back"})),
    )
    .await;

    match watch.next().await {
      Some(ThreadEvent::Message(m)) => assert_eq!(m.content, "hello"),
      other => panic!("unexpected event: {other:?}"),
    }

    let resp = send(&state, "GET", &format!("/messages/thread/{id_b}"), Some(&token_a), None).await;
    let thread = json_body(resp).await;
    let contents: Vec<&str> = thread
      .as_array()
      .unwrap()
      .iter()
      .map(|m| m["content"].as_str().unwrap())
      .collect();
    assert_eq!(contents, ["hello", "hi back"]);
  }

  #[tokio::test]
  async fn a_message_needs_exactly_one_scope() {
    let state = make_state().await;
    let (token, id) = signup(&state, "a", "agent").await;

    let resp = send(
      &state,
      "POST",
      "/messages",
      Some(&token),
      Some(json!({"content": "dangling"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let case = create_case(&state, &token, "Case", "low").await;
    let resp = send(
      &state,
      "POST",
      "/messages",
      Some(&token),
      Some(json!({
        "recipient_id": id,
        "case_id": case["case_id"],
        "content": "both",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Notifications ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn notification_read_and_remove_are_idempotent() {
    let state = make_state().await;
    let (token, _) = signup(&state, "owner", "agent").await;

    let resp = send(
      &state,
      "POST",
      "/notifications",
      Some(&token),
      Some(json!({"title": "Case assigned", "kind": "info"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = json_body(resp).await["notification_id"].as_str().unwrap().to_owned();

    let resp = send(&state, "GET", "/notifications/unread_count", Some(&token), None).await;
    assert_eq!(json_body(resp).await["unread"], 1);

    for _ in 0..2 {
      let resp = send(
        &state,
        "POST",
        &format!("/notifications/{id}/read"),
        Some(&token),
        None,
      )
      .await;
      assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    let resp = send(&state, "GET", "/notifications/unread_count", Some(&token), None).await;
    assert_eq!(json_body(resp).await["unread"], 0);

    for _ in 0..2 {
      let resp = send(
        &state,
        "DELETE",
        &format!("/notifications/{id}"),
        Some(&token),
        None,
      )
      .await;
      assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    let resp = send(&state, "GET", "/notifications", Some(&token), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 0);
  }

  #[tokio::test]
  async fn foreign_notifications_cannot_be_read_or_removed() {
    let state = make_state().await;
    let (owner_token, _) = signup(&state, "owner", "agent").await;
    let (intruder_token, _) = signup(&state, "intruder", "agent").await;

    let resp = send(
      &state,
      "POST",
      "/notifications",
      Some(&owner_token),
      Some(json!({"title": "Case assigned"})),
    )
    .await;
    let id = json_body(resp).await["notification_id"].as_str().unwrap().to_owned();

    // another officer's read/delete behaves like an unknown id and leaves
    // the owner's feed untouched
    let resp = send(
      &state,
      "POST",
      &format!("/notifications/{id}/read"),
      Some(&intruder_token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&state, "GET", "/notifications/unread_count", Some(&owner_token), None).await;
    assert_eq!(json_body(resp).await["unread"], 1);

    let resp = send(
      &state,
      "DELETE",
      &format!("/notifications/{id}"),
      Some(&intruder_token),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&state, "GET", "/notifications", Some(&owner_token), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  }

  // ── Profiles ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn roster_lists_active_profiles() {
    let state = make_state().await;
    let (token, _) = signup(&state, "a", "agent").await;
    signup(&state, "b", "delegate").await;

    let resp = send(&state, "GET", "/profiles", Some(&token), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
  }
}
