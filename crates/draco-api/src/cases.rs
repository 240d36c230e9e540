//! Handlers for `/cases` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/cases` | `?search=&status=&priority=&agent=` |
//! | `POST`  | `/cases` | Caller becomes the responsible agent |
//! | `GET`   | `/cases/stats` | Dashboard counters |
//! | `GET`   | `/cases/{id}` | 404 outside the caller's visibility |
//! | `PATCH` | `/cases/{id}` | `{status?, priority?, supervising_delegate?}` |
//!
//! Visibility: a delegate sees every case, an agent only their own. A case
//! outside an agent's visibility is indistinguishable from a missing one.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use draco_core::{
  case::{Case, CaseFilter, CaseStats, CaseStatus, NewCase, Priority, filter_cases},
  profile::Profile,
  store::CaseStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentUser, error::ApiError};

pub(crate) fn can_view(profile: &Profile, case: &Case) -> bool {
  profile.role.is_delegate() || case.responsible_agent == profile.profile_id
}

/// Load a case the caller is allowed to see, or 404.
pub(crate) async fn visible_case<S, B>(
  state: &ApiState<S, B>,
  user: &CurrentUser,
  id: Uuid,
) -> Result<Case, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let case = state
    .store
    .get_case(id)
    .await
    .map_err(ApiError::store)?
    .filter(|c| can_view(&user.profile, c))
    .ok_or_else(|| ApiError::NotFound(format!("case {id} not found")))?;
  Ok(case)
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /cases[?search=&status=&priority=&agent=]`
pub async fn list<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Query(filter): Query<CaseFilter>,
) -> Result<Json<Vec<Case>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let cases = state
    .store
    .list_cases(&user.profile)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(filter_cases(cases, &filter)))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:                String,
  #[serde(default)]
  pub description:          Option<String>,
  #[serde(default)]
  pub location:             Option<String>,
  #[serde(default)]
  pub priority:             Option<Priority>,
  #[serde(default)]
  pub supervising_delegate: Option<Uuid>,
  #[serde(default)]
  pub suspects:             Option<serde_json::Value>,
}

/// `POST /cases` — the caller is recorded as the responsible agent.
pub async fn create<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let mut input = NewCase::new(
    body.title,
    body.priority.unwrap_or(Priority::Medium),
    user.profile.profile_id,
  );
  input.description = body.description;
  input.location = body.location;
  input.supervising_delegate = body.supervising_delegate;
  if let Some(suspects) = body.suspects {
    input.suspects = suspects;
  }
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let case = state.store.create_case(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(case)))
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /cases/stats`
pub async fn stats<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
) -> Result<Json<CaseStats>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let stats = state
    .store
    .case_stats(&user.profile)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stats))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /cases/{id}`
pub async fn get_one<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Case>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  Ok(Json(visible_case(&state, &user, id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub status:   Option<CaseStatus>,
  #[serde(default)]
  pub priority: Option<Priority>,
  /// Absent leaves the supervisor untouched; `null` clears it.
  #[serde(default, with = "double_option")]
  pub supervising_delegate: Option<Option<Uuid>>,
}

mod double_option {
  use serde::{Deserialize, Deserializer};
  use uuid::Uuid;

  pub fn deserialize<'de, D>(d: D) -> Result<Option<Option<Uuid>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Option::<Uuid>::deserialize(d).map(Some)
  }
}

/// `PATCH /cases/{id}`
pub async fn update<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Case>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let mut case = visible_case(&state, &user, id).await?;

  if let Some(status) = body.status {
    case = state
      .store
      .set_case_status(id, status)
      .await
      .map_err(ApiError::store)?;
  }
  if let Some(priority) = body.priority {
    case = state
      .store
      .set_case_priority(id, priority)
      .await
      .map_err(ApiError::store)?;
  }
  if let Some(delegate) = body.supervising_delegate {
    case = state
      .store
      .assign_supervisor(id, delegate)
      .await
      .map_err(ApiError::store)?;
  }

  Ok(Json(case))
}
