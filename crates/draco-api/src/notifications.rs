//! Handlers for the notification feed.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use draco_core::{
  notification::{NewNotification, Notification, NotificationKind},
  store::CaseStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentUser, error::ApiError};

/// `GET /notifications` — the caller's feed, newest first.
pub async fn list<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let feed = state
    .store
    .list_notifications(user.profile.profile_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(feed))
}

/// `GET /notifications/unread_count` — the bell badge.
pub async fn unread_count<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let unread = state
    .store
    .unread_count(user.profile.profile_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "unread": unread })))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title: String,
  #[serde(default)]
  pub body:  Option<String>,
  #[serde(default)]
  pub kind:  Option<NotificationKind>,
}

/// `POST /notifications` — self-owned.
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
  let input = NewNotification {
    owner: user.profile.profile_id,
    title: body.title,
    body:  body.body,
    kind:  body.kind.unwrap_or_default(),
  };
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let notification = state.store.notify(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(notification)))
}

/// `POST /notifications/{id}/read` — idempotent, scoped to the caller's own
/// feed; another officer's ids behave like unknown ones.
pub async fn mark_read<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  state
    .store
    .mark_read(user.profile.profile_id, id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /notifications/{id}` — idempotent, scoped to the caller's own feed.
pub async fn remove<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  state
    .store
    .remove_notification(user.profile.profile_id, id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
