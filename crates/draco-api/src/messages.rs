//! Handlers for direct and case-scoped messaging.
//!
//! Every stored message is also published to the in-process
//! [`MessageFeed`](crate::feed::MessageFeed) so embedded consumers can react
//! without polling.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use draco_core::{
  message::{Message, MessageKind, MessageScope, NewMessage},
  store::CaseStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentUser, cases, error::ApiError};

// ─── Send ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendBody {
  #[serde(default)]
  pub recipient_id: Option<Uuid>,
  #[serde(default)]
  pub case_id:      Option<Uuid>,
  pub content:      String,
}

/// `POST /messages` — exactly one of `recipient_id` / `case_id`.
pub async fn send<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let scope = match (body.recipient_id, body.case_id) {
    (Some(recipient), None) => {
      state
        .store
        .get_profile(recipient)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::NotFound(format!("profile {recipient} not found")))?;
      MessageScope::Direct(recipient)
    }
    (None, Some(case_id)) => {
      let case = cases::visible_case(&state, &user, case_id).await?;
      MessageScope::Case(case.case_id)
    }
    _ => {
      return Err(ApiError::BadRequest(
        "exactly one of recipient_id or case_id is required".into(),
      ));
    }
  };

  let input = NewMessage {
    sender:  user.profile.profile_id,
    scope,
    content: body.content,
    kind:    MessageKind::Text,
  };
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let message = state.store.send_message(input).await.map_err(ApiError::store)?;
  state.feed.publish(&message);

  Ok((StatusCode::CREATED, Json(message)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /messages/thread/{other_id}` — both directions, oldest first.
pub async fn thread<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(other): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let messages = state
    .store
    .fetch_thread(user.profile.profile_id, other)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}

/// `GET /messages/case/{case_id}` — the case log, oldest first.
pub async fn case_log<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(case_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let case = cases::visible_case(&state, &user, case_id).await?;
  let messages = state
    .store
    .list_case_messages(case.case_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}
