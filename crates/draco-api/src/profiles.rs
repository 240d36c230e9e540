//! Handlers for the profile roster.

use axum::{Json, extract::State};
use draco_core::{profile::Profile, store::CaseStore};

use crate::{ApiState, auth::CurrentUser, error::ApiError};

/// `GET /profiles` — all active profiles, the chat roster.
pub async fn list<S, B>(
  State(state): State<ApiState<S, B>>,
  _user: CurrentUser,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let roster = state
    .store
    .list_active_profiles()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(roster))
}
