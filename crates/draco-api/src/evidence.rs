//! Handlers for evidence and the chain-of-custody trail.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/cases/{id}/evidence` | Optional base64 file payload |
//! | `GET`  | `/cases/{id}/evidence` | Newest first, trails attached |
//! | `GET`  | `/evidence/{id}` | 404 outside the caller's visibility |
//! | `POST` | `/evidence/{id}/custody` | Appends to the trail, never edits it |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use draco_core::{
  blob::BlobStore,
  evidence::{CustodyAction, CustodyEvent, Evidence, EvidenceFile, EvidenceKind, NewEvidence},
  store::CaseStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::CurrentUser, cases, error::ApiError};

fn sanitize_file_name(name: &str) -> String {
  name
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
    })
    .collect()
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind:        EvidenceKind,
  pub description: String,
  #[serde(default)]
  pub file_name:   Option<String>,
  #[serde(default)]
  pub file_base64: Option<String>,
}

/// `POST /cases/{id}/evidence`
pub async fn create<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(case_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: BlobStore + 'static,
{
  let case = cases::visible_case(&state, &user, case_id).await?;

  let file = match (&body.file_base64, &body.file_name) {
    (Some(encoded), Some(name)) => {
      let bytes = B64
        .decode(encoded)
        .map_err(|_| ApiError::BadRequest("file_base64 is not valid base64".into()))?;
      let name = sanitize_file_name(name);
      let path = format!("evidence/{}/{}-{name}", case.case_id, Uuid::new_v4());
      let stored = state
        .blobs
        .store(&path, &bytes)
        .await
        .map_err(ApiError::store)?;
      Some(EvidenceFile { url: stored.url, name, content_hash: stored.content_hash })
    }
    (Some(_), None) => {
      return Err(ApiError::BadRequest("file_name is required with file_base64".into()));
    }
    (None, Some(_)) => {
      return Err(ApiError::BadRequest("file_base64 is required with file_name".into()));
    }
    (None, None) => None,
  };

  let input = NewEvidence {
    case_id:      case.case_id,
    kind:         body.kind,
    description:  body.description,
    file,
    collected_by: user.profile.profile_id,
  };
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let evidence = state.store.add_evidence(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(evidence)))
}

// ─── List for a case ──────────────────────────────────────────────────────────

/// `GET /cases/{id}/evidence`
pub async fn list_for_case<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(case_id): Path<Uuid>,
) -> Result<Json<Vec<Evidence>>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let case = cases::visible_case(&state, &user, case_id).await?;
  let items = state
    .store
    .list_evidence(case.case_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(items))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// Load an evidence item the caller is allowed to see, or 404.
async fn visible_evidence<S, B>(
  state: &ApiState<S, B>,
  user: &CurrentUser,
  id: Uuid,
) -> Result<Evidence, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let not_found = || ApiError::NotFound(format!("evidence {id} not found"));

  let evidence = state
    .store
    .get_evidence(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;

  // visibility follows the owning case
  let case = state
    .store
    .get_case(evidence.case_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  if !cases::can_view(&user.profile, &case) {
    return Err(not_found());
  }

  Ok(evidence)
}

/// `GET /evidence/{id}`
pub async fn get_one<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Evidence>, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  Ok(Json(visible_evidence(&state, &user, id).await?))
}

// ─── Custody ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CustodyBody {
  pub action: CustodyAction,
  #[serde(default)]
  pub note:   Option<String>,
}

/// `POST /evidence/{id}/custody` — the caller is recorded as the actor.
pub async fn append_custody<S, B>(
  State(state): State<ApiState<S, B>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<CustodyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: Send + Sync + 'static,
{
  let evidence = visible_evidence(&state, &user, id).await?;

  let event: CustodyEvent = state
    .store
    .append_custody_event(
      evidence.evidence_id,
      body.action,
      user.profile.profile_id,
      body.note,
    )
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(event)))
}
