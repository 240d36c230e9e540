//! Process-level assembly for the DRACO server: configuration, the
//! filesystem blob store, and the traced application router.

pub mod blob;

use std::path::PathBuf;

use axum::Router;
use draco_api::ApiState;
use draco_core::{blob::BlobStore, store::CaseStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Runtime server configuration, deserialised from `config.toml` with
/// `DRACO_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// Public base URL evidence file links are joined to.
  pub base_url:   String,
  pub store_path: PathBuf,
  pub blob_root:  PathBuf,
}

/// The full application router: the JSON API with request tracing.
pub fn app<S, B>(state: ApiState<S, B>) -> Router
where
  S: CaseStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  B: BlobStore + 'static,
{
  draco_api::api_router(state).layer(TraceLayer::new_for_http())
}
