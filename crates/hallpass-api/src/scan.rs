//! Handlers for the guard-side scan endpoints.
//!
//! The HTTP surface is stateless: each call carries the raw payload, and the
//! debounce discipline of an interactive scanner lives in the client. The
//! guard condition itself is enforced here, on the server's clock.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/scan` | Decode + approval lookup; 400 on a malformed payload |
//! | `POST` | `/scan/log` | Record a movement; 409 when blocked, nothing written |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Local;
use serde::{Deserialize, Serialize};

use hallpass_core::{
  credential::CredentialPayload,
  gate::{self, ResolvedScan},
  log::Direction,
  store::DirectoryStore,
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  /// The raw text read off the QR code.
  pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
  pub bearer:   CredentialPayload,
  /// Whether the bearer holds an approved late-entry request.
  pub approved: bool,
}

/// `POST /scan`
pub async fn scan<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Json(body): Json<ScanBody>,
) -> Result<Json<ScanResponse>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_guard()?;
  let resolved = resolve(&state, &body.payload).await?;
  Ok(Json(ScanResponse {
    approved: resolved.has_approved_request(),
    bearer:   resolved.bearer,
  }))
}

#[derive(Debug, Deserialize)]
pub struct LogBody {
  pub payload:   String,
  pub direction: Direction,
}

/// `POST /scan/log`
pub async fn log<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Json(body): Json<LogBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  let watcher = auth.require_guard()?;
  let resolved = resolve(&state, &body.payload).await?;

  let curfew_now = state.curfew.contains(&Local::now().time());
  let entry = gate::record_movement(
    state.store.as_ref(),
    &resolved,
    body.direction,
    watcher.identity_id,
    curfew_now,
  )
  .await?;

  Ok((StatusCode::CREATED, Json(entry)))
}

async fn resolve<S>(
  state: &AppState<S>,
  raw: &str,
) -> Result<ResolvedScan, ApiError>
where
  S: DirectoryStore,
{
  Ok(gate::resolve_bearer(state.store.as_ref(), raw).await?)
}
