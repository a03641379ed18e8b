//! Handlers for the authenticated caller's own records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | The caller's identity |
//! | `GET`  | `/me/credential` | Students only: the scannable payload |
//! | `GET`  | `/curfew` | Configured window and whether it is active now |

use axum::{Json, extract::State};
use chrono::Local;
use serde::Serialize;

use hallpass_core::{
  credential::CredentialPayload, identity::Identity, store::DirectoryStore,
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

/// `GET /me`
pub async fn me<S>(
  auth: AuthIdentity,
  State(_state): State<AppState<S>>,
) -> Result<Json<Identity>, ApiError>
where
  S: DirectoryStore,
{
  Ok(Json(auth.0))
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
  /// The encoded payload to render as a QR code.
  pub credential: String,
}

/// `GET /me/credential`
pub async fn credential<S>(
  auth: AuthIdentity,
  State(_state): State<AppState<S>>,
) -> Result<Json<CredentialResponse>, ApiError>
where
  S: DirectoryStore,
{
  let who = auth.require_student()?;
  let payload = CredentialPayload::for_identity(who)?;
  Ok(Json(CredentialResponse {
    credential: payload.encode()?,
  }))
}

#[derive(Debug, Serialize)]
pub struct CurfewResponse {
  pub start_hour: u32,
  pub end_hour:   u32,
  /// Whether the window contains the server's current local time.
  pub active:     bool,
}

/// `GET /curfew`
pub async fn curfew<S>(
  _auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<CurfewResponse>, ApiError>
where
  S: DirectoryStore,
{
  let window = state.curfew;
  Ok(Json(CurfewResponse {
    start_hour: window.start_hour,
    end_hour:   window.end_hour,
    active:     window.contains(&Local::now().time()),
  }))
}
