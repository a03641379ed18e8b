//! Handlers for the warden's view of the access log.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/logs[?limit=]` | Newest first, default 100 |
//! | `GET`  | `/logs/last?reg_no=` | Inside/outside lookup; 404 if never logged |

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use hallpass_core::{log::AccessLogEntry, store::DirectoryStore};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /logs[?limit=<n>]`
pub async fn list<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;
  let logs = state
    .store
    .recent_logs(params.limit.unwrap_or(100))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(logs))
}

#[derive(Debug, Deserialize)]
pub struct LastParams {
  pub reg_no: String,
}

/// `GET /logs/last?reg_no=<reg_no>`
pub async fn last<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Query(params): Query<LastParams>,
) -> Result<Json<AccessLogEntry>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;
  let entry = state
    .store
    .last_log_for_reg_no(&params.reg_no)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no movements recorded for {}", params.reg_no))
    })?;
  Ok(Json(entry))
}
