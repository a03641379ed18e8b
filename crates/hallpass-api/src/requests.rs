//! Handlers for late-entry request endpoints.
//!
//! | Method | Path | Role | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/requests` | student | 409 while another request is outstanding |
//! | `GET`  | `/requests/active` | student | The caller's non-terminal request |
//! | `GET`  | `/requests` | warden | Optional `?status=pending\|approved\|…` |
//! | `POST` | `/requests/{id}/approve` | warden | 409 on invalid transition |
//! | `POST` | `/requests/{id}/reject` | warden | 409 on invalid transition |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use hallpass_core::{
  identity::Role,
  request::{LateEntryRequest, NewRequest, RequestStatus},
  store::{DirectoryStore, RequestFilter},
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

// ─── Student side ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub reason: String,
}

/// `POST /requests`
pub async fn create<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  let who = auth.require_student()?;
  let Role::Student { reg_no, hostel, .. } = &who.role else {
    return Err(ApiError::Forbidden("students only".into()));
  };

  // Best-effort one-active-request check before creating.
  if let Some(existing) = state
    .store
    .active_request_for(who.identity_id)
    .await
    .map_err(ApiError::store)?
  {
    return Err(ApiError::Conflict(format!(
      "request {} is still outstanding",
      existing.request_id
    )));
  }

  let input =
    NewRequest::new(who.identity_id, &who.name, reg_no, hostel, body.reason)?;
  let request = state
    .store
    .create_request(input)
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /requests/active`
pub async fn active<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<Option<LateEntryRequest>>, ApiError>
where
  S: DirectoryStore,
{
  let who = auth.require_student()?;
  let request = state
    .store
    .active_request_for(who.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(request))
}

// ─── Warden side ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<RequestStatus>,
}

/// `GET /requests[?status=<status>]`
pub async fn list<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LateEntryRequest>>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;
  let requests = state
    .store
    .list_requests(RequestFilter {
      statuses: params.status.into_iter().collect(),
      ..Default::default()
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

/// `POST /requests/{id}/approve`
pub async fn approve<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LateEntryRequest>, ApiError>
where
  S: DirectoryStore,
{
  set_status(auth, state, id, RequestStatus::Approved).await
}

/// `POST /requests/{id}/reject`
pub async fn reject<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LateEntryRequest>, ApiError>
where
  S: DirectoryStore,
{
  set_status(auth, state, id, RequestStatus::Rejected).await
}

async fn set_status<S>(
  auth: AuthIdentity,
  state: AppState<S>,
  id: Uuid,
  status: RequestStatus,
) -> Result<Json<LateEntryRequest>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;

  // Validate here so a stale warden view maps to 404/409 rather than an
  // opaque backend error.
  let request = state
    .store
    .get_request(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("request {id} not found")))?;
  request.status.validate_transition(status)?;

  let updated = state
    .store
    .set_request_status(id, status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}
