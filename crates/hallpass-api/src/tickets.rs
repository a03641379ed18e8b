//! Handlers for maintenance ticket endpoints.
//!
//! | Method | Path | Role | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/tickets` | student | Room is taken from the caller's record |
//! | `GET`  | `/tickets` | student | The caller's own tickets |
//! | `GET`  | `/tickets/all` | warden | |
//! | `POST` | `/tickets/{id}/resolve` | warden | 409 on invalid transition |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use hallpass_core::{
  identity::Role,
  store::DirectoryStore,
  ticket::{NewTicket, Ticket, TicketStatus},
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:       String,
  pub description: String,
}

/// `POST /tickets`
pub async fn create<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  let who = auth.require_student()?;
  let Role::Student { room, .. } = &who.role else {
    return Err(ApiError::Forbidden("students only".into()));
  };

  let input = NewTicket::new(
    who.identity_id,
    &who.name,
    room,
    body.title,
    body.description,
  )?;
  let ticket = state
    .store
    .create_ticket(input)
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(ticket)))
}

/// `GET /tickets`
pub async fn mine<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
  S: DirectoryStore,
{
  let who = auth.require_student()?;
  let tickets = state
    .store
    .tickets_for(who.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tickets))
}

/// `GET /tickets/all`
pub async fn list_all<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Ticket>>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;
  let tickets = state.store.list_tickets().await.map_err(ApiError::store)?;
  Ok(Json(tickets))
}

/// `POST /tickets/{id}/resolve`
pub async fn resolve<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Ticket>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;

  let ticket = state
    .store
    .list_tickets()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .find(|t| t.ticket_id == id)
    .ok_or_else(|| ApiError::NotFound(format!("ticket {id} not found")))?;
  ticket.status.validate_transition(TicketStatus::Resolved)?;

  let updated = state
    .store
    .set_ticket_status(id, TicketStatus::Resolved)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}
