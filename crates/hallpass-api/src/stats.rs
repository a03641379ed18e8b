//! Handler for the warden dashboard counters.

use axum::{Json, extract::State};
use serde::Serialize;

use hallpass_core::{
  request::RequestStatus,
  store::{DirectoryStore, RequestFilter},
  ticket::TicketStatus,
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
  pub pending_requests: usize,
  pub open_tickets:     usize,
}

/// `GET /stats`
pub async fn stats<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<StatsResponse>, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;

  let pending = state
    .store
    .list_requests(RequestFilter {
      statuses: vec![RequestStatus::Pending],
      ..Default::default()
    })
    .await
    .map_err(ApiError::store)?;
  let tickets = state.store.list_tickets().await.map_err(ApiError::store)?;

  Ok(Json(StatsResponse {
    pending_requests: pending.len(),
    open_tickets:     tickets
      .iter()
      .filter(|t| t.status == TicketStatus::Open)
      .count(),
  }))
}
