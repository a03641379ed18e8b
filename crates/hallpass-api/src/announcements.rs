//! Handlers for announcement endpoints.
//!
//! | Method | Path | Role | Notes |
//! |--------|------|------|-------|
//! | `GET`  | `/announcements` | any | Students see only their hostel + `All` |
//! | `POST` | `/announcements` | warden | `target` is a hostel code or omitted |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use hallpass_core::{
  identity::Role,
  notice::{Announcement, Audience, NewAnnouncement},
  store::DirectoryStore,
};

use crate::{AppState, auth::AuthIdentity, error::ApiError};

/// `GET /announcements`
pub async fn list<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Announcement>>, ApiError>
where
  S: DirectoryStore,
{
  let mut announcements = state
    .store
    .announcements()
    .await
    .map_err(ApiError::store)?;

  // Audience targeting applies to students; staff see everything.
  if let Role::Student { hostel, .. } = &auth.0.role {
    announcements.retain(|a| a.audience.applies_to(hostel));
  }

  Ok(Json(announcements))
}

#[derive(Debug, Deserialize)]
pub struct PostBody {
  pub message: String,
  /// A hostel code, or omitted/`"All"` for everyone.
  pub target:  Option<String>,
}

/// `POST /announcements`
pub async fn post<S>(
  auth: AuthIdentity,
  State(state): State<AppState<S>>,
  Json(body): Json<PostBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  auth.require_admin()?;

  let audience = match body.target {
    Some(code) => Audience::from_str_form(&code),
    None => Audience::All,
  };
  let input = NewAnnouncement::new(body.message, audience)?;
  let announcement = state
    .store
    .post_announcement(input)
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(announcement)))
}
