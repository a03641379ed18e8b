//! Handler for `POST /auth/register`.
//!
//! Registration is open: anyone may create an account, as on a campus where
//! onboarding happens at the gate office. The role is fixed at registration.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use hallpass_core::{
  identity::{Identity, NewAccount, NewIdentity, Role},
  store::DirectoryStore,
};

use crate::{AppState, auth, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:    String,
  pub password: String,
  pub name:     String,
  /// Serde-tagged role, e.g. `{"role":"student","reg_no":…,"hostel":…,"room":…}`.
  #[serde(flatten)]
  pub role:     Role,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DirectoryStore,
{
  if body.email.trim().is_empty() {
    return Err(ApiError::BadRequest("email must not be empty".into()));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }

  if state
    .store
    .account_for_email(&body.email)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict(format!(
      "email already registered: {}",
      body.email
    )));
  }

  let identity: Identity = state
    .store
    .create_identity(NewIdentity {
      name: body.name,
      role: body.role,
    })
    .await
    .map_err(ApiError::store)?;

  let password_hash = auth::hash_password(&body.password)?;
  state
    .store
    .create_account(NewAccount {
      email: body.email,
      password_hash,
      identity_id: identity.identity_id,
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(identity)))
}
