//! HTTP Basic-auth extractor backed by the account table, plus password
//! hashing helpers shared with registration.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use hallpass_core::{identity::Identity, store::DirectoryStore};

use crate::{AppState, error::ApiError};

/// The authenticated caller: their account's identity record.
///
/// Present in a handler's arguments means the request carried valid Basic
/// credentials for an existing account.
pub struct AuthIdentity(pub Identity);

impl AuthIdentity {
  /// The caller's identity, or 403 when they are not a student.
  pub fn require_student(&self) -> Result<&Identity, ApiError> {
    if self.0.role.is_student() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("students only".into()))
    }
  }

  pub fn require_guard(&self) -> Result<&Identity, ApiError> {
    if self.0.role.is_guard() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("guards only".into()))
    }
  }

  pub fn require_admin(&self) -> Result<&Identity, ApiError> {
    if self.0.role.is_admin() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden("wardens only".into()))
    }
  }
}

/// Produce an argon2 PHC string for a new password.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::BadRequest(format!("password hash error: {e}")))
}

/// Pull the email/password pair out of an `Authorization: Basic` header.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// Verify Basic credentials against the account table and load the caller's
/// identity.
pub async fn authenticate<S>(
  headers: &HeaderMap,
  state: &AppState<S>,
) -> Result<AuthIdentity, ApiError>
where
  S: DirectoryStore,
{
  let (email, password) = basic_credentials(headers)?;

  let account = state
    .store
    .account_for_email(&email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  let identity = state
    .store
    .get_identity(account.identity_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  Ok(AuthIdentity(identity))
}

impl<S> FromRequestParts<AppState<S>> for AuthIdentity
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state).await
  }
}
