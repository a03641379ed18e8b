//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend failure. Surfaces as 502; the caller retries manually.
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<hallpass_core::Error> for ApiError {
  fn from(e: hallpass_core::Error) -> Self {
    use hallpass_core::Error as E;
    match e {
      E::MalformedCredential(_)
      | E::NotAStudent(_)
      | E::EmptyReason
      | E::EmptyTitle
      | E::EmptyMessage => Self::BadRequest(e.to_string()),
      E::ActionBlocked { .. }
      | E::InvalidTransition { .. }
      | E::InvalidTicketTransition { .. }
      | E::RequestOutstanding(_) => Self::Conflict(e.to_string()),
      E::Backend(inner) => Self::Store(inner),
      other => Self::BadRequest(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
    };

    if status == StatusCode::UNAUTHORIZED {
      return (
        status,
        [(axum::http::header::WWW_AUTHENTICATE, "Basic realm=\"hallpass\"")],
        Json(json!({ "error": message })),
      )
        .into_response();
    }

    (status, Json(json!({ "error": message }))).into_response()
  }
}
