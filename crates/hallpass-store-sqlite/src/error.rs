//! Error types for `hallpass-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("ticket not found: {0}")]
  TicketNotFound(Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  /// Lifecycle validation failures (invalid transitions, empty fields).
  #[error(transparent)]
  Domain(#[from] hallpass_core::Error),

  #[error("database error: {0}")]
  Sqlite(#[from] tokio_rusqlite::Error),

  #[error("invalid uuid in database: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("invalid timestamp in database: {0}")]
  DateParse(String),

  #[error("invalid stored value: {0}")]
  Decode(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
