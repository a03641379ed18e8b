//! Error types for `hallpass-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{log::Direction, request::RequestStatus, ticket::TicketStatus};

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed credential payload: {0}")]
  MalformedCredential(String),

  #[error("identity {0} is not a student and has no credential")]
  NotAStudent(Uuid),

  #[error("action blocked: curfew is active and the bearer has no approved late-entry request (direction: {direction})")]
  ActionBlocked { direction: Direction },

  #[error("invalid request transition: {from} -> {to}")]
  InvalidTransition {
    from: RequestStatus,
    to:   RequestStatus,
  },

  #[error("invalid ticket transition: {from} -> {to}")]
  InvalidTicketTransition {
    from: TicketStatus,
    to:   TicketStatus,
  },

  #[error("late-entry reason must not be empty")]
  EmptyReason,

  #[error("ticket title must not be empty")]
  EmptyTitle,

  #[error("announcement message must not be empty")]
  EmptyMessage,

  #[error("requester {0} already has an active late-entry request")]
  RequestOutstanding(Uuid),

  #[error("scanner is not armed (late or duplicate scan event discarded)")]
  ScannerDisarmed,

  #[error("no scanned bearer to log")]
  NoBearerPresented,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("directory service unavailable: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a store error as a directory-service failure.
  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
