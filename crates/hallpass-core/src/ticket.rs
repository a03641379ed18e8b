//! Maintenance tickets raised by students and resolved by wardens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Ticket state: `Open → Resolved`, nothing else.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
pub enum TicketStatus {
  Open,
  Resolved,
}

impl TicketStatus {
  /// Validate a status write. Re-asserting the current status is a no-op;
  /// reopening a resolved ticket is not supported.
  pub fn validate_transition(self, to: Self) -> Result<()> {
    match (self, to) {
      (from, to) if from == to => Ok(()),
      (Self::Open, Self::Resolved) => Ok(()),
      (from, to) => Err(Error::InvalidTicketTransition { from, to }),
    }
  }
}

/// A maintenance ticket. Name and room are denormalised for the warden view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
  pub ticket_id:   Uuid,
  pub requester:   Uuid,
  pub name:        String,
  pub room:        String,
  pub title:       String,
  pub description: String,
  pub status:      TicketStatus,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::DirectoryStore::create_ticket`].
/// The id, `created_at`, and initial `Open` status are set by the store.
#[derive(Debug, Clone)]
pub struct NewTicket {
  pub requester:   Uuid,
  pub name:        String,
  pub room:        String,
  pub title:       String,
  pub description: String,
}

impl NewTicket {
  /// Build a ticket, rejecting an empty title.
  pub fn new(
    requester: Uuid,
    name: impl Into<String>,
    room: impl Into<String>,
    title: impl Into<String>,
    description: impl Into<String>,
  ) -> Result<Self> {
    let title = title.into();
    if title.trim().is_empty() {
      return Err(Error::EmptyTitle);
    }
    Ok(Self {
      requester,
      name: name.into(),
      room: room.into(),
      title,
      description: description.into(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn open_resolves_once() {
    assert!(TicketStatus::Open
      .validate_transition(TicketStatus::Resolved)
      .is_ok());
    assert!(TicketStatus::Resolved
      .validate_transition(TicketStatus::Open)
      .is_err());
    assert!(TicketStatus::Resolved
      .validate_transition(TicketStatus::Resolved)
      .is_ok());
  }

  #[test]
  fn status_text_matches_display_form() {
    // Stored capitalised, matching the original records.
    assert_eq!(TicketStatus::Open.to_string(), "Open");
    assert_eq!(TicketStatus::Resolved.to_string(), "Resolved");
    assert_eq!("Open".parse::<TicketStatus>().unwrap(), TicketStatus::Open);
  }

  #[test]
  fn empty_title_rejected() {
    let err =
      NewTicket::new(Uuid::new_v4(), "Asha", "101", "", "fan broken").unwrap_err();
    assert!(matches!(err, Error::EmptyTitle));
  }
}
