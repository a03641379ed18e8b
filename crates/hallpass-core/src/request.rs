//! Late-entry requests and their lifecycle.
//!
//! A request moves `Pending → Approved | Rejected` by warden action, and
//! `Approved → Closed` as a side effect of a successful gate scan, never by
//! direct user action. `Rejected` and `Closed` are terminal.
//!
//! A requester may have at most one non-terminal request outstanding. This
//! is enforced by querying for existing non-terminal requests before
//! creating a new one — best-effort, not a transactional guarantee.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Lifecycle state of a late-entry request.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
  Pending,
  Approved,
  Rejected,
  Closed,
}

impl RequestStatus {
  /// Terminal states admit no further transitions.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Rejected | Self::Closed)
  }

  /// Non-terminal states count against the one-active-request invariant.
  pub fn is_active(self) -> bool { !self.is_terminal() }

  /// Validate a status write.
  ///
  /// Re-asserting the current status is a permitted no-op, so a warden
  /// approving an already-approved request produces a duplicate write with
  /// no distinguishable effect. Everything outside the transition table is
  /// an [`Error::InvalidTransition`].
  pub fn validate_transition(self, to: Self) -> Result<()> {
    let allowed = to == self
      || matches!(
        (self, to),
        (Self::Pending, Self::Approved)
          | (Self::Pending, Self::Rejected)
          | (Self::Approved, Self::Closed)
      );
    if allowed {
      Ok(())
    } else {
      Err(Error::InvalidTransition { from: self, to })
    }
  }
}

/// A late-entry request record.
///
/// Requester name, registration number, and hostel are denormalised onto the
/// record so warden screens render without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateEntryRequest {
  pub request_id: Uuid,
  pub requester:  Uuid,
  pub name:       String,
  pub reg_no:     String,
  pub hostel:     String,
  pub reason:     String,
  pub status:     RequestStatus,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::DirectoryStore::create_request`].
/// The id, `created_at`, and initial `Pending` status are set by the store.
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub requester: Uuid,
  pub name:      String,
  pub reg_no:    String,
  pub hostel:    String,
  pub reason:    String,
}

impl NewRequest {
  /// Build a request, rejecting an empty (or whitespace-only) reason.
  pub fn new(
    requester: Uuid,
    name: impl Into<String>,
    reg_no: impl Into<String>,
    hostel: impl Into<String>,
    reason: impl Into<String>,
  ) -> Result<Self> {
    let reason = reason.into();
    if reason.trim().is_empty() {
      return Err(Error::EmptyReason);
    }
    Ok(Self {
      requester,
      name: name.into(),
      reg_no: reg_no.into(),
      hostel: hostel.into(),
      reason,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use RequestStatus::*;

  #[test]
  fn transition_table() {
    assert!(Pending.validate_transition(Approved).is_ok());
    assert!(Pending.validate_transition(Rejected).is_ok());
    assert!(Approved.validate_transition(Closed).is_ok());

    assert!(Pending.validate_transition(Closed).is_err());
    assert!(Approved.validate_transition(Rejected).is_err());
    assert!(Approved.validate_transition(Pending).is_err());
    assert!(Rejected.validate_transition(Approved).is_err());
    assert!(Rejected.validate_transition(Closed).is_err());
    assert!(Closed.validate_transition(Approved).is_err());
    assert!(Closed.validate_transition(Pending).is_err());
  }

  #[test]
  fn reasserting_current_status_is_a_noop() {
    for status in [Pending, Approved, Rejected, Closed] {
      assert!(status.validate_transition(status).is_ok(), "{status}");
    }
  }

  #[test]
  fn terminal_states() {
    assert!(!Pending.is_terminal());
    assert!(!Approved.is_terminal());
    assert!(Rejected.is_terminal());
    assert!(Closed.is_terminal());
  }

  #[test]
  fn status_text_round_trip() {
    for status in [Pending, Approved, Rejected, Closed] {
      let text = status.to_string();
      assert_eq!(text.parse::<RequestStatus>().unwrap(), status);
    }
    assert_eq!(Approved.to_string(), "approved");
  }

  #[test]
  fn empty_reason_rejected() {
    let err =
      NewRequest::new(Uuid::new_v4(), "Asha", "RA21", "A", "  ").unwrap_err();
    assert!(matches!(err, Error::EmptyReason));
  }
}
