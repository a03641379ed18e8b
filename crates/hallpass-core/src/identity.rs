//! Identity — a registered person and their fixed role.
//!
//! The role is a closed variant carrying only the fields relevant to it,
//! rather than a generic user record with optional fields. An identity's id
//! and role never change after registration; identities are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a registered identity is allowed to do, with its role-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
  /// A resident: holds a scannable credential and may request late entry.
  Student {
    /// University registration number, e.g. `RA2111003011234`.
    reg_no: String,
    /// Hostel block code, e.g. `A`.
    hostel: String,
    room:   String,
  },
  /// Gate staff: scans credentials and records entry/exit movements.
  Guard {
    /// Duty post, e.g. `Main Gate`.
    post: String,
  },
  /// Warden: approves requests, posts announcements, reviews logs/tickets.
  Admin { designation: String },
}

impl Role {
  /// The discriminant string stored in the `role` column and used by the
  /// API for authorization checks.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Student { .. } => "student",
      Self::Guard { .. } => "guard",
      Self::Admin { .. } => "admin",
    }
  }

  pub fn is_student(&self) -> bool { matches!(self, Self::Student { .. }) }

  pub fn is_guard(&self) -> bool { matches!(self, Self::Guard { .. }) }

  pub fn is_admin(&self) -> bool { matches!(self, Self::Admin { .. }) }
}

/// A registered person. The id is globally unique and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub identity_id: Uuid,
  pub name:        String,
  /// Flattened on the wire, so an identity reads as one flat record with a
  /// `role` discriminant.
  #[serde(flatten)]
  pub role:        Role,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::DirectoryStore::create_identity`].
/// The id and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub name: String,
  pub role: Role,
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// An email/password login bound to an identity.
///
/// `password_hash` is an argon2 PHC string; the plaintext never reaches the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub email:         String,
  pub password_hash: String,
  pub identity_id:   Uuid,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::DirectoryStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         String,
  pub password_hash: String,
  pub identity_id:   Uuid,
}
