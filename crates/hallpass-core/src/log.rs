//! Access log entries — the append-only record of gate movements.
//!
//! An entry is written only by the scan-gate handshake on a completed scan
//! and is immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a logged movement.
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
pub enum Direction {
  Entry,
  Exit,
}

impl Direction {
  /// Whether the bearer is inside the hostel after this movement — the
  /// verdict the warden's student-lookup screen reports from the most
  /// recent log entry.
  pub fn leaves_inside(self) -> bool { matches!(self, Self::Entry) }
}

/// One recorded gate movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
  pub log_id:      Uuid,
  /// The bearer whose credential was scanned.
  pub subject:     Uuid,
  pub name:        String,
  pub reg_no:      String,
  pub direction:   Direction,
  pub recorded_at: DateTime<Utc>,
  /// True iff this was an entry logged during the curfew window.
  pub curfew:      bool,
  /// True iff the bearer held an approved late-entry request at scan time.
  pub approved:    bool,
  /// The guard who recorded the movement.
  pub guard:       Uuid,
}

/// Input to [`crate::store::DirectoryStore::append_log`].
/// The id and `recorded_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
  pub subject:   Uuid,
  pub name:      String,
  pub reg_no:    String,
  pub direction: Direction,
  pub curfew:    bool,
  pub approved:  bool,
  pub guard:     Uuid,
}
