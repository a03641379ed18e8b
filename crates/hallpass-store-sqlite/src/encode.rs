//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Roles are stored as their
//! serde-tagged JSON form; statuses and directions use their stable text
//! forms. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use hallpass_core::{
  identity::{Account, Identity, Role},
  log::{AccessLogEntry, Direction},
  notice::{Announcement, Audience},
  request::{LateEntryRequest, RequestStatus},
  ticket::{Ticket, TicketStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_role(role: &Role) -> Result<String> {
  Ok(serde_json::to_string(role)?)
}

pub fn decode_role(s: &str) -> Result<Role> { Ok(serde_json::from_str(s)?) }

pub fn decode_request_status(s: &str) -> Result<RequestStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown request status: {s:?}")))
}

pub fn decode_ticket_status(s: &str) -> Result<TicketStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown ticket status: {s:?}")))
}

pub fn decode_direction(s: &str) -> Result<Direction> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown direction: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id: String,
  pub name:        String,
  pub role_json:   String,
  pub created_at:  String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id: decode_uuid(&self.identity_id)?,
      name:        self.name,
      role:        decode_role(&self.role_json)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub email:         String,
  pub password_hash: String,
  pub identity_id:   String,
  pub created_at:    String,
}

impl RawAccount {
  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      email:         self.email,
      password_hash: self.password_hash,
      identity_id:   decode_uuid(&self.identity_id)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `requests` row.
pub struct RawRequest {
  pub request_id: String,
  pub requester:  String,
  pub name:       String,
  pub reg_no:     String,
  pub hostel:     String,
  pub reason:     String,
  pub status:     String,
  pub created_at: String,
}

impl RawRequest {
  pub fn into_request(self) -> Result<LateEntryRequest> {
    Ok(LateEntryRequest {
      request_id: decode_uuid(&self.request_id)?,
      requester:  decode_uuid(&self.requester)?,
      name:       self.name,
      reg_no:     self.reg_no,
      hostel:     self.hostel,
      reason:     self.reason,
      status:     decode_request_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `logs` row.
pub struct RawLog {
  pub log_id:      String,
  pub subject:     String,
  pub name:        String,
  pub reg_no:      String,
  pub direction:   String,
  pub recorded_at: String,
  pub curfew:      bool,
  pub approved:    bool,
  pub guard:       String,
}

impl RawLog {
  pub fn into_log(self) -> Result<AccessLogEntry> {
    Ok(AccessLogEntry {
      log_id:      decode_uuid(&self.log_id)?,
      subject:     decode_uuid(&self.subject)?,
      name:        self.name,
      reg_no:      self.reg_no,
      direction:   decode_direction(&self.direction)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      curfew:      self.curfew,
      approved:    self.approved,
      guard:       decode_uuid(&self.guard)?,
    })
  }
}

/// Raw strings read directly from a `tickets` row.
pub struct RawTicket {
  pub ticket_id:   String,
  pub requester:   String,
  pub name:        String,
  pub room:        String,
  pub title:       String,
  pub description: String,
  pub status:      String,
  pub created_at:  String,
}

impl RawTicket {
  pub fn into_ticket(self) -> Result<Ticket> {
    Ok(Ticket {
      ticket_id:   decode_uuid(&self.ticket_id)?,
      requester:   decode_uuid(&self.requester)?,
      name:        self.name,
      room:        self.room,
      title:       self.title,
      description: self.description,
      status:      decode_ticket_status(&self.status)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `announcements` row.
pub struct RawAnnouncement {
  pub message:   String,
  pub audience:  String,
  pub posted_at: String,
}

impl RawAnnouncement {
  pub fn into_announcement(self) -> Result<Announcement> {
    Ok(Announcement {
      message:   self.message,
      audience:  Audience::from_str_form(&self.audience),
      posted_at: decode_dt(&self.posted_at)?,
    })
  }
}
