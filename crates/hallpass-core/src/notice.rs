//! Warden announcements and their audience targeting.
//!
//! Announcements are write-once: never edited or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Who an announcement is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
  All,
  /// A single hostel block, by code.
  Hostel(String),
}

impl Audience {
  /// Whether a student in `hostel` should see this announcement.
  pub fn applies_to(&self, hostel: &str) -> bool {
    match self {
      Self::All => true,
      Self::Hostel(code) => code == hostel,
    }
  }

  /// The stored text form: `All`, or the hostel code itself.
  pub fn as_str(&self) -> &str {
    match self {
      Self::All => "All",
      Self::Hostel(code) => code,
    }
  }

  /// Parse the stored text form.
  pub fn from_str_form(s: &str) -> Self {
    if s == "All" {
      Self::All
    } else {
      Self::Hostel(s.to_owned())
    }
  }
}

/// A posted announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
  pub message:   String,
  pub audience:  Audience,
  pub posted_at: DateTime<Utc>,
}

/// Input to [`crate::store::DirectoryStore::post_announcement`].
/// `posted_at` is set by the store.
#[derive(Debug, Clone)]
pub struct NewAnnouncement {
  pub message:  String,
  pub audience: Audience,
}

impl NewAnnouncement {
  pub fn new(message: impl Into<String>, audience: Audience) -> Result<Self> {
    let message = message.into();
    if message.trim().is_empty() {
      return Err(Error::EmptyMessage);
    }
    Ok(Self { message, audience })
  }
}
