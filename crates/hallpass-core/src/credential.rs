//! The credential payload — the data behind a student's scannable QR code.
//!
//! The payload is plain identifying data: no signature, no expiry. It is
//! generated fresh whenever the student's key screen renders and is never
//! persisted. Field names on the wire are fixed; a payload must decode to
//! exactly the fields that were encoded.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, Role},
};

/// The identifying fields encoded into a student's displayed QR code.
///
/// Wire field names (`uid`, `regNo`, …) are part of the scan contract and
/// must not change — deployed scanner clients parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialPayload {
  #[serde(rename = "uid")]
  pub identity_id: Uuid,
  #[serde(rename = "regNo")]
  pub reg_no:      String,
  pub name:        String,
  pub hostel:      String,
  pub room:        String,
}

impl CredentialPayload {
  /// Build the payload for a student identity.
  ///
  /// Guards and wardens carry no scannable credential; encoding them is an
  /// [`Error::NotAStudent`] failure.
  pub fn for_identity(identity: &Identity) -> Result<Self> {
    match &identity.role {
      Role::Student { reg_no, hostel, room } => Ok(Self {
        identity_id: identity.identity_id,
        reg_no:      reg_no.clone(),
        name:        identity.name.clone(),
        hostel:      hostel.clone(),
        room:        room.clone(),
      }),
      Role::Guard { .. } | Role::Admin { .. } => {
        Err(Error::NotAStudent(identity.identity_id))
      }
    }
  }

  /// Serialize to the scannable JSON text.
  pub fn encode(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Parse a scanned payload.
  ///
  /// Any input that is not the exact serialized structure — truncated JSON,
  /// missing fields, wrong types — yields [`Error::MalformedCredential`].
  /// Never panics; callers surface the failure and keep the scanning loop
  /// alive.
  pub fn decode(raw: &str) -> Result<Self> {
    serde_json::from_str(raw)
      .map_err(|e| Error::MalformedCredential(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn student() -> Identity {
    Identity {
      identity_id: Uuid::new_v4(),
      name:        "Asha Rao".into(),
      role:        Role::Student {
        reg_no: "RA2111003011234".into(),
        hostel: "A".into(),
        room:   "101".into(),
      },
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn round_trip_is_lossless() {
    let payload = CredentialPayload::for_identity(&student()).unwrap();
    let encoded = payload.encode().unwrap();
    let decoded = CredentialPayload::decode(&encoded).unwrap();
    assert_eq!(decoded, payload);
  }

  #[test]
  fn wire_field_names_are_stable() {
    let payload = CredentialPayload::for_identity(&student()).unwrap();
    let json: serde_json::Value =
      serde_json::from_str(&payload.encode().unwrap()).unwrap();
    assert!(json.get("uid").is_some());
    assert!(json.get("regNo").is_some());
    assert!(json.get("name").is_some());
    assert!(json.get("hostel").is_some());
    assert!(json.get("room").is_some());
  }

  #[test]
  fn garbage_decodes_to_malformed_credential() {
    for raw in ["", "not json", "{\"uid\":", "42", "[1,2,3]"] {
      let err = CredentialPayload::decode(raw).unwrap_err();
      assert!(matches!(err, Error::MalformedCredential(_)), "input {raw:?}");
    }
  }

  #[test]
  fn missing_field_is_malformed() {
    let raw = r#"{"uid":"7f2c8cc6-3cd2-4f07-9b1b-2b3c4d5e6f70","name":"Asha"}"#;
    let err = CredentialPayload::decode(raw).unwrap_err();
    assert!(matches!(err, Error::MalformedCredential(_)));
  }

  #[test]
  fn non_student_has_no_credential() {
    let guard = Identity {
      identity_id: Uuid::new_v4(),
      name:        "R. Singh".into(),
      role:        Role::Guard { post: "Main Gate".into() },
      created_at:  Utc::now(),
    };
    let err = CredentialPayload::for_identity(&guard).unwrap_err();
    assert!(matches!(err, Error::NotAStudent(id) if id == guard.identity_id));
  }
}
