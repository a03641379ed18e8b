//! The scan-gate handshake: the guard-side decision procedure.
//!
//! Two layers:
//!
//! - [`ScanGate`] is a pure state machine over the scanner input. It
//!   replaces a shared scan-lock boolean with explicit states
//!   (`Idle`, `Armed`, `Decoding`, `Resolved`) and an arming epoch. The
//!   camera feed may emit duplicate reads for one physical presentation, and
//!   a decode callback may arrive after the guard has cancelled; both are
//!   rejected by the epoch check. Exactly one decode is accepted per
//!   explicit `arm`, and the gate is only ever re-armed by another explicit
//!   `arm` — never automatically after logging or cancelling.
//!
//! - [`GateSession`] drives the full handshake against a
//!   [`DirectoryStore`]: decode, approved-request lookup, guard condition,
//!   log append, and approval consumption.

use chrono::{Local, NaiveTime};
use uuid::Uuid;

use crate::{
  Error, Result,
  credential::CredentialPayload,
  curfew::CurfewWindow,
  log::{AccessLogEntry, Direction, NewLogEntry},
  request::RequestStatus,
  store::DirectoryStore,
};

// ─── Scan state ──────────────────────────────────────────────────────────────

/// A decoded credential together with the bearer's approval state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScan {
  pub bearer:           CredentialPayload,
  /// The bearer's current approved late-entry request, if any — at most one
  /// by the lifecycle invariant.
  pub approved_request: Option<Uuid>,
}

impl ResolvedScan {
  pub fn has_approved_request(&self) -> bool {
    self.approved_request.is_some()
  }
}

/// Token returned by [`ScanGate::arm`]; scan events must present the epoch
/// they were armed under. A stale epoch identifies a late or duplicate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanEpoch(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
  /// Scanner closed; nothing accepted.
  Idle,
  /// Scanner open, waiting for the first decode.
  Armed,
  /// A payload decoded; approval lookup in flight.
  Decoding(CredentialPayload),
  /// Bearer on screen, awaiting the guard's direction choice or cancel.
  Resolved(ResolvedScan),
}

/// What a permitted direction choice commits to the store.
#[derive(Debug, Clone)]
pub struct LogDecision {
  pub log:           NewLogEntry,
  /// Approval to consume: an approved request is single-use and closes on
  /// the first logged movement, whatever its direction.
  pub close_request: Option<Uuid>,
}

/// Evaluate the guard condition and build the log entry for a direction
/// choice.
///
/// The single business-critical rule: during curfew, a bearer without an
/// approved late-entry request is blocked — nothing is written and the
/// bearer must be denied physical entry.
pub fn decide(
  scan: &ResolvedScan,
  direction: Direction,
  curfew_now: bool,
  guard: Uuid,
) -> Result<LogDecision> {
  if curfew_now && !scan.has_approved_request() {
    return Err(Error::ActionBlocked { direction });
  }

  Ok(LogDecision {
    log:           NewLogEntry {
      subject:   scan.bearer.identity_id,
      name:      scan.bearer.name.clone(),
      reg_no:    scan.bearer.reg_no.clone(),
      direction,
      curfew:    curfew_now && direction == Direction::Entry,
      approved:  scan.has_approved_request(),
      guard,
    },
    close_request: scan.approved_request,
  })
}

// ─── ScanGate ────────────────────────────────────────────────────────────────

/// The scanner-side state machine. Pure: no clock, no store.
#[derive(Debug)]
pub struct ScanGate {
  state: GateState,
  epoch: u64,
}

impl Default for ScanGate {
  fn default() -> Self { Self::new() }
}

impl ScanGate {
  pub fn new() -> Self {
    Self {
      state: GateState::Idle,
      epoch: 0,
    }
  }

  /// The bearer currently on screen, if a scan has resolved.
  pub fn resolved(&self) -> Option<&ResolvedScan> {
    match &self.state {
      GateState::Resolved(scan) => Some(scan),
      _ => None,
    }
  }

  pub fn is_armed(&self) -> bool { matches!(self.state, GateState::Armed) }

  /// Open the scanner. Permitted from any state; bumps the epoch so that
  /// anything still in flight from before is discarded.
  pub fn arm(&mut self) -> ScanEpoch {
    self.epoch += 1;
    self.state = GateState::Armed;
    ScanEpoch(self.epoch)
  }

  /// Close the scanner and drop any scan in progress. Bumps the epoch so a
  /// decode or lookup resolving after the cancel cannot mutate state.
  pub fn cancel(&mut self) {
    self.epoch += 1;
    self.state = GateState::Idle;
  }

  fn check_epoch(&self, epoch: ScanEpoch) -> Result<()> {
    if epoch.0 == self.epoch {
      Ok(())
    } else {
      Err(Error::ScannerDisarmed)
    }
  }

  /// Accept a raw scanner read.
  ///
  /// Only the first read of the current arming is accepted; duplicates and
  /// reads against a cancelled arming fail with
  /// [`Error::ScannerDisarmed`]. A payload that does not decode disarms the
  /// gate (the guard must explicitly re-arm) and yields
  /// [`Error::MalformedCredential`] with nothing mutated elsewhere.
  pub fn begin_decode(
    &mut self,
    epoch: ScanEpoch,
    raw: &str,
  ) -> Result<CredentialPayload> {
    self.check_epoch(epoch)?;
    if !matches!(self.state, GateState::Armed) {
      return Err(Error::ScannerDisarmed);
    }

    match CredentialPayload::decode(raw) {
      Ok(payload) => {
        self.state = GateState::Decoding(payload.clone());
        Ok(payload)
      }
      Err(e) => {
        self.epoch += 1;
        self.state = GateState::Idle;
        Err(e)
      }
    }
  }

  /// Complete a decode with the bearer's approval lookup result.
  ///
  /// Rejected when the gate was cancelled or re-armed while the lookup was
  /// in flight.
  pub fn present(
    &mut self,
    epoch: ScanEpoch,
    approved_request: Option<Uuid>,
  ) -> Result<&ResolvedScan> {
    self.check_epoch(epoch)?;
    let GateState::Decoding(bearer) = &self.state else {
      return Err(Error::ScannerDisarmed);
    };

    let scan = ResolvedScan {
      bearer: bearer.clone(),
      approved_request,
    };
    self.state = GateState::Resolved(scan);
    self.resolved().ok_or(Error::ScannerDisarmed)
  }

  /// Apply the guard's direction choice.
  ///
  /// A blocked action leaves the gate in its resolved state so the guard
  /// still sees the bearer and the denial; a permitted one returns the
  /// [`LogDecision`] to commit and drops back to `Idle` — the scanner stays
  /// closed until the guard explicitly arms again.
  pub fn record(
    &mut self,
    direction: Direction,
    curfew_now: bool,
    guard: Uuid,
  ) -> Result<LogDecision> {
    let GateState::Resolved(scan) = &self.state else {
      return Err(Error::NoBearerPresented);
    };

    let decision = decide(scan, direction, curfew_now, guard)?;
    self.epoch += 1;
    self.state = GateState::Idle;
    Ok(decision)
  }
}

// ─── Stateless handshake steps ───────────────────────────────────────────────

/// Decode a scanned payload and look up the bearer's approved request.
///
/// Used by stateless callers (the HTTP API); interactive clients go through
/// [`GateSession`], which adds the debounce discipline.
pub async fn resolve_bearer<S: DirectoryStore>(
  store: &S,
  raw: &str,
) -> Result<ResolvedScan> {
  let bearer = CredentialPayload::decode(raw)?;
  let approved = store
    .approved_request_for(bearer.identity_id)
    .await
    .map_err(Error::backend)?;
  Ok(ResolvedScan {
    bearer,
    approved_request: approved.map(|r| r.request_id),
  })
}

/// Commit a [`LogDecision`]: append the log entry, then consume the
/// approval if one existed.
pub async fn commit_decision<S: DirectoryStore>(
  store: &S,
  decision: LogDecision,
) -> Result<AccessLogEntry> {
  let entry = store
    .append_log(decision.log)
    .await
    .map_err(Error::backend)?;

  if let Some(request_id) = decision.close_request {
    store
      .set_request_status(request_id, RequestStatus::Closed)
      .await
      .map_err(Error::backend)?;
  }

  Ok(entry)
}

/// The full stateless handshake tail: guard condition, log append, approval
/// consumption. On [`Error::ActionBlocked`] nothing is written.
pub async fn record_movement<S: DirectoryStore>(
  store: &S,
  scan: &ResolvedScan,
  direction: Direction,
  guard: Uuid,
  curfew_now: bool,
) -> Result<AccessLogEntry> {
  let decision = decide(scan, direction, curfew_now, guard)?;
  commit_decision(store, decision).await
}

// ─── GateSession ─────────────────────────────────────────────────────────────

/// A guard's interactive scanning session over a [`DirectoryStore`].
///
/// Owns a [`ScanGate`] and performs the store half of the handshake. One
/// session per guard console; the single logical thread of control is the
/// caller's event loop.
pub struct GateSession<S> {
  store:  S,
  gate:   ScanGate,
  guard:  Uuid,
  curfew: CurfewWindow,
}

impl<S: DirectoryStore> GateSession<S> {
  pub fn new(store: S, guard: Uuid, curfew: CurfewWindow) -> Self {
    Self {
      store,
      gate: ScanGate::new(),
      guard,
      curfew,
    }
  }

  /// Open the scanner for exactly one decode.
  pub fn arm(&mut self) -> ScanEpoch { self.gate.arm() }

  /// Close the scanner; any in-flight decode or lookup is discarded.
  pub fn cancel(&mut self) { self.gate.cancel() }

  pub fn resolved(&self) -> Option<&ResolvedScan> { self.gate.resolved() }

  /// Handle one raw scanner read: decode, look up the approved request, and
  /// present the bearer. Returns the resolved scan for display.
  pub async fn scan(
    &mut self,
    epoch: ScanEpoch,
    raw: &str,
  ) -> Result<&ResolvedScan> {
    let bearer = self.gate.begin_decode(epoch, raw)?;

    // The lookup is async; the gate may be cancelled or re-armed before it
    // resolves. `present` re-checks the epoch and discards a stale result.
    let approved = self
      .store
      .approved_request_for(bearer.identity_id)
      .await
      .map_err(Error::backend)?;
    self.gate.present(epoch, approved.map(|r| r.request_id))
  }

  /// Record the guard's direction choice at the current wall-clock time.
  pub async fn log(&mut self, direction: Direction) -> Result<AccessLogEntry> {
    self.log_at(direction, Local::now().time()).await
  }

  /// [`Self::log`] with an explicit time of day.
  pub async fn log_at(
    &mut self,
    direction: Direction,
    now: NaiveTime,
  ) -> Result<AccessLogEntry> {
    let curfew_now = self.curfew.contains(&now);
    let decision = self.gate.record(direction, curfew_now, self.guard)?;
    commit_decision(&self.store, decision).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw_payload() -> String {
    let payload = CredentialPayload {
      identity_id: Uuid::new_v4(),
      reg_no:      "RA2111003011234".into(),
      name:        "Asha Rao".into(),
      hostel:      "A".into(),
      room:        "101".into(),
    };
    payload.encode().unwrap()
  }

  fn resolved_scan(approved: Option<Uuid>) -> ResolvedScan {
    ResolvedScan {
      bearer:           CredentialPayload::decode(&raw_payload()).unwrap(),
      approved_request: approved,
    }
  }

  // ── decide ────────────────────────────────────────────────────────────

  #[test]
  fn curfew_without_approval_blocks() {
    let err = decide(
      &resolved_scan(None),
      Direction::Entry,
      true,
      Uuid::new_v4(),
    )
    .unwrap_err();
    assert!(
      matches!(err, Error::ActionBlocked { direction: Direction::Entry })
    );
  }

  #[test]
  fn curfew_with_approval_logs_and_consumes() {
    let request_id = Uuid::new_v4();
    let decision = decide(
      &resolved_scan(Some(request_id)),
      Direction::Entry,
      true,
      Uuid::new_v4(),
    )
    .unwrap();
    assert!(decision.log.curfew);
    assert!(decision.log.approved);
    assert_eq!(decision.close_request, Some(request_id));
  }

  #[test]
  fn curfew_flag_only_set_on_entry() {
    let request_id = Uuid::new_v4();
    let decision = decide(
      &resolved_scan(Some(request_id)),
      Direction::Exit,
      true,
      Uuid::new_v4(),
    )
    .unwrap();
    // Exit during curfew: logged, approval consumed, but not a late entry.
    assert!(!decision.log.curfew);
    assert_eq!(decision.close_request, Some(request_id));
  }

  #[test]
  fn outside_curfew_no_approval_needed() {
    let decision = decide(
      &resolved_scan(None),
      Direction::Exit,
      false,
      Uuid::new_v4(),
    )
    .unwrap();
    assert!(!decision.log.curfew);
    assert!(!decision.log.approved);
    assert!(decision.close_request.is_none());
  }

  // ── ScanGate ──────────────────────────────────────────────────────────

  #[test]
  fn one_decode_per_arming() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();
    let raw = raw_payload();

    gate.begin_decode(epoch, &raw).unwrap();
    // The camera fires again for the same presentation.
    let err = gate.begin_decode(epoch, &raw).unwrap_err();
    assert!(matches!(err, Error::ScannerDisarmed));
  }

  #[test]
  fn decode_without_arming_rejected() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();
    gate.cancel();
    let err = gate.begin_decode(epoch, &raw_payload()).unwrap_err();
    assert!(matches!(err, Error::ScannerDisarmed));
  }

  #[test]
  fn stale_epoch_after_rearm_rejected() {
    let mut gate = ScanGate::new();
    let old = gate.arm();
    let new = gate.arm();
    assert!(matches!(
      gate.begin_decode(old, &raw_payload()),
      Err(Error::ScannerDisarmed)
    ));
    assert!(gate.begin_decode(new, &raw_payload()).is_ok());
  }

  #[test]
  fn lookup_resolving_after_cancel_is_discarded() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();
    gate.begin_decode(epoch, &raw_payload()).unwrap();

    // Guard cancels while the approval lookup is in flight.
    gate.cancel();

    let err = gate.present(epoch, Some(Uuid::new_v4())).unwrap_err();
    assert!(matches!(err, Error::ScannerDisarmed));
    assert!(gate.resolved().is_none());
  }

  #[test]
  fn malformed_scan_disarms_without_panicking() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();

    let err = gate.begin_decode(epoch, "{{nonsense").unwrap_err();
    assert!(matches!(err, Error::MalformedCredential(_)));
    assert!(!gate.is_armed());

    // Explicit re-arm recovers the gate.
    let epoch = gate.arm();
    assert!(gate.begin_decode(epoch, &raw_payload()).is_ok());
  }

  #[test]
  fn blocked_action_keeps_bearer_on_screen() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();
    gate.begin_decode(epoch, &raw_payload()).unwrap();
    gate.present(epoch, None).unwrap();

    let err = gate
      .record(Direction::Entry, true, Uuid::new_v4())
      .unwrap_err();
    assert!(matches!(err, Error::ActionBlocked { .. }));
    assert!(gate.resolved().is_some());

    // Only a cancel (or a permitted log) clears the resolved scan.
    gate.cancel();
    assert!(gate.resolved().is_none());
  }

  #[test]
  fn successful_record_returns_to_idle_not_armed() {
    let mut gate = ScanGate::new();
    let epoch = gate.arm();
    gate.begin_decode(epoch, &raw_payload()).unwrap();
    gate.present(epoch, None).unwrap();

    gate.record(Direction::Exit, false, Uuid::new_v4()).unwrap();
    assert!(!gate.is_armed());
    assert!(gate.resolved().is_none());

    // The old epoch is dead; only a fresh arm accepts scans.
    assert!(matches!(
      gate.begin_decode(epoch, &raw_payload()),
      Err(Error::ScannerDisarmed)
    ));
  }

  #[test]
  fn record_without_resolved_scan_rejected() {
    let mut gate = ScanGate::new();
    let err = gate
      .record(Direction::Entry, false, Uuid::new_v4())
      .unwrap_err();
    assert!(matches!(err, Error::NoBearerPresented));
  }
}
