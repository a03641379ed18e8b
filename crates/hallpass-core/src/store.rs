//! The `DirectoryStore` trait, query types, and the live-subscription
//! contract.
//!
//! The trait is implemented by storage backends (e.g.
//! `hallpass-store-sqlite`). Higher layers (`hallpass-api`, `hallpass-cli`,
//! the gate handshake) depend on this abstraction, not on any concrete
//! backend.
//!
//! Writes are last-write-wins at the document level; the store makes no
//! ordering guarantee across concurrent writers beyond its own
//! read-after-write consistency.

use std::future::Future;

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  identity::{Account, Identity, NewAccount, NewIdentity},
  log::{AccessLogEntry, NewLogEntry},
  notice::{Announcement, NewAnnouncement},
  request::{LateEntryRequest, NewRequest, RequestStatus},
  ticket::{NewTicket, Ticket, TicketStatus},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for request queries and subscriptions.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
  /// Restrict to requests created by this identity.
  pub requester: Option<Uuid>,
  /// Restrict to these statuses; empty means any status.
  pub statuses:  Vec<RequestStatus>,
  pub limit:     Option<usize>,
}

impl RequestFilter {
  /// All non-terminal (pending or approved) requests of one requester —
  /// the query behind the one-active-request invariant.
  pub fn active_for(requester: Uuid) -> Self {
    Self {
      requester: Some(requester),
      statuses:  vec![RequestStatus::Pending, RequestStatus::Approved],
      limit:     None,
    }
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// A live query handle.
///
/// The subscription always holds the full current result set for its query,
/// ordered per the query's sort clause; every change replaces the snapshot
/// wholesale — results are never partially merged. Dropping the handle
/// unsubscribes; unsubscribe is deterministic and idempotent.
#[derive(Debug)]
pub struct Subscription<T> {
  rx: watch::Receiver<Vec<T>>,
}

impl<T: Clone> Subscription<T> {
  /// The current result set.
  pub fn snapshot(&self) -> Vec<T> { self.rx.borrow().clone() }

  /// Wait for the next snapshot replacement.
  ///
  /// Returns `false` once the backing store has dropped the publisher and
  /// no further snapshots will arrive.
  pub async fn changed(&mut self) -> bool {
    self.rx.changed().await.is_ok()
  }

  /// Wait for the next snapshot and return it, or `None` when closed.
  pub async fn next_snapshot(&mut self) -> Option<Vec<T>> {
    if self.changed().await {
      Some(self.snapshot())
    } else {
      None
    }
  }
}

/// The store-side handle that feeds a [`Subscription`].
#[derive(Debug)]
pub struct Publisher<T> {
  tx: watch::Sender<Vec<T>>,
}

impl<T> Publisher<T> {
  /// Replace the subscriber's snapshot.
  pub fn publish(&self, snapshot: Vec<T>) {
    // Send only fails when the subscriber is gone; the caller notices via
    // `closed` and tears the feed down.
    let _ = self.tx.send(snapshot);
  }

  /// True once the subscriber has been dropped.
  pub fn is_closed(&self) -> bool { self.tx.is_closed() }

  /// Resolve when the subscriber drops.
  pub async fn closed(&self) { self.tx.closed().await }
}

/// Create a connected publisher/subscription pair seeded with `initial`.
pub fn subscription<T>(initial: Vec<T>) -> (Publisher<T>, Subscription<T>) {
  let (tx, rx) = watch::channel(initial);
  (Publisher { tx }, Subscription { rx })
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the directory service backing HallPass.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities and accounts ───────────────────────────────────────────

  /// Register an identity. The id and creation time are store-assigned;
  /// the role is fixed thereafter.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Retrieve an identity by id. Returns `None` if not found.
  fn get_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Bind an email/password login to an identity. Fails if the email is
  /// already taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Look up the account for a login email. Returns `None` if not found.
  fn account_for_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  // ── Late-entry requests ───────────────────────────────────────────────

  /// Create a request in `Pending` status.
  fn create_request(
    &self,
    input: NewRequest,
  ) -> impl Future<Output = Result<LateEntryRequest, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<LateEntryRequest>, Self::Error>> + Send + '_;

  /// The requester's current non-terminal request, if any. Used to gate the
  /// "create request" action (best-effort invariant).
  fn active_request_for(
    &self,
    requester: Uuid,
  ) -> impl Future<Output = Result<Option<LateEntryRequest>, Self::Error>> + Send + '_;

  /// The requester's current `Approved` request, if any — at most one by
  /// the lifecycle invariant.
  fn approved_request_for(
    &self,
    requester: Uuid,
  ) -> impl Future<Output = Result<Option<LateEntryRequest>, Self::Error>> + Send + '_;

  /// Write a request's status, validating the lifecycle transition.
  /// Re-asserting the current status is a permitted no-op write.
  fn set_request_status(
    &self,
    id: Uuid,
    status: RequestStatus,
  ) -> impl Future<Output = Result<LateEntryRequest, Self::Error>> + Send + '_;

  /// Requests matching `filter`, newest first.
  fn list_requests(
    &self,
    filter: RequestFilter,
  ) -> impl Future<Output = Result<Vec<LateEntryRequest>, Self::Error>> + Send + '_;

  // ── Access log ────────────────────────────────────────────────────────

  /// Append a log entry. Entries are immutable once written.
  fn append_log(
    &self,
    input: NewLogEntry,
  ) -> impl Future<Output = Result<AccessLogEntry, Self::Error>> + Send + '_;

  /// The most recent `limit` entries, newest first.
  fn recent_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AccessLogEntry>, Self::Error>> + Send + '_;

  /// The most recent entry for a registration number — the warden's
  /// inside/outside lookup.
  fn last_log_for_reg_no<'a>(
    &'a self,
    reg_no: &'a str,
  ) -> impl Future<Output = Result<Option<AccessLogEntry>, Self::Error>> + Send + 'a;

  // ── Tickets ───────────────────────────────────────────────────────────

  /// Create a ticket in `Open` status.
  fn create_ticket(
    &self,
    input: NewTicket,
  ) -> impl Future<Output = Result<Ticket, Self::Error>> + Send + '_;

  /// Write a ticket's status, validating the transition.
  fn set_ticket_status(
    &self,
    id: Uuid,
    status: TicketStatus,
  ) -> impl Future<Output = Result<Ticket, Self::Error>> + Send + '_;

  /// One requester's tickets, newest first.
  fn tickets_for(
    &self,
    requester: Uuid,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  /// All tickets, newest first.
  fn list_tickets(
    &self,
  ) -> impl Future<Output = Result<Vec<Ticket>, Self::Error>> + Send + '_;

  // ── Announcements ─────────────────────────────────────────────────────

  fn post_announcement(
    &self,
    input: NewAnnouncement,
  ) -> impl Future<Output = Result<Announcement, Self::Error>> + Send + '_;

  /// All announcements, newest first. Audience filtering is the caller's
  /// concern.
  fn announcements(
    &self,
  ) -> impl Future<Output = Result<Vec<Announcement>, Self::Error>> + Send + '_;

  // ── Live queries ──────────────────────────────────────────────────────

  /// Subscribe to requests matching `filter`; the snapshot is replaced on
  /// every change to the requests collection.
  fn watch_requests(
    &self,
    filter: RequestFilter,
  ) -> impl Future<Output = Result<Subscription<LateEntryRequest>, Self::Error>> + Send + '_;

  /// Subscribe to the most recent `limit` log entries.
  fn watch_recent_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Subscription<AccessLogEntry>, Self::Error>> + Send + '_;

  /// Subscribe to tickets — all of them, or one requester's.
  fn watch_tickets(
    &self,
    requester: Option<Uuid>,
  ) -> impl Future<Output = Result<Subscription<Ticket>, Self::Error>> + Send + '_;

  /// Subscribe to the announcement feed.
  fn watch_announcements(
    &self,
  ) -> impl Future<Output = Result<Subscription<Announcement>, Self::Error>> + Send + '_;
}
