use hallpass_core::{
  credential::CredentialPayload,
  curfew::CurfewWindow,
  gate::GateSession,
  identity::{Identity, NewAccount, NewIdentity, Role},
  log::{Direction, NewLogEntry},
  notice::{Audience, NewAnnouncement},
  request::{NewRequest, RequestStatus},
  store::{DirectoryStore, RequestFilter},
  ticket::{NewTicket, TicketStatus},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn student(store: &SqliteStore, name: &str, reg_no: &str) -> Identity {
  store
    .create_identity(NewIdentity {
      name: name.to_owned(),
      role: Role::Student {
        reg_no: reg_no.to_owned(),
        hostel: "A".to_owned(),
        room:   "101".to_owned(),
      },
    })
    .await
    .unwrap()
}

async fn guard(store: &SqliteStore) -> Identity {
  store
    .create_identity(NewIdentity {
      name: "Gate Guard".to_owned(),
      role: Role::Guard { post: "Main Gate".to_owned() },
    })
    .await
    .unwrap()
}

fn request_for(who: &Identity, reason: &str) -> NewRequest {
  let Role::Student { reg_no, hostel, .. } = &who.role else {
    panic!("request_for needs a student");
  };
  NewRequest::new(who.identity_id, &who.name, reg_no, hostel, reason).unwrap()
}

// ─── Identities and accounts ─────────────────────────────────────────────────

#[tokio::test]
async fn identity_round_trip() {
  let store = SqliteStore::open_in_memory().await.unwrap();

  let created = student(&store, "Asha Rao", "RA001").await;
  let fetched = store
    .get_identity(created.identity_id)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(fetched, created);
  assert!(fetched.role.is_student());
}

#[tokio::test]
async fn missing_identity_is_none() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  assert!(store.get_identity(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn account_email_is_unique() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let new_account = NewAccount {
    email:         "asha@example.edu".to_owned(),
    password_hash: "$argon2id$stub".to_owned(),
    identity_id:   who.identity_id,
  };
  store.create_account(new_account.clone()).await.unwrap();

  let err = store.create_account(new_account).await.unwrap_err();
  assert!(matches!(err, Error::EmailTaken(email) if email == "asha@example.edu"));

  let found = store
    .account_for_email("asha@example.edu")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.identity_id, who.identity_id);

  assert!(store
    .account_for_email("nobody@example.edu")
    .await
    .unwrap()
    .is_none());
}

// ─── Request lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn request_starts_pending_and_approves() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let request = store
    .create_request(request_for(&who, "medical appointment"))
    .await
    .unwrap();
  assert_eq!(request.status, RequestStatus::Pending);

  let approved = store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();
  assert_eq!(approved.status, RequestStatus::Approved);

  let fetched = store
    .get_request(request.request_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.status, RequestStatus::Approved);
}

#[tokio::test]
async fn invalid_transition_is_rejected_and_not_written() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let request = store
    .create_request(request_for(&who, "family event"))
    .await
    .unwrap();
  store
    .set_request_status(request.request_id, RequestStatus::Rejected)
    .await
    .unwrap();

  let err = store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(hallpass_core::Error::InvalidTransition { .. })
  ));

  let fetched = store
    .get_request(request.request_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.status, RequestStatus::Rejected);
}

#[tokio::test]
async fn reasserting_current_status_is_a_no_op() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let request = store
    .create_request(request_for(&who, "late lab session"))
    .await
    .unwrap();
  store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();
  let again = store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();
  assert_eq!(again.status, RequestStatus::Approved);
}

#[tokio::test]
async fn unknown_request_reports_not_found() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let id = Uuid::new_v4();
  let err = store
    .set_request_status(id, RequestStatus::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RequestNotFound(found) if found == id));
}

#[tokio::test]
async fn active_and_approved_lookups() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  assert!(store
    .active_request_for(who.identity_id)
    .await
    .unwrap()
    .is_none());

  let request = store
    .create_request(request_for(&who, "project deadline"))
    .await
    .unwrap();

  // Pending counts as active but not as approved.
  assert!(store
    .active_request_for(who.identity_id)
    .await
    .unwrap()
    .is_some());
  assert!(store
    .approved_request_for(who.identity_id)
    .await
    .unwrap()
    .is_none());

  store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();
  let approved = store
    .approved_request_for(who.identity_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(approved.request_id, request.request_id);

  // Consuming the approval clears both lookups.
  store
    .set_request_status(request.request_id, RequestStatus::Closed)
    .await
    .unwrap();
  assert!(store
    .active_request_for(who.identity_id)
    .await
    .unwrap()
    .is_none());
  assert!(store
    .approved_request_for(who.identity_id)
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn list_requests_filters_and_orders_newest_first() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let asha = student(&store, "Asha Rao", "RA001").await;
  let ravi = student(&store, "Ravi Kumar", "RA002").await;

  let first = store
    .create_request(request_for(&asha, "first"))
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let second = store
    .create_request(request_for(&ravi, "second"))
    .await
    .unwrap();
  store
    .set_request_status(second.request_id, RequestStatus::Rejected)
    .await
    .unwrap();

  let all = store.list_requests(RequestFilter::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].request_id, second.request_id);
  assert_eq!(all[1].request_id, first.request_id);

  let pending = store
    .list_requests(RequestFilter {
      statuses: vec![RequestStatus::Pending],
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].request_id, first.request_id);

  let ravis = store
    .list_requests(RequestFilter {
      requester: Some(ravi.identity_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(ravis.len(), 1);
  assert_eq!(ravis[0].request_id, second.request_id);
}

// ─── Access log ──────────────────────────────────────────────────────────────

fn log_input(who: &Identity, watcher: Uuid, direction: Direction) -> NewLogEntry {
  let Role::Student { reg_no, .. } = &who.role else {
    panic!("log_input needs a student");
  };
  NewLogEntry {
    subject: who.identity_id,
    name: who.name.clone(),
    reg_no: reg_no.clone(),
    direction,
    curfew: false,
    approved: false,
    guard: watcher,
  }
}

#[tokio::test]
async fn logs_are_returned_newest_first_with_limit() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  store
    .append_log(log_input(&who, watcher.identity_id, Direction::Exit))
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let latest = store
    .append_log(log_input(&who, watcher.identity_id, Direction::Entry))
    .await
    .unwrap();

  let recent = store.recent_logs(1).await.unwrap();
  assert_eq!(recent.len(), 1);
  assert_eq!(recent[0].log_id, latest.log_id);
  assert_eq!(recent[0].direction, Direction::Entry);

  let both = store.recent_logs(10).await.unwrap();
  assert_eq!(both.len(), 2);
}

#[tokio::test]
async fn last_log_answers_inside_or_outside() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  assert!(store.last_log_for_reg_no("RA001").await.unwrap().is_none());

  store
    .append_log(log_input(&who, watcher.identity_id, Direction::Entry))
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  store
    .append_log(log_input(&who, watcher.identity_id, Direction::Exit))
    .await
    .unwrap();

  let last = store
    .last_log_for_reg_no("RA001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(last.direction, Direction::Exit);
  assert!(!last.direction.leaves_inside());
}

// ─── Tickets ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ticket_lifecycle() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let ticket = store
    .create_ticket(
      NewTicket::new(
        who.identity_id,
        &who.name,
        "101",
        "Broken fan",
        "Ceiling fan in 101 stopped working.",
      )
      .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(ticket.status, TicketStatus::Open);

  let resolved = store
    .set_ticket_status(ticket.ticket_id, TicketStatus::Resolved)
    .await
    .unwrap();
  assert_eq!(resolved.status, TicketStatus::Resolved);

  let err = store
    .set_ticket_status(ticket.ticket_id, TicketStatus::Open)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(hallpass_core::Error::InvalidTicketTransition { .. })
  ));

  let mine = store.tickets_for(who.identity_id).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].status, TicketStatus::Resolved);

  assert!(store.tickets_for(Uuid::new_v4()).await.unwrap().is_empty());
  assert_eq!(store.list_tickets().await.unwrap().len(), 1);
}

// ─── Announcements ───────────────────────────────────────────────────────────

#[tokio::test]
async fn announcements_are_newest_first() {
  let store = SqliteStore::open_in_memory().await.unwrap();

  store
    .post_announcement(
      NewAnnouncement::new("Water outage on Sunday.", Audience::All).unwrap(),
    )
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  store
    .post_announcement(
      NewAnnouncement::new(
        "Hostel A common room closed.",
        Audience::Hostel("A".to_owned()),
      )
      .unwrap(),
    )
    .await
    .unwrap();

  let all = store.announcements().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].message, "Hostel A common room closed.");
  assert_eq!(all[0].audience, Audience::Hostel("A".to_owned()));
  assert!(all[0].audience.applies_to("A"));
  assert!(!all[0].audience.applies_to("B"));
  assert!(all[1].audience.applies_to("B"));
}

// ─── Live queries ────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_subscription_tracks_changes() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let mut sub = store
    .watch_requests(RequestFilter {
      statuses: vec![RequestStatus::Pending],
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(sub.snapshot().is_empty());

  let request = store
    .create_request(request_for(&who, "medical appointment"))
    .await
    .unwrap();
  let snapshot = sub.next_snapshot().await.unwrap();
  assert_eq!(snapshot.len(), 1);
  assert_eq!(snapshot[0].request_id, request.request_id);

  // Approval moves it out of the pending view.
  store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();
  let snapshot = sub.next_snapshot().await.unwrap();
  assert!(snapshot.is_empty());
}

#[tokio::test]
async fn log_subscription_replaces_whole_snapshot() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  let mut sub = store.watch_recent_logs(50).await.unwrap();
  assert!(sub.snapshot().is_empty());

  store
    .append_log(log_input(&who, watcher.identity_id, Direction::Entry))
    .await
    .unwrap();
  assert_eq!(sub.next_snapshot().await.unwrap().len(), 1);

  store
    .append_log(log_input(&who, watcher.identity_id, Direction::Exit))
    .await
    .unwrap();
  let snapshot = sub.next_snapshot().await.unwrap();
  assert_eq!(snapshot.len(), 2);
  assert_eq!(snapshot[0].direction, Direction::Exit);
}

#[tokio::test]
async fn subscription_ignores_other_collections() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  let mut sub = store.watch_tickets(None).await.unwrap();

  // A request write must not wake the ticket feed.
  store
    .create_request(request_for(&who, "unrelated"))
    .await
    .unwrap();
  let woke = tokio::time::timeout(
    std::time::Duration::from_millis(100),
    sub.changed(),
  )
  .await;
  assert!(woke.is_err(), "ticket feed woke on a request write");
}

#[tokio::test]
async fn subscription_converges_on_write_racing_its_creation() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;

  // Start the feed and commit a request concurrently, so the write may land
  // while the feed's initial snapshot query is still in flight. It must show
  // up either in that snapshot or in a refresh right after.
  let watcher = store.clone();
  let (sub, created) = tokio::join!(
    watcher.watch_requests(RequestFilter::default()),
    store.create_request(request_for(&who, "racing the feed")),
  );
  let mut sub = sub.unwrap();
  let created = created.unwrap();

  let mut snapshot = sub.snapshot();
  while !snapshot.iter().any(|r| r.request_id == created.request_id) {
    snapshot = tokio::time::timeout(
      std::time::Duration::from_secs(2),
      sub.next_snapshot(),
    )
    .await
    .expect("feed never caught up with a write made during setup")
    .unwrap();
  }
}

#[tokio::test]
async fn dropping_subscription_unsubscribes() {
  let store = SqliteStore::open_in_memory().await.unwrap();

  let sub = store.watch_announcements().await.unwrap();
  drop(sub);

  // The feed task must notice the drop and exit; a later write must not
  // panic or error against the dead feed.
  tokio::task::yield_now().await;
  store
    .post_announcement(
      NewAnnouncement::new("Still fine.", Audience::All).unwrap(),
    )
    .await
    .unwrap();
}

// ─── Gate handshake against a real store ─────────────────────────────────────

fn curfew_time() -> chrono::NaiveTime {
  chrono::NaiveTime::from_hms_opt(23, 30, 0).unwrap()
}

fn day_time() -> chrono::NaiveTime {
  chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap()
}

async fn scan_credential(
  session: &mut GateSession<SqliteStore>,
  who: &Identity,
) {
  let raw = CredentialPayload::for_identity(who).unwrap().encode().unwrap();
  let epoch = session.arm();
  session.scan(epoch, &raw).await.unwrap();
}

#[tokio::test]
async fn daytime_movement_logs_without_approval() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  let mut session = GateSession::new(
    store.clone(),
    watcher.identity_id,
    CurfewWindow::default(),
  );
  scan_credential(&mut session, &who).await;

  let entry = session.log_at(Direction::Exit, day_time()).await.unwrap();
  assert!(!entry.curfew);
  assert!(!entry.approved);
  assert_eq!(entry.guard, watcher.identity_id);
  assert_eq!(store.recent_logs(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn curfew_entry_without_approval_is_blocked_and_unwritten() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  let mut session = GateSession::new(
    store.clone(),
    watcher.identity_id,
    CurfewWindow::default(),
  );
  scan_credential(&mut session, &who).await;

  let err = session
    .log_at(Direction::Entry, curfew_time())
    .await
    .unwrap_err();
  assert!(matches!(err, hallpass_core::Error::ActionBlocked { .. }));

  // Nothing was written, and the bearer stays on screen for the guard.
  assert!(store.recent_logs(10).await.unwrap().is_empty());
  assert!(session.resolved().is_some());
}

#[tokio::test]
async fn curfew_entry_with_approval_logs_and_consumes_it() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  let request = store
    .create_request(request_for(&who, "train arrives at midnight"))
    .await
    .unwrap();
  store
    .set_request_status(request.request_id, RequestStatus::Approved)
    .await
    .unwrap();

  let mut session = GateSession::new(
    store.clone(),
    watcher.identity_id,
    CurfewWindow::default(),
  );
  scan_credential(&mut session, &who).await;

  let entry = session
    .log_at(Direction::Entry, curfew_time())
    .await
    .unwrap();
  assert!(entry.curfew);
  assert!(entry.approved);

  // The approval is single-use: closed, so a second curfew entry is blocked.
  let closed = store.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(closed.status, RequestStatus::Closed);

  scan_credential(&mut session, &who).await;
  let err = session
    .log_at(Direction::Entry, curfew_time())
    .await
    .unwrap_err();
  assert!(matches!(err, hallpass_core::Error::ActionBlocked { .. }));
}

#[tokio::test]
async fn malformed_scan_writes_nothing() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let watcher = guard(&store).await;

  let mut session = GateSession::new(
    store.clone(),
    watcher.identity_id,
    CurfewWindow::default(),
  );
  let epoch = session.arm();

  let err = session.scan(epoch, "not a credential").await.unwrap_err();
  assert!(matches!(err, hallpass_core::Error::MalformedCredential(_)));
  assert!(store.recent_logs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_camera_read_is_ignored() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let who = student(&store, "Asha Rao", "RA001").await;
  let watcher = guard(&store).await;

  let raw = CredentialPayload::for_identity(&who).unwrap().encode().unwrap();
  let mut session = GateSession::new(
    store.clone(),
    watcher.identity_id,
    CurfewWindow::default(),
  );

  let epoch = session.arm();
  session.scan(epoch, &raw).await.unwrap();
  let err = session.scan(epoch, &raw).await.unwrap_err();
  assert!(matches!(err, hallpass_core::Error::ScannerDisarmed));

  // The first read still logs exactly once.
  session.log_at(Direction::Entry, day_time()).await.unwrap();
  assert_eq!(store.recent_logs(10).await.unwrap().len(), 1);
}
