//! [`SqliteStore`] — the SQLite implementation of [`DirectoryStore`].

use std::{future::Future, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;

use hallpass_core::{
  identity::{Account, Identity, NewAccount, NewIdentity},
  log::{AccessLogEntry, NewLogEntry},
  notice::{Announcement, NewAnnouncement},
  request::{LateEntryRequest, NewRequest, RequestStatus},
  store::{self, DirectoryStore, RequestFilter, Subscription},
  ticket::{NewTicket, Ticket, TicketStatus},
};

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawAnnouncement, RawIdentity, RawLog, RawRequest, RawTicket,
    encode_dt, encode_role, encode_uuid,
  },
  notify::{ChangeBus, Collection},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A HallPass directory store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and all
/// clones share one change bus, so a write through any clone refreshes every
/// live subscription.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  bus:  ChangeBus,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, bus: ChangeBus::new() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, bus: ChangeBus::new() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Spawn the feed task behind a live subscription: on every change to
  /// `trigger`, re-run `query` and publish the full fresh snapshot. The
  /// task exits when the subscriber drops.
  ///
  /// The bus receiver is created before the initial query runs, so a write
  /// committed while that query is in flight is not lost; it surfaces as
  /// one redundant refresh instead.
  async fn spawn_feed<T, Q, F>(
    &self,
    trigger: Collection,
    query: Q,
  ) -> Result<Subscription<T>>
  where
    T: Clone + Send + Sync + 'static,
    Q: Fn(SqliteStore) -> F + Send + 'static,
    F: Future<Output = Result<Vec<T>>> + Send + 'static,
  {
    let mut changes = self.bus.watch();
    let initial = query(self.clone()).await?;
    let (publisher, subscription) = store::subscription(initial);
    let feed_store = self.clone();

    tokio::spawn(async move {
      loop {
        tokio::select! {
          () = publisher.closed() => break,
          changed = changes.recv() => {
            let refresh = match changed {
              Ok(collection) => collection == trigger,
              // Missed notifications — refresh unconditionally.
              Err(broadcast::error::RecvError::Lagged(_)) => true,
              Err(broadcast::error::RecvError::Closed) => break,
            };
            if refresh {
              // A failed refresh keeps the previous snapshot; the next
              // change retries.
              if let Ok(snapshot) = query(feed_store.clone()).await {
                publisher.publish(snapshot);
              }
            }
          }
        }
      }
    });

    Ok(subscription)
  }
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  // ── Identities and accounts ───────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity> {
    let identity = Identity {
      identity_id: Uuid::new_v4(),
      name:        input.name,
      role:        input.role,
      created_at:  Utc::now(),
    };

    let id_str   = encode_uuid(identity.identity_id);
    let name     = identity.name.clone();
    let role_str = encode_role(&identity.role)?;
    let at_str   = encode_dt(identity.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (identity_id, name, role_json, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(identity)
  }

  async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT identity_id, name, role_json, created_at
             FROM identities WHERE identity_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawIdentity {
                identity_id: row.get(0)?,
                name:        row.get(1)?,
                role_json:   row.get(2)?,
                created_at:  row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    if self.account_for_email(&input.email).await?.is_some() {
      return Err(Error::EmailTaken(input.email));
    }

    let account = Account {
      email:         input.email,
      password_hash: input.password_hash,
      identity_id:   input.identity_id,
      created_at:    Utc::now(),
    };

    let email  = account.email.clone();
    let hash   = account.password_hash.clone();
    let id_str = encode_uuid(account.identity_id);
    let at_str = encode_dt(account.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (email, password_hash, identity_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![email, hash, id_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(account)
  }

  async fn account_for_email(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT email, password_hash, identity_id, created_at
             FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok(RawAccount {
                email:         row.get(0)?,
                password_hash: row.get(1)?,
                identity_id:   row.get(2)?,
                created_at:    row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  // ── Late-entry requests ───────────────────────────────────────────────────

  async fn create_request(&self, input: NewRequest) -> Result<LateEntryRequest> {
    let request = LateEntryRequest {
      request_id: Uuid::new_v4(),
      requester:  input.requester,
      name:       input.name,
      reg_no:     input.reg_no,
      hostel:     input.hostel,
      reason:     input.reason,
      status:     RequestStatus::Pending,
      created_at: Utc::now(),
    };

    let id_str        = encode_uuid(request.request_id);
    let requester_str = encode_uuid(request.requester);
    let name          = request.name.clone();
    let reg_no        = request.reg_no.clone();
    let hostel        = request.hostel.clone();
    let reason        = request.reason.clone();
    let status_str    = request.status.to_string();
    let at_str        = encode_dt(request.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO requests (
             request_id, requester, name, reg_no, hostel, reason, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, requester_str, name, reg_no, hostel, reason, status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.bus.notify(Collection::Requests);
    Ok(request)
  }

  async fn get_request(&self, id: Uuid) -> Result<Option<LateEntryRequest>> {
    let requests = self
      .list_requests(RequestFilter::default())
      .await?
      .into_iter()
      .find(|r| r.request_id == id);
    Ok(requests)
  }

  async fn active_request_for(
    &self,
    requester: Uuid,
  ) -> Result<Option<LateEntryRequest>> {
    let mut matches = self
      .list_requests(RequestFilter {
        requester: Some(requester),
        statuses:  vec![RequestStatus::Pending, RequestStatus::Approved],
        limit:     Some(1),
      })
      .await?;
    Ok(matches.pop())
  }

  async fn approved_request_for(
    &self,
    requester: Uuid,
  ) -> Result<Option<LateEntryRequest>> {
    let mut matches = self
      .list_requests(RequestFilter {
        requester: Some(requester),
        statuses:  vec![RequestStatus::Approved],
        limit:     Some(1),
      })
      .await?;
    Ok(matches.pop())
  }

  async fn set_request_status(
    &self,
    id: Uuid,
    status: RequestStatus,
  ) -> Result<LateEntryRequest> {
    let mut request = self
      .get_request(id)
      .await?
      .ok_or(Error::RequestNotFound(id))?;

    request.status.validate_transition(status)
      .map_err(Error::Domain)?;

    let id_str     = encode_uuid(id);
    let status_str = status.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE requests SET status = ?2 WHERE request_id = ?1",
          rusqlite::params![id_str, status_str],
        )?;
        Ok(())
      })
      .await?;

    request.status = status;
    self.bus.notify(Collection::Requests);
    Ok(request)
  }

  async fn list_requests(
    &self,
    filter: RequestFilter,
  ) -> Result<Vec<LateEntryRequest>> {
    let requester_str = filter.requester.map(encode_uuid);
    // Status text comes from the enum's Display form, never from callers.
    let status_list = (!filter.statuses.is_empty()).then(|| {
      filter
        .statuses
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(",")
    });
    let limit_val = filter.limit.map(|l| l as i64).unwrap_or(-1);

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<String> = vec![];
        if requester_str.is_some() {
          conds.push("requester = ?1".to_owned());
        }
        if let Some(list) = &status_list {
          conds.push(format!("status IN ({list})"));
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT request_id, requester, name, reg_no, hostel, reason, status, created_at
           FROM requests
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?2"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![requester_str.as_deref(), limit_val],
            |row| {
              Ok(RawRequest {
                request_id: row.get(0)?,
                requester:  row.get(1)?,
                name:       row.get(2)?,
                reg_no:     row.get(3)?,
                hostel:     row.get(4)?,
                reason:     row.get(5)?,
                status:     row.get(6)?,
                created_at: row.get(7)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  // ── Access log ────────────────────────────────────────────────────────────

  async fn append_log(&self, input: NewLogEntry) -> Result<AccessLogEntry> {
    let entry = AccessLogEntry {
      log_id:      Uuid::new_v4(),
      subject:     input.subject,
      name:        input.name,
      reg_no:      input.reg_no,
      direction:   input.direction,
      recorded_at: Utc::now(),
      curfew:      input.curfew,
      approved:    input.approved,
      guard:       input.guard,
    };

    let id_str        = encode_uuid(entry.log_id);
    let subject_str   = encode_uuid(entry.subject);
    let name          = entry.name.clone();
    let reg_no        = entry.reg_no.clone();
    let direction_str = entry.direction.to_string();
    let at_str        = encode_dt(entry.recorded_at);
    let curfew        = entry.curfew;
    let approved      = entry.approved;
    let guard_str     = encode_uuid(entry.guard);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO logs (
             log_id, subject, name, reg_no, direction, recorded_at,
             curfew, approved, guard
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, subject_str, name, reg_no, direction_str, at_str,
            curfew, approved, guard_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.bus.notify(Collection::Logs);
    Ok(entry)
  }

  async fn recent_logs(&self, limit: usize) -> Result<Vec<AccessLogEntry>> {
    let limit_val = limit as i64;

    let raws: Vec<RawLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT log_id, subject, name, reg_no, direction, recorded_at,
                  curfew, approved, guard
           FROM logs
           ORDER BY recorded_at DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| {
            Ok(RawLog {
              log_id:      row.get(0)?,
              subject:     row.get(1)?,
              name:        row.get(2)?,
              reg_no:      row.get(3)?,
              direction:   row.get(4)?,
              recorded_at: row.get(5)?,
              curfew:      row.get(6)?,
              approved:    row.get(7)?,
              guard:       row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLog::into_log).collect()
  }

  async fn last_log_for_reg_no(
    &self,
    reg_no: &str,
  ) -> Result<Option<AccessLogEntry>> {
    let reg_no = reg_no.to_owned();

    let raw: Option<RawLog> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT log_id, subject, name, reg_no, direction, recorded_at,
                    curfew, approved, guard
             FROM logs
             WHERE reg_no = ?1
             ORDER BY recorded_at DESC
             LIMIT 1",
            rusqlite::params![reg_no],
            |row| {
              Ok(RawLog {
                log_id:      row.get(0)?,
                subject:     row.get(1)?,
                name:        row.get(2)?,
                reg_no:      row.get(3)?,
                direction:   row.get(4)?,
                recorded_at: row.get(5)?,
                curfew:      row.get(6)?,
                approved:    row.get(7)?,
                guard:       row.get(8)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLog::into_log).transpose()
  }

  // ── Tickets ───────────────────────────────────────────────────────────────

  async fn create_ticket(&self, input: NewTicket) -> Result<Ticket> {
    let ticket = Ticket {
      ticket_id:   Uuid::new_v4(),
      requester:   input.requester,
      name:        input.name,
      room:        input.room,
      title:       input.title,
      description: input.description,
      status:      TicketStatus::Open,
      created_at:  Utc::now(),
    };

    let id_str        = encode_uuid(ticket.ticket_id);
    let requester_str = encode_uuid(ticket.requester);
    let name          = ticket.name.clone();
    let room          = ticket.room.clone();
    let title         = ticket.title.clone();
    let description   = ticket.description.clone();
    let status_str    = ticket.status.to_string();
    let at_str        = encode_dt(ticket.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tickets (
             ticket_id, requester, name, room, title, description, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, requester_str, name, room, title, description, status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.bus.notify(Collection::Tickets);
    Ok(ticket)
  }

  async fn set_ticket_status(
    &self,
    id: Uuid,
    status: TicketStatus,
  ) -> Result<Ticket> {
    let mut ticket = self
      .list_tickets()
      .await?
      .into_iter()
      .find(|t| t.ticket_id == id)
      .ok_or(Error::TicketNotFound(id))?;

    ticket.status.validate_transition(status)
      .map_err(Error::Domain)?;

    let id_str     = encode_uuid(id);
    let status_str = status.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE tickets SET status = ?2 WHERE ticket_id = ?1",
          rusqlite::params![id_str, status_str],
        )?;
        Ok(())
      })
      .await?;

    ticket.status = status;
    self.bus.notify(Collection::Tickets);
    Ok(ticket)
  }

  async fn tickets_for(&self, requester: Uuid) -> Result<Vec<Ticket>> {
    let requester_str = encode_uuid(requester);

    let raws: Vec<RawTicket> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT ticket_id, requester, name, room, title, description, status, created_at
           FROM tickets
           WHERE requester = ?1
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![requester_str], ticket_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicket::into_ticket).collect()
  }

  async fn list_tickets(&self) -> Result<Vec<Ticket>> {
    let raws: Vec<RawTicket> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT ticket_id, requester, name, room, title, description, status, created_at
           FROM tickets
           ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map([], ticket_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicket::into_ticket).collect()
  }

  // ── Announcements ─────────────────────────────────────────────────────────

  async fn post_announcement(
    &self,
    input: NewAnnouncement,
  ) -> Result<Announcement> {
    let announcement = Announcement {
      message:   input.message,
      audience:  input.audience,
      posted_at: Utc::now(),
    };

    let message      = announcement.message.clone();
    let audience_str = announcement.audience.as_str().to_owned();
    let at_str       = encode_dt(announcement.posted_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO announcements (message, audience, posted_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![message, audience_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    self.bus.notify(Collection::Announcements);
    Ok(announcement)
  }

  async fn announcements(&self) -> Result<Vec<Announcement>> {
    let raws: Vec<RawAnnouncement> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT message, audience, posted_at
           FROM announcements
           ORDER BY posted_at DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawAnnouncement {
              message:   row.get(0)?,
              audience:  row.get(1)?,
              posted_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawAnnouncement::into_announcement)
      .collect()
  }

  // ── Live queries ──────────────────────────────────────────────────────────

  async fn watch_requests(
    &self,
    filter: RequestFilter,
  ) -> Result<Subscription<LateEntryRequest>> {
    self
      .spawn_feed(Collection::Requests, move |store| {
        let filter = filter.clone();
        async move { store.list_requests(filter).await }
      })
      .await
  }

  async fn watch_recent_logs(
    &self,
    limit: usize,
  ) -> Result<Subscription<AccessLogEntry>> {
    self
      .spawn_feed(Collection::Logs, move |store| async move {
        store.recent_logs(limit).await
      })
      .await
  }

  async fn watch_tickets(
    &self,
    requester: Option<Uuid>,
  ) -> Result<Subscription<Ticket>> {
    self
      .spawn_feed(Collection::Tickets, move |store| async move {
        match requester {
          Some(id) => store.tickets_for(id).await,
          None => store.list_tickets().await,
        }
      })
      .await
  }

  async fn watch_announcements(&self) -> Result<Subscription<Announcement>> {
    self
      .spawn_feed(Collection::Announcements, |store| async move {
        store.announcements().await
      })
      .await
  }
}

/// Row mapper shared by the ticket queries.
fn ticket_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTicket> {
  Ok(RawTicket {
    ticket_id:   row.get(0)?,
    requester:   row.get(1)?,
    name:        row.get(2)?,
    room:        row.get(3)?,
    title:       row.get(4)?,
    description: row.get(5)?,
    status:      row.get(6)?,
    created_at:  row.get(7)?,
  })
}
