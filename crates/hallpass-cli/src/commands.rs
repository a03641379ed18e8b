//! One function per non-interactive subcommand.

use anyhow::{Context, Result, bail};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use chrono::Local;
use clap::{Args, ValueEnum};
use rand_core::OsRng;
use uuid::Uuid;

use hallpass_core::{
  credential::CredentialPayload,
  curfew::CurfewWindow,
  identity::{Identity, NewAccount, NewIdentity, Role},
  log::AccessLogEntry,
  notice::{Audience, NewAnnouncement},
  request::{LateEntryRequest, NewRequest, RequestStatus},
  store::{DirectoryStore, RequestFilter},
  ticket::TicketStatus,
};
use hallpass_store_sqlite::SqliteStore;

// ─── register ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
  Student,
  Guard,
  Admin,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
  #[arg(long)]
  pub name: String,

  #[arg(long, value_enum)]
  pub role: RoleArg,

  /// Registration number (students).
  #[arg(long)]
  pub reg_no: Option<String>,

  /// Hostel block code (students).
  #[arg(long)]
  pub hostel: Option<String>,

  /// Room number (students).
  #[arg(long)]
  pub room: Option<String>,

  /// Duty post (guards).
  #[arg(long)]
  pub post: Option<String>,

  /// Designation (wardens).
  #[arg(long)]
  pub designation: Option<String>,

  /// Also create a server login bound to this identity.
  #[arg(long, requires = "password")]
  pub email: Option<String>,

  #[arg(long, requires = "email")]
  pub password: Option<String>,
}

impl RegisterArgs {
  fn into_role(self) -> Result<(String, Role, Option<(String, String)>)> {
    let role = match self.role {
      RoleArg::Student => Role::Student {
        reg_no: self.reg_no.context("--reg-no is required for students")?,
        hostel: self.hostel.context("--hostel is required for students")?,
        room:   self.room.context("--room is required for students")?,
      },
      RoleArg::Guard => Role::Guard {
        post: self.post.context("--post is required for guards")?,
      },
      RoleArg::Admin => Role::Admin {
        designation: self
          .designation
          .context("--designation is required for wardens")?,
      },
    };
    let login = self.email.zip(self.password);
    Ok((self.name, role, login))
  }
}

pub async fn register(store: &SqliteStore, args: RegisterArgs) -> Result<()> {
  let (name, role, login) = args.into_role()?;

  let identity = store
    .create_identity(NewIdentity { name, role })
    .await
    .context("creating identity")?;
  println!("registered {} as {}", identity.name, identity.identity_id);

  if let Some((email, password)) = login {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    store
      .create_account(NewAccount {
        email: email.clone(),
        password_hash,
        identity_id: identity.identity_id,
      })
      .await
      .context("creating account")?;
    println!("account created for {email}");
  }

  Ok(())
}

// ─── credential ──────────────────────────────────────────────────────────────

pub async fn credential(
  store: &SqliteStore,
  email: &str,
  curfew: CurfewWindow,
) -> Result<()> {
  let who = identity_for_email(store, email).await?;
  let payload = CredentialPayload::for_identity(&who)?;

  if curfew.contains(&Local::now().time()) {
    println!(
      "curfew is active ({:02}:00-{:02}:00); late entry needs an approved request",
      curfew.start_hour, curfew.end_hour
    );
  }
  println!("{}", payload.encode()?);
  Ok(())
}

// ─── request ─────────────────────────────────────────────────────────────────

pub async fn request(
  store: &SqliteStore,
  email: &str,
  reason: &str,
) -> Result<()> {
  let who = identity_for_email(store, email).await?;
  let Role::Student { reg_no, hostel, .. } = &who.role else {
    bail!("{email} is not a student");
  };

  if let Some(existing) = store.active_request_for(who.identity_id).await? {
    bail!(
      "request {} is still {}; wait for the warden",
      existing.request_id,
      existing.status
    );
  }

  let input = NewRequest::new(who.identity_id, &who.name, reg_no, hostel, reason)?;
  let created = store.create_request(input).await?;
  println!("filed request {} ({})", created.request_id, created.status);
  Ok(())
}

pub async fn requests(store: &SqliteStore, watch: bool) -> Result<()> {
  let filter = RequestFilter {
    statuses: vec![RequestStatus::Pending],
    ..Default::default()
  };

  if !watch {
    for request in store.list_requests(filter).await? {
      print_request(&request);
    }
    return Ok(());
  }

  let mut sub = store.watch_requests(filter).await?;
  print_request_queue(&sub.snapshot());
  while let Some(snapshot) = sub.next_snapshot().await {
    print_request_queue(&snapshot);
  }
  Ok(())
}

fn print_request_queue(requests: &[LateEntryRequest]) {
  println!("-- {} pending --", requests.len());
  for request in requests {
    print_request(request);
  }
}

fn print_request(request: &LateEntryRequest) {
  println!(
    "{}  {}  {} ({}, hostel {}): {}",
    request.request_id,
    request.status,
    request.name,
    request.reg_no,
    request.hostel,
    request.reason
  );
}

// ─── approve / reject / resolve ──────────────────────────────────────────────

pub async fn approve(
  store: &SqliteStore,
  email: &str,
  request_id: Uuid,
) -> Result<()> {
  admin_for_email(store, email).await?;
  let updated = store
    .set_request_status(request_id, RequestStatus::Approved)
    .await?;
  println!("request {} is now {}", updated.request_id, updated.status);
  Ok(())
}

pub async fn reject(
  store: &SqliteStore,
  email: &str,
  request_id: Uuid,
) -> Result<()> {
  admin_for_email(store, email).await?;
  let updated = store
    .set_request_status(request_id, RequestStatus::Rejected)
    .await?;
  println!("request {} is now {}", updated.request_id, updated.status);
  Ok(())
}

pub async fn resolve(
  store: &SqliteStore,
  email: &str,
  ticket_id: Uuid,
) -> Result<()> {
  admin_for_email(store, email).await?;
  let updated = store
    .set_ticket_status(ticket_id, TicketStatus::Resolved)
    .await?;
  println!("ticket {} is now {}", updated.ticket_id, updated.status);
  Ok(())
}

// ─── post ────────────────────────────────────────────────────────────────────

pub async fn post(
  store: &SqliteStore,
  email: &str,
  message: &str,
  target: Option<String>,
) -> Result<()> {
  admin_for_email(store, email).await?;
  let audience = match target {
    Some(code) => Audience::from_str_form(&code),
    None => Audience::All,
  };
  let posted = store
    .post_announcement(NewAnnouncement::new(message, audience)?)
    .await?;
  println!("posted to {}", posted.audience.as_str());
  Ok(())
}

// ─── logs / lookup ───────────────────────────────────────────────────────────

pub async fn logs(
  store: &SqliteStore,
  email: &str,
  limit: usize,
  watch: bool,
) -> Result<()> {
  admin_for_email(store, email).await?;
  if !watch {
    for entry in store.recent_logs(limit).await? {
      print_log(&entry);
    }
    return Ok(());
  }

  let mut sub = store.watch_recent_logs(limit).await?;
  for entry in sub.snapshot() {
    print_log(&entry);
  }
  while let Some(snapshot) = sub.next_snapshot().await {
    // Full snapshot replacement; the newest entry is first.
    if let Some(entry) = snapshot.first() {
      print_log(entry);
    }
  }
  Ok(())
}

fn print_log(entry: &AccessLogEntry) {
  let mut flags = String::new();
  if entry.curfew {
    flags.push_str("  [curfew]");
  }
  if entry.approved {
    flags.push_str("  [approved]");
  }
  println!(
    "{}  {:5}  {} ({}){}",
    entry.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
    entry.direction.to_string(),
    entry.name,
    entry.reg_no,
    flags
  );
}

pub async fn lookup(
  store: &SqliteStore,
  email: &str,
  reg_no: &str,
) -> Result<()> {
  admin_for_email(store, email).await?;
  match store.last_log_for_reg_no(reg_no).await? {
    Some(entry) => {
      let verdict = if entry.direction.leaves_inside() {
        "inside"
      } else {
        "outside"
      };
      println!(
        "{} ({}) is {} (last {} at {})",
        entry.name,
        entry.reg_no,
        verdict,
        entry.direction,
        entry.recorded_at.with_timezone(&Local).format("%H:%M:%S %Y-%m-%d")
      );
    }
    None => println!("no movements recorded for {reg_no}"),
  }
  Ok(())
}

// ─── shared ──────────────────────────────────────────────────────────────────

pub async fn identity_for_email(
  store: &SqliteStore,
  email: &str,
) -> Result<Identity> {
  let account = store
    .account_for_email(email)
    .await?
    .with_context(|| format!("no account for {email}"))?;
  store
    .get_identity(account.identity_id)
    .await?
    .with_context(|| format!("account {email} points at a missing identity"))
}

/// Resolve `email` and insist it belongs to a warden. Mutating warden
/// subcommands call this before touching the store.
async fn admin_for_email(store: &SqliteStore, email: &str) -> Result<Identity> {
  let who = identity_for_email(store, email).await?;
  if !who.role.is_admin() {
    bail!("{email} is not a warden");
  }
  Ok(who)
}
