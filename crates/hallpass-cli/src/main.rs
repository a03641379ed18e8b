//! `hallpass` — terminal client for the HallPass directory store.
//!
//! Works directly against the SQLite store file, so it is useful both as the
//! gate console on a machine that hosts the store and as a warden/admin tool.
//!
//! # Usage
//!
//! ```
//! hallpass --store hallpass.db register --name "Asha Rao" --role student \
//!     --reg-no RA001 --hostel A --room 101
//! hallpass credential --email asha@example.edu
//! hallpass gate --email guard@example.edu
//! hallpass approve --email warden@example.edu <request-id>
//! ```
//!
//! Warden subcommands name the acting warden with `--email` and refuse
//! non-warden accounts. Whoever can open the store file can edit it anyway,
//! so this is a misuse guard, not a security boundary.

mod commands;
mod gate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hallpass_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hallpass", about = "Terminal client for HallPass")]
struct Args {
  /// Path to a TOML config file (store path, curfew hours).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Path to the SQLite store file (default: hallpass.db).
  #[arg(long, env = "HALLPASS_STORE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register an identity (and optionally an email account for the server).
  Register(commands::RegisterArgs),
  /// Print a student's encoded credential payload and curfew status.
  Credential {
    #[arg(long)]
    email: String,
  },
  /// File a late-entry request for a student.
  Request {
    #[arg(long)]
    email:  String,
    #[arg(long)]
    reason: String,
  },
  /// Follow the pending-request queue live.
  Requests {
    #[arg(long)]
    watch: bool,
  },
  /// Run the interactive gate console for a guard.
  Gate {
    #[arg(long)]
    email: String,
  },
  /// Approve a pending late-entry request (wardens only).
  Approve {
    /// Warden account acting on the request.
    #[arg(long)]
    email:      String,
    request_id: uuid::Uuid,
  },
  /// Reject a pending late-entry request (wardens only).
  Reject {
    /// Warden account acting on the request.
    #[arg(long)]
    email:      String,
    request_id: uuid::Uuid,
  },
  /// Resolve an open maintenance ticket (wardens only).
  Resolve {
    /// Warden account acting on the ticket.
    #[arg(long)]
    email:     String,
    ticket_id: uuid::Uuid,
  },
  /// Post an announcement (wardens only).
  Post {
    /// Warden account posting the announcement.
    #[arg(long)]
    email:   String,
    #[arg(long)]
    message: String,
    /// Hostel code; omitted means everyone.
    #[arg(long)]
    target:  Option<String>,
  },
  /// Show recent gate movements (wardens only).
  Logs {
    /// Warden account reviewing the log.
    #[arg(long)]
    email: String,
    #[arg(long, default_value_t = 50)]
    limit: usize,
    #[arg(long)]
    watch: bool,
  },
  /// Look up whether a student is currently inside (wardens only).
  Lookup {
    /// Warden account performing the lookup.
    #[arg(long)]
    email:  String,
    #[arg(long)]
    reg_no: String,
  },
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  store_path: Option<PathBuf>,
  #[serde(default)]
  curfew_start_hour: Option<u32>,
  #[serde(default)]
  curfew_end_hour: Option<u32>,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let store_path = args
    .store
    .or(file_cfg.store_path)
    .unwrap_or_else(|| PathBuf::from("hallpass.db"));

  let mut curfew = hallpass_core::curfew::CurfewWindow::default();
  if let Some(start) = file_cfg.curfew_start_hour {
    curfew.start_hour = start;
  }
  if let Some(end) = file_cfg.curfew_end_hour {
    curfew.end_hour = end;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store at {}", store_path.display()))?;

  match args.command {
    Command::Register(register) => commands::register(&store, register).await,
    Command::Credential { email } => {
      commands::credential(&store, &email, curfew).await
    }
    Command::Request { email, reason } => {
      commands::request(&store, &email, &reason).await
    }
    Command::Requests { watch } => commands::requests(&store, watch).await,
    Command::Gate { email } => gate::run(&store, &email, curfew).await,
    Command::Approve { email, request_id } => {
      commands::approve(&store, &email, request_id).await
    }
    Command::Reject { email, request_id } => {
      commands::reject(&store, &email, request_id).await
    }
    Command::Resolve { email, ticket_id } => {
      commands::resolve(&store, &email, ticket_id).await
    }
    Command::Post { email, message, target } => {
      commands::post(&store, &email, &message, target).await
    }
    Command::Logs { email, limit, watch } => {
      commands::logs(&store, &email, limit, watch).await
    }
    Command::Lookup { email, reg_no } => {
      commands::lookup(&store, &email, &reg_no).await
    }
  }
}
