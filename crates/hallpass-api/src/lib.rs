//! JSON REST API for HallPass.
//!
//! Exposes an axum [`Router`] backed by any
//! [`hallpass_core::store::DirectoryStore`]. Accounts authenticate with HTTP
//! Basic (email/password against an argon2 hash); sign-out is a client
//! concern under Basic auth. TLS and transport are the caller's
//! responsibility.

pub mod accounts;
pub mod announcements;
pub mod auth;
pub mod error;
pub mod logs;
pub mod me;
pub mod requests;
pub mod scan;
pub mod stats;
pub mod tickets;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  routing::{get, post},
};
use hallpass_core::{curfew::CurfewWindow, store::DirectoryStore};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `hallpass.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Curfew window override; omitted fields fall back to 22:00–04:00.
  #[serde(default = "default_curfew_start")]
  pub curfew_start_hour: u32,
  #[serde(default = "default_curfew_end")]
  pub curfew_end_hour:   u32,
}

fn default_curfew_start() -> u32 { CurfewWindow::default().start_hour }

fn default_curfew_end() -> u32 { CurfewWindow::default().end_hour }

impl ServerConfig {
  pub fn curfew(&self) -> CurfewWindow {
    CurfewWindow {
      start_hour: self.curfew_start_hour,
      end_hour:   self.curfew_end_hour,
    }
  }

  /// The configured store path, with a leading `~/` resolved against
  /// `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    expand_home(
      &self.store_path,
      std::env::var_os("HOME").map(PathBuf::from),
    )
  }
}

fn expand_home(path: &Path, home: Option<PathBuf>) -> PathBuf {
  match (path.to_str().and_then(|p| p.strip_prefix("~/")), home) {
    (Some(rest), Some(home)) => home.join(rest),
    _ => path.to_path_buf(),
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: DirectoryStore> {
  pub store:  Arc<S>,
  pub curfew: CurfewWindow,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DirectoryStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Registration (unauthenticated)
    .route("/auth/register", post(accounts::register::<S>))
    // Caller's own records
    .route("/me", get(me::me::<S>))
    .route("/me/credential", get(me::credential::<S>))
    .route("/curfew", get(me::curfew::<S>))
    // Late-entry requests
    .route(
      "/requests",
      get(requests::list::<S>).post(requests::create::<S>),
    )
    .route("/requests/active", get(requests::active::<S>))
    .route("/requests/{id}/approve", post(requests::approve::<S>))
    .route("/requests/{id}/reject", post(requests::reject::<S>))
    // Gate scans
    .route("/scan", post(scan::scan::<S>))
    .route("/scan/log", post(scan::log::<S>))
    // Access log
    .route("/logs", get(logs::list::<S>))
    .route("/logs/last", get(logs::last::<S>))
    // Tickets
    .route(
      "/tickets",
      get(tickets::mine::<S>).post(tickets::create::<S>),
    )
    .route("/tickets/all", get(tickets::list_all::<S>))
    .route("/tickets/{id}/resolve", post(tickets::resolve::<S>))
    // Announcements
    .route(
      "/announcements",
      get(announcements::list::<S>).post(announcements::post::<S>),
    )
    // Dashboard counters
    .route("/stats", get(stats::stats::<S>))
    .with_state(state)
}
