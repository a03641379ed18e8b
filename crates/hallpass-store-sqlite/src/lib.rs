//! SQLite backend for the HallPass directory store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Live query subscriptions are
//! driven by a per-store change bus: every committed write broadcasts the
//! touched collection, and one background task per subscription re-runs its
//! query and publishes the fresh result set.

mod encode;
mod notify;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
