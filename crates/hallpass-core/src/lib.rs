//! Core types and trait definitions for the HallPass access-control system.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod credential;
pub mod curfew;
pub mod error;
pub mod gate;
pub mod identity;
pub mod log;
pub mod notice;
pub mod request;
pub mod store;
pub mod ticket;

pub use error::{Error, Result};
