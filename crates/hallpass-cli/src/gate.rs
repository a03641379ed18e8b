//! The interactive gate console.
//!
//! USB QR scanners present as keyboards, so a scan arrives as a line on
//! stdin. The console accepts a small command vocabulary and treats any
//! other input while armed as a scanned payload:
//!
//! ```text
//! arm      open the scanner for exactly one scan
//! cancel   close the scanner / clear the current bearer
//! entry    record the bearer entering
//! exit     record the bearer leaving
//! quit     leave the console
//! ```

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

use hallpass_core::{
  Error,
  curfew::CurfewWindow,
  gate::{GateSession, ScanEpoch},
  log::Direction,
};
use hallpass_store_sqlite::SqliteStore;

use crate::commands::identity_for_email;

pub async fn run(
  store: &SqliteStore,
  email: &str,
  curfew: CurfewWindow,
) -> Result<()> {
  let who = identity_for_email(store, email).await?;
  if !who.role.is_guard() {
    bail!("{email} is not a guard");
  }

  println!("gate console for {}; type `arm` to scan, `quit` to leave", who.name);

  let mut session = GateSession::new(store.clone(), who.identity_id, curfew);
  let mut epoch: Option<ScanEpoch> = None;

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await.context("reading stdin")? {
    let input = line.trim();
    if input.is_empty() {
      continue;
    }

    match input {
      "quit" | "q" => break,
      "arm" => {
        epoch = Some(session.arm());
        println!("scanner armed");
      }
      "cancel" => {
        session.cancel();
        epoch = None;
        println!("scanner closed");
      }
      "entry" => record(&mut session, Direction::Entry).await,
      "exit" => record(&mut session, Direction::Exit).await,
      raw => scan(&mut session, &mut epoch, raw).await,
    }
  }

  Ok(())
}

async fn scan(
  session: &mut GateSession<SqliteStore>,
  epoch: &mut Option<ScanEpoch>,
  raw: &str,
) {
  let Some(current) = *epoch else {
    println!("scanner is not armed; type `arm` first");
    return;
  };

  match session.scan(current, raw).await {
    Ok(resolved) => {
      let approval = if resolved.has_approved_request() {
        "approved late entry"
      } else {
        "no approval"
      };
      println!(
        "{} ({}), hostel {} room {} -- {}; type `entry` or `exit`",
        resolved.bearer.name,
        resolved.bearer.reg_no,
        resolved.bearer.hostel,
        resolved.bearer.room,
        approval
      );
    }
    Err(Error::MalformedCredential(_)) => {
      // The gate disarmed itself; require an explicit re-arm.
      *epoch = None;
      println!("unreadable code; type `arm` to scan again");
    }
    Err(Error::ScannerDisarmed) => {
      println!("ignored duplicate or stale scan");
    }
    Err(e) => println!("scan failed: {e}"),
  }
}

async fn record(session: &mut GateSession<SqliteStore>, direction: Direction) {
  match session.log(direction).await {
    Ok(entry) => {
      println!("logged {} for {} ({})", entry.direction, entry.name, entry.reg_no);
    }
    Err(Error::ActionBlocked { .. }) => {
      println!("BLOCKED: curfew is active and there is no approved request");
    }
    Err(Error::NoBearerPresented) => {
      println!("no bearer on screen; scan a code first");
    }
    Err(e) => println!("could not log movement: {e}"),
  }
}
