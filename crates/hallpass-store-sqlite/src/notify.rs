//! The change bus behind live query subscriptions.
//!
//! Every committed write broadcasts the collection it touched. Subscription
//! feed tasks listen, re-run their query, and publish the full fresh result
//! set to their subscriber.

use tokio::sync::broadcast;

/// The watched collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
  Requests,
  Logs,
  Tickets,
  Announcements,
}

/// Fan-out of write notifications to subscription feed tasks.
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
  tx: broadcast::Sender<Collection>,
}

impl ChangeBus {
  pub fn new() -> Self {
    // Feed tasks that fall behind see `Lagged` and refresh unconditionally,
    // so a modest buffer is enough.
    let (tx, _) = broadcast::channel(64);
    Self { tx }
  }

  /// Announce a committed write. No subscribers is not an error.
  pub fn notify(&self, collection: Collection) {
    let _ = self.tx.send(collection);
  }

  pub fn watch(&self) -> broadcast::Receiver<Collection> {
    self.tx.subscribe()
  }
}

impl Default for ChangeBus {
  fn default() -> Self { Self::new() }
}
