//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcast stop signal for the HTTP server and the cache refresher.
///
/// The server subscribes once and hands the refresher its own receiver, so a
/// single `trigger` stops both.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many tasks were notified; zero
    /// means they had all exited already.
    pub fn trigger(&self) -> usize {
        match self.tx.send(()) {
            Ok(notified) => {
                tracing::info!(tasks = notified, "Shutdown triggered");
                notified
            }
            Err(_) => {
                tracing::debug!("Shutdown triggered with no running tasks");
                0
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
