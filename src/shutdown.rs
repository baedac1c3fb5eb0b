//! Cooperative shutdown signal.
//!
//! A one-way latch shared by the gateway, the command dispatcher and the
//! host loops. Once triggered it stays triggered. Work already running is not
//! interrupted; new work checks [`ShutdownSignal::is_triggered`] and bails.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared shutdown latch.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trigger shutdown. Returns true only for the call that flipped the latch.
    pub fn trigger(&self, reason: &str) -> bool {
        let flipped = self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });
        if flipped {
            info!(reason, "Shutdown requested");
        }
        flipped
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes the latch.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
