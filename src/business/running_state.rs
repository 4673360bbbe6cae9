//! Overlay running state
//!
//! Observable "overlay is running" flag. The overlay service sets it on start
//! and clears it on stop; the quick tile and tray subscribe to it.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct RunningState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for RunningState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Mark the overlay as running. The flag is cleared when the guard drops.
    pub fn enter(&self) -> RunningGuard {
        self.set(true);
        RunningGuard {
            state: self.clone(),
        }
    }

    fn set(&self, running: bool) {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != running;
            *current = running;
            changed
        });
        if changed {
            tracing::debug!("Overlay running: {}", running);
        }
    }
}

/// Keeps the running flag set for the lifetime of one overlay session
pub struct RunningGuard {
    state: RunningState,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.state.set(false);
    }
}
