//! Quick Tile
//!
//! Tri-state toggle derived from the running state and the overlay permission.

use std::fmt;
use std::sync::Arc;

use super::running_state::RunningState;

/// Whether the platform currently lets us draw over other windows
pub trait OverlayPermission: Send + Sync {
    fn is_granted(&self) -> bool;
}

/// Desktop platforms need no permission to show topmost windows
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl OverlayPermission for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Active,
    Inactive,
    Unavailable,
}

impl TileState {
    pub fn project(running: bool, permitted: bool) -> Self {
        if running {
            TileState::Active
        } else if !permitted {
            TileState::Unavailable
        } else {
            TileState::Inactive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TileState::Active => "Energy Drink: on",
            TileState::Inactive => "Energy Drink: off",
            TileState::Unavailable => "Energy Drink: unavailable",
        }
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a click on the tile asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAction {
    Start,
    Stop,
    Nothing,
}

#[derive(Clone)]
pub struct QuickTile {
    running: RunningState,
    permission: Arc<dyn OverlayPermission>,
}

impl QuickTile {
    pub fn new(running: RunningState, permission: Arc<dyn OverlayPermission>) -> Self {
        Self {
            running,
            permission,
        }
    }

    pub fn state(&self) -> TileState {
        TileState::project(self.running.is_running(), self.permission.is_granted())
    }

    /// Resolve a click against the state at click time
    pub fn on_click(&self) -> TileAction {
        let action = match self.state() {
            TileState::Active => TileAction::Stop,
            TileState::Inactive => TileAction::Start,
            TileState::Unavailable => TileAction::Nothing,
        };
        tracing::debug!("Tile clicked: {:?}", action);
        action
    }

    /// Report the current state, then every change, until the running state goes away
    pub async fn watch<F>(&self, mut on_change: F)
    where
        F: FnMut(TileState),
    {
        let mut rx = self.running.subscribe();
        let mut last = self.state();
        on_change(last);

        while rx.changed().await.is_ok() {
            let running = *rx.borrow_and_update();
            let state = TileState::project(running, self.permission.is_granted());
            if state != last {
                last = state;
                on_change(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Switch(AtomicBool);

    impl OverlayPermission for Switch {
        fn is_granted(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn tile(granted: bool) -> (QuickTile, RunningState, Arc<Switch>) {
        let running = RunningState::new();
        let permission = Arc::new(Switch(AtomicBool::new(granted)));
        let tile = QuickTile::new(running.clone(), permission.clone());
        (tile, running, permission)
    }

    #[test]
    fn test_projection_table() {
        assert_eq!(TileState::project(true, true), TileState::Active);
        assert_eq!(TileState::project(true, false), TileState::Active);
        assert_eq!(TileState::project(false, true), TileState::Inactive);
        assert_eq!(TileState::project(false, false), TileState::Unavailable);
    }

    #[test]
    fn test_click_actions() {
        let (tile, running, permission) = tile(true);
        assert_eq!(tile.on_click(), TileAction::Start);

        let guard = running.enter();
        assert_eq!(tile.on_click(), TileAction::Stop);
        drop(guard);

        permission.0.store(false, Ordering::SeqCst);
        assert_eq!(tile.state(), TileState::Unavailable);
        assert_eq!(tile.on_click(), TileAction::Nothing);
    }

    #[tokio::test]
    async fn test_watch_follows_running_state() {
        let (tile, running, _permission) = tile(true);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let watcher = tile.clone();
        let task = tokio::spawn(async move {
            watcher
                .watch(move |state| {
                    let _ = tx.send(state);
                })
                .await;
        });
        assert_eq!(rx.recv().await, Some(TileState::Inactive));

        let guard = running.enter();
        assert_eq!(rx.recv().await, Some(TileState::Active));
        drop(guard);
        assert_eq!(rx.recv().await, Some(TileState::Inactive));

        task.abort();
    }
}
