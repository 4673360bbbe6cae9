//! Business logic module
//!
//! Overlay session lifecycle: the service actor, its scheduler, the running
//! state and the quick tile that reflects it.

mod launcher;
mod overlay_service;
mod running_state;
mod scheduler;
mod tile;

pub use launcher::{OverlayLauncher, StartOutcome};
pub use overlay_service::{EventSender, OverlayEvent, StopReason};
pub use running_state::RunningState;
pub use tile::{AlwaysGranted, OverlayPermission, QuickTile, TileAction, TileState};
