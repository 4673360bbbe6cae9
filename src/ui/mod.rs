//! UI Module
//!
//! Overlay surfaces, the icon they draw and, on Windows, the tray that acts as
//! the quick tile.

mod icon;
#[cfg(target_os = "windows")]
mod overlay_window;
mod surface;
#[cfg(target_os = "windows")]
mod system_tray;

pub use icon::OverlayIcon;
#[cfg(target_os = "windows")]
pub use overlay_window::WindowsSurface;
pub use surface::{HeadlessSurface, OverlaySurface};
#[cfg(target_os = "windows")]
pub use system_tray::run_app;
