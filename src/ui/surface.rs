//! Overlay surface
//!
//! The platform side of the overlay: the window that shows the icon and the
//! close zone. Touch input flows the other way, as `OverlayEvent`s.

use anyhow::Result;

use super::icon::OverlayIcon;
use crate::motion::{Position, Size};

pub trait OverlaySurface: Send + 'static {
    /// Current display size in pixels
    fn screen_size(&self) -> Size;

    /// Put the icon on screen at `position`
    fn show(&mut self, icon: &OverlayIcon, position: Position) -> Result<()>;

    fn apply_position(&mut self, position: Position);

    fn set_close_zone_visible(&mut self, visible: bool);

    /// Remove every window. Called exactly once when the overlay stops.
    fn teardown(&mut self);
}

/// Surface without a display: logs what a window would do.
pub struct HeadlessSurface {
    screen: Size,
    position: Position,
}

impl HeadlessSurface {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            position: Position::default(),
        }
    }
}

impl OverlaySurface for HeadlessSurface {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn show(&mut self, icon: &OverlayIcon, position: Position) -> Result<()> {
        self.position = position;
        tracing::info!(
            "Headless overlay shown: {}x{} icon ({}) at ({}, {}), opacity {}%",
            icon.width(),
            icon.height(),
            if icon.is_custom() { "custom" } else { "default" },
            position.x,
            position.y,
            icon.opacity()
        );
        Ok(())
    }

    fn apply_position(&mut self, position: Position) {
        self.position = position;
        tracing::trace!("Icon at ({}, {})", position.x, position.y);
    }

    fn set_close_zone_visible(&mut self, visible: bool) {
        tracing::debug!("Close zone visible: {}", visible);
    }

    fn teardown(&mut self) {
        tracing::info!(
            "Headless overlay removed at ({}, {})",
            self.position.x,
            self.position.y
        );
    }
}
