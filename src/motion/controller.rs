//! Overlay Motion Controller
//!
//! Owns the floating icon position and moves it in response to touch input,
//! inertial fling and edge snap. The controller is pure arithmetic: it never
//! sleeps or schedules. The caller steps it once per frame while
//! [`MotionController::is_animating`] is true and routes side effects through
//! a [`MotionHost`].

use super::constants::VELOCITY_MULTIPLIER;
use super::geometry::{Point, Position, Rect, ScreenBounds, Size};
use super::velocity::{Velocity, VelocityTracker};
use crate::data::MotionConfig;

/// Side effects requested by the controller
pub trait MotionHost {
    /// Move the on-screen icon
    fn apply_position(&mut self, position: Position);
    /// Show or hide the close target zone
    fn set_close_zone_visible(&mut self, visible: bool);
    /// Remember the position across restarts (fire-and-forget)
    fn persist_position(&mut self, position: Position);
    /// The icon was dropped on the close zone; the overlay should stop
    fn request_dismiss(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Dragging,
    Flinging,
    Snapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Raw touch input in absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub point: Point,
    pub time_ms: u64,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f64, y: f64, time_ms: u64) -> Self {
        Self {
            phase,
            point: Point::new(x, y),
            time_ms,
        }
    }
}

/// What happened when the finger lifted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Dismissed,
    Fling,
    Snap,
    /// Release without a matching touch-down
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin: Position,
    touch_origin: Point,
}

#[derive(Debug, Clone, Copy)]
struct SnapState {
    start_x: i32,
    target_x: i32,
    started_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    Idle,
    Dragging(DragState),
    /// Velocity in px/frame
    Flinging(Velocity),
    Snapping(SnapState),
}

pub struct MotionController {
    config: MotionConfig,
    bounds: ScreenBounds,
    icon: Size,
    position: Position,
    motion: Motion,
    tracker: VelocityTracker,
    close_zone_visible: bool,
}

impl MotionController {
    /// Create a controller. The initial position is clamped to the screen.
    pub fn new(config: MotionConfig, screen: Size, icon: Size, initial: Position) -> Self {
        let bounds = ScreenBounds::new(screen);
        Self {
            config,
            bounds,
            icon,
            position: bounds.clamp(initial, icon),
            motion: Motion::Idle,
            tracker: VelocityTracker::new(),
            close_zone_visible: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn phase(&self) -> MotionPhase {
        match self.motion {
            Motion::Idle => MotionPhase::Idle,
            Motion::Dragging(_) => MotionPhase::Dragging,
            Motion::Flinging(_) => MotionPhase::Flinging,
            Motion::Snapping(_) => MotionPhase::Snapping,
        }
    }

    /// True while frame steps are needed
    pub fn is_animating(&self) -> bool {
        matches!(self.motion, Motion::Flinging(_) | Motion::Snapping(_))
    }

    /// Current fling velocity in px/frame
    pub fn handle_touch<H: MotionHost>(&mut self, host: &mut H, event: TouchEvent) {
        match event.phase {
            TouchPhase::Down => self.on_touch_down(event.time_ms, event.point),
            TouchPhase::Move => self.on_touch_move(host, event.time_ms, event.point),
            TouchPhase::Up => {
                self.on_touch_up(host, event.time_ms, event.point);
            }
            TouchPhase::Cancel => self.on_touch_cancel(host),
        }
    }

    /// Start a drag. Any fling or snap in progress is abandoned.
    pub fn on_touch_down(&mut self, time_ms: u64, point: Point) {
        if self.is_animating() {
            tracing::debug!("Touch down interrupts {:?}", self.phase());
        }
        self.tracker.reset();
        self.tracker.add_movement(time_ms, point);
        self.motion = Motion::Dragging(DragState {
            origin: self.position,
            touch_origin: point,
        });
    }

    /// Follow the finger. The icon may leave the screen while dragged.
    pub fn on_touch_move<H: MotionHost>(&mut self, host: &mut H, time_ms: u64, point: Point) {
        let Motion::Dragging(drag) = self.motion else {
            return;
        };
        self.tracker.add_movement(time_ms, point);

        self.position = Position::new(
            drag.origin.x.saturating_add((point.x - drag.touch_origin.x) as i32),
            drag.origin.y.saturating_add((point.y - drag.touch_origin.y) as i32),
        );
        host.apply_position(self.position);

        let reveal = self.bounds.reveals_close_zone(self.position);
        self.set_close_zone(host, reveal);
    }

    /// End a drag: dismiss, fling or snap.
    pub fn on_touch_up<H: MotionHost>(
        &mut self,
        host: &mut H,
        time_ms: u64,
        point: Point,
    ) -> ReleaseOutcome {
        if !matches!(self.motion, Motion::Dragging(_)) {
            return ReleaseOutcome::Ignored;
        }
        let velocity = self.tracker.finish(time_ms, point);
        self.tracker.reset();

        let icon_rect = Rect::from_origin(self.position, self.icon);
        if icon_rect.intersects(&self.bounds.close_zone()) {
            tracing::info!(
                "Icon dropped on close zone at ({}, {})",
                self.position.x,
                self.position.y
            );
            self.motion = Motion::Idle;
            host.request_dismiss();
            return ReleaseOutcome::Dismissed;
        }
        self.set_close_zone(host, false);
        // A drag may end off-screen; animations start from a pinned position
        self.pin_to_screen(host);

        if velocity.below(self.config.velocity_threshold) {
            self.begin_snap();
            ReleaseOutcome::Snap
        } else {
            tracing::debug!("Fling with velocity ({:.0}, {:.0}) px/s", velocity.x, velocity.y);
            self.motion = Motion::Flinging(Velocity::new(
                velocity.x * VELOCITY_MULTIPLIER,
                velocity.y * VELOCITY_MULTIPLIER,
            ));
            ReleaseOutcome::Fling
        }
    }

    /// Abandon the drag without snapping or persisting.
    pub fn on_touch_cancel<H: MotionHost>(&mut self, host: &mut H) {
        if !matches!(self.motion, Motion::Dragging(_)) {
            return;
        }
        self.tracker.reset();
        self.motion = Motion::Idle;
        self.set_close_zone(host, false);
        self.pin_to_screen(host);
    }

    /// Advance whichever animation is running by one frame.
    pub fn step<H: MotionHost>(&mut self, host: &mut H, now_ms: u64) -> MotionPhase {
        match self.motion {
            Motion::Flinging(_) => self.step_fling(host),
            Motion::Snapping(_) => self.step_snap(host, now_ms),
            _ => {}
        }
        self.phase()
    }

    /// One fling frame: decay, move, pin to the screen.
    pub fn step_fling<H: MotionHost>(&mut self, host: &mut H) {
        let Motion::Flinging(mut v) = self.motion else {
            return;
        };
        v.x *= self.config.friction;
        v.y *= self.config.friction;

        let moved = Position::new(
            self.position.x.saturating_add(v.x as i32),
            self.position.y.saturating_add(v.y as i32),
        );
        self.position = self.bounds.clamp(moved, self.icon);
        host.apply_position(self.position);

        let stop = self.config.stop_threshold;
        if v.x.abs() <= stop && v.y.abs() <= stop {
            self.begin_snap();
        } else {
            self.motion = Motion::Flinging(v);
        }
    }

    /// One snap frame. The first frame stamps the start time.
    pub fn step_snap<H: MotionHost>(&mut self, host: &mut H, now_ms: u64) {
        let Motion::Snapping(mut snap) = self.motion else {
            return;
        };
        let started = *snap.started_ms.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(started) as f64;
        let progress = (elapsed / self.config.snap_duration_ms as f64).min(1.0);
        let eased = ease_out(progress);

        let x = (snap.start_x as f64 + (snap.target_x - snap.start_x) as f64 * eased) as i32;
        self.position = Position::new(x, self.position.y);
        host.apply_position(self.position);

        if progress >= 1.0 {
            self.motion = Motion::Idle;
            tracing::debug!("Snapped to ({}, {})", self.position.x, self.position.y);
            host.persist_position(self.position);
        } else {
            self.motion = Motion::Snapping(snap);
        }
    }

    /// The display changed size: re-clamp and persist.
    pub fn on_screen_bounds_changed<H: MotionHost>(&mut self, host: &mut H, screen: Size) {
        self.bounds = ScreenBounds::new(screen);
        self.position = self.bounds.clamp(self.position, self.icon);
        tracing::info!(
            "Screen bounds now {}x{}, icon at ({}, {})",
            screen.width,
            screen.height,
            self.position.x,
            self.position.y
        );
        host.apply_position(self.position);
        host.persist_position(self.position);

        if matches!(self.motion, Motion::Snapping(_)) {
            self.begin_snap();
        }
    }

    /// Edge the icon snaps to from its current position
    pub fn snap_target_x(&self) -> i32 {
        if self.position.x < self.bounds.width() / 2 {
            0
        } else {
            self.bounds.width() - self.icon.width
        }
    }

    fn begin_snap(&mut self) {
        self.motion = Motion::Snapping(SnapState {
            start_x: self.position.x,
            target_x: self.snap_target_x(),
            started_ms: None,
        });
    }

    fn pin_to_screen<H: MotionHost>(&mut self, host: &mut H) {
        let clamped = self.bounds.clamp(self.position, self.icon);
        if clamped != self.position {
            self.position = clamped;
            host.apply_position(clamped);
        }
    }

    fn set_close_zone<H: MotionHost>(&mut self, host: &mut H, visible: bool) {
        if self.close_zone_visible != visible {
            self.close_zone_visible = visible;
            host.set_close_zone_visible(visible);
        }
    }
}

/// Quadratic ease-out on [0, 1]
pub fn ease_out(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p) * (1.0 - p)
}
