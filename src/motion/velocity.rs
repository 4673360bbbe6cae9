//! Release velocity estimation from touch samples.

use super::geometry::Point;

/// If the pointer has not moved for this long before release, it is considered stopped.
pub const ASSUME_STOPPED_MS: u64 = 40;

/// Velocity in pixels per second
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both axes are below `threshold` in magnitude
    pub fn below(&self, threshold: f64) -> bool {
        self.x.abs() < threshold && self.y.abs() < threshold
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_ms: u64,
    point: Point,
}

/// Two-sample velocity tracker.
///
/// The estimate is the displacement between the last two samples divided by
/// their time gap, with the gap floored to 1 ms.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    last: Option<Sample>,
    velocity: Velocity,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.velocity = Velocity::ZERO;
    }

    /// Record a movement sample and update the estimate.
    pub fn add_movement(&mut self, time_ms: u64, point: Point) {
        if let Some(prev) = self.last {
            let dt = time_ms.saturating_sub(prev.time_ms).max(1) as f64;
            self.velocity = Velocity::new(
                (point.x - prev.point.x) / dt * 1000.0,
                (point.y - prev.point.y) / dt * 1000.0,
            );
        }
        self.last = Some(Sample { time_ms, point });
    }

    /// Finalize the estimate with the release sample.
    ///
    /// Input sources often report the release at the last move position; that
    /// sample carries no displacement and keeps the running estimate, unless
    /// the pointer rested long enough to count as stopped.
    pub fn finish(&mut self, time_ms: u64, point: Point) -> Velocity {
        match self.last {
            Some(prev) if prev.point == point => {
                if time_ms.saturating_sub(prev.time_ms) > ASSUME_STOPPED_MS {
                    self.velocity = Velocity::ZERO;
                }
            }
            _ => self.add_movement(time_ms, point),
        }
        self.velocity
    }
}
