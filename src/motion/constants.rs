//! Overlay Motion Constants

/// Default floating icon edge length (px)
pub const ICON_SIZE: i32 = 200;

/// Close target zone size and placement (px)
pub const CLOSE_AREA_WIDTH: i32 = 450;
pub const CLOSE_AREA_HEIGHT: i32 = 150;
pub const CLOSE_AREA_MARGIN_BOTTOM: i32 = 100;

/// Half-width of the centered band that reveals the close zone (px)
pub const CLOSE_AREA_HALF_WIDTH: i32 = 225;

/// Close zone is revealed below this fraction of the screen height
pub const BOTTOM_AREA_NUMERATOR: i32 = 4;
pub const BOTTOM_AREA_DENOMINATOR: i32 = 5;

/// Per-frame velocity decay. Higher = longer glide.
pub const FRICTION: f64 = 0.985;

/// Release speed below which no fling is started (px/s, per axis)
pub const VELOCITY_THRESHOLD: f64 = 50.0;

/// Converts px/s into px/frame (~1/60)
pub const VELOCITY_MULTIPLIER: f64 = 0.018;

/// A fling ends once both axes drop to this speed (px/frame)
pub const STOP_THRESHOLD: f64 = 0.5;

/// Animation cadence
pub const FRAME_DELAY_MS: u64 = 16;
pub const SNAP_DURATION_MS: u64 = 200;

pub const MAX_OPACITY: u8 = 100;
