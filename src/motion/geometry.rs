//! Screen geometry: positions, rectangles and the close target zone

use super::constants::*;

/// Integer screen point or icon top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Absolute touch coordinates, as delivered by the input source
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn from_origin(origin: Position, size: Size) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: origin.x.saturating_add(size.width),
            bottom: origin.y.saturating_add(size.height),
        }
    }

    /// Overlap test. Rectangles sharing an edge count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }
}

/// Display dimensions and the close zone derived from them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBounds {
    pub size: Size,
    bottom_threshold_y: i32,
    middle_left: i32,
    middle_right: i32,
}

impl ScreenBounds {
    pub fn new(size: Size) -> Self {
        let center = size.width / 2;
        Self {
            size,
            bottom_threshold_y: size.height * BOTTOM_AREA_NUMERATOR / BOTTOM_AREA_DENOMINATOR,
            middle_left: center - CLOSE_AREA_HALF_WIDTH,
            middle_right: center + CLOSE_AREA_HALF_WIDTH,
        }
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    /// Whether an icon at `position` should reveal the close zone
    pub fn reveals_close_zone(&self, position: Position) -> bool {
        position.y > self.bottom_threshold_y
            && position.x > self.middle_left
            && position.x < self.middle_right
    }

    /// Bounding box of the close zone: bottom-center, lifted by the margin
    pub fn close_zone(&self) -> Rect {
        let left = (self.size.width - CLOSE_AREA_WIDTH) / 2;
        let bottom = self.size.height - CLOSE_AREA_MARGIN_BOTTOM;
        Rect {
            left,
            top: bottom - CLOSE_AREA_HEIGHT,
            right: left + CLOSE_AREA_WIDTH,
            bottom,
        }
    }

    /// Pin `position` so an icon of `icon` size stays fully on screen.
    /// When the icon is larger than the screen it is pinned to the origin.
    pub fn clamp(&self, position: Position, icon: Size) -> Position {
        let max_x = (self.size.width - icon.width).max(0);
        let max_y = (self.size.height - icon.height).max(0);
        Position::new(position.x.clamp(0, max_x), position.y.clamp(0, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: Size = Size::new(200, 200);

    fn phone() -> ScreenBounds {
        ScreenBounds::new(Size::new(1080, 2000))
    }

    #[test]
    fn test_reveal_requires_bottom_band_and_center_span() {
        let bounds = phone();
        // threshold y = 1600, span = (315, 765)
        assert!(bounds.reveals_close_zone(Position::new(500, 1601)));
        assert!(!bounds.reveals_close_zone(Position::new(500, 1600)));
        assert!(!bounds.reveals_close_zone(Position::new(315, 1800)));
        assert!(bounds.reveals_close_zone(Position::new(316, 1800)));
        assert!(!bounds.reveals_close_zone(Position::new(765, 1800)));
        assert!(!bounds.reveals_close_zone(Position::new(900, 1700)));
    }

    #[test]
    fn test_reveal_is_pure() {
        let bounds = phone();
        let p = Position::new(540, 1900);
        assert_eq!(bounds.reveals_close_zone(p), bounds.reveals_close_zone(p));
        assert_eq!(bounds, phone());
    }

    #[test]
    fn test_close_zone_rect() {
        let zone = phone().close_zone();
        assert_eq!(
            zone,
            Rect {
                left: 315,
                top: 1750,
                right: 765,
                bottom: 1900
            }
        );
    }

    #[test]
    fn test_rect_intersection() {
        let zone = phone().close_zone();
        let touching = Rect::from_origin(Position::new(500, 1900), ICON);
        let apart = Rect::from_origin(Position::new(900, 1700), ICON);
        assert!(zone.intersects(&touching));
        assert!(touching.intersects(&zone));
        assert!(!zone.intersects(&apart));
    }

    #[test]
    fn test_rect_at_far_edge_saturates() {
        let far = Rect::from_origin(Position::new(i32::MAX - 10, i32::MIN), ICON);
        assert_eq!(far.right, i32::MAX);
        assert_eq!(far.bottom, i32::MIN + 200);
        assert!(!phone().close_zone().intersects(&far));
    }

    #[test]
    fn test_clamp_pins_out_of_bounds() {
        let bounds = phone();
        assert_eq!(bounds.clamp(Position::new(-50, -10), ICON), Position::new(0, 0));
        assert_eq!(bounds.clamp(Position::new(2000, 5000), ICON), Position::new(880, 1800));
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let bounds = phone();
        for p in [
            Position::new(0, 0),
            Position::new(880, 1800),
            Position::new(431, 977),
            Position::new(-300, 4000),
        ] {
            let once = bounds.clamp(p, ICON);
            assert_eq!(bounds.clamp(once, ICON), once);
        }
    }

    #[test]
    fn test_clamp_icon_larger_than_screen() {
        let bounds = ScreenBounds::new(Size::new(100, 100));
        assert_eq!(bounds.clamp(Position::new(40, 40), ICON), Position::new(0, 0));
    }
}
