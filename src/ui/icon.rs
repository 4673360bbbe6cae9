//! Overlay icon
//!
//! Loads the user's custom icon when one is configured and falls back to the
//! built-in energy drink can otherwise. The image is always square and sized to
//! the configured icon size.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::motion::constants::MAX_OPACITY;
use crate::motion::Size;

/// Pixels below this alpha are treated as background when painting keyed windows
const KEY_ALPHA_CUTOFF: u8 = 128;

#[derive(Debug, Clone)]
pub struct OverlayIcon {
    image: RgbaImage,
    opacity: u8,
    custom: bool,
}

impl OverlayIcon {
    /// Build the icon for an overlay session.
    ///
    /// A custom icon that cannot be read or decoded is logged and replaced by
    /// the default; starting the overlay never fails because of the icon.
    pub fn load(custom: Option<&Path>, size: u32, opacity: u8) -> Self {
        let size = size.max(1);
        let opacity = opacity.min(MAX_OPACITY);

        if let Some(path) = custom {
            match image::open(path) {
                Ok(decoded) => {
                    let image = imageops::resize(&decoded.to_rgba8(), size, size, FilterType::Triangle);
                    tracing::info!("Loaded custom icon from {:?}", path);
                    return Self {
                        image,
                        opacity,
                        custom: true,
                    };
                }
                Err(e) => {
                    tracing::warn!("Failed to load custom icon {:?}, using default: {}", path, e);
                }
            }
        }

        Self {
            image: default_icon(size),
            opacity,
            custom: false,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width() as i32, self.height() as i32)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Opacity percentage, 0..=100
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Raw RGBA bytes, row-major, top-down
    pub fn rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Opacity as a window alpha byte
    pub fn window_alpha(&self) -> u8 {
        (self.opacity as u32 * 255 / MAX_OPACITY as u32) as u8
    }

    /// BGRA pixels with transparent areas replaced by `key` (as 0x00BBGGRR).
    ///
    /// Layered windows with a color key cannot blend per pixel, so each pixel is
    /// either fully drawn or fully keyed out.
    pub fn to_bgra_keyed(&self, key: u32) -> Vec<u8> {
        let key_r = (key & 0xFF) as u8;
        let key_g = ((key >> 8) & 0xFF) as u8;
        let key_b = ((key >> 16) & 0xFF) as u8;

        let mut out = Vec::with_capacity(self.image.as_raw().len());
        for pixel in self.image.pixels() {
            let [r, g, b, a] = pixel.0;
            if a < KEY_ALPHA_CUTOFF {
                out.extend_from_slice(&[key_b, key_g, key_r, 0]);
            } else {
                out.extend_from_slice(&[b, g, r, 0]);
            }
        }
        out
    }
}

/// Draw the default energy drink can
pub fn default_icon(size: u32) -> RgbaImage {
    let mut image = RgbaImage::new(size, size);
    let s = size as f32;

    // Can body, centered, a bit taller than wide
    let left = s * 0.28;
    let right = s * 0.72;
    let top = s * 0.10;
    let bottom = s * 0.90;
    let rim = (s * 0.06).max(1.0);
    let corner = (right - left) * 0.18;

    let body_start = (46u8, 204u8, 113u8); // Green
    let body_end = (22u8, 110u8, 60u8); // Dark green
    let rim_color = Rgba([200u8, 200u8, 210u8, 255u8]);
    let bolt_color = Rgba([255u8, 221u8, 51u8, 255u8]);

    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 + 0.5;
            let fy = y as f32 + 0.5;
            if fx < left || fx > right || fy < top || fy > bottom {
                continue;
            }

            // Rounded corners
            let cx = fx.clamp(left + corner, right - corner);
            let cy = fy.clamp(top + corner, bottom - corner);
            let (dx, dy) = (fx - cx, fy - cy);
            if dx * dx + dy * dy > corner * corner {
                continue;
            }

            if fy < top + rim || fy > bottom - rim {
                image.put_pixel(x, y, rim_color);
                continue;
            }

            // Horizontal shading gives the can some roundness
            let t = ((fx - left) / (right - left) - 0.35).abs() / 0.65;
            let r = lerp(body_start.0, body_end.0, t);
            let g = lerp(body_start.1, body_end.1, t);
            let b = lerp(body_start.2, body_end.2, t);
            image.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }

    // Lightning bolt: two slanted strokes meeting at the middle
    let mid_x = s * 0.5;
    let bolt_top = s * 0.25;
    let bolt_mid = s * 0.52;
    let bolt_bottom = s * 0.78;
    let half_width = (s * 0.045).max(0.75);
    let lean = s * 0.08;
    for y in 0..size {
        let fy = y as f32 + 0.5;
        let center = if (bolt_top..bolt_mid).contains(&fy) {
            let t = (fy - bolt_top) / (bolt_mid - bolt_top);
            mid_x + lean - t * 2.0 * lean
        } else if (bolt_mid..=bolt_bottom).contains(&fy) {
            let t = (fy - bolt_mid) / (bolt_bottom - bolt_mid);
            mid_x + lean * 0.5 - t * 2.0 * lean
        } else {
            continue;
        };
        for x in 0..size {
            let fx = x as f32 + 0.5;
            if (fx - center).abs() <= half_width {
                image.put_pixel(x, y, bolt_color);
            }
        }
    }

    image
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (from as f32 * (1.0 - t) + to as f32 * t) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_icon_when_no_custom() {
        let icon = OverlayIcon::load(None, 200, 100);
        assert!(!icon.is_custom());
        assert_eq!(icon.size(), Size::new(200, 200));
        assert_eq!(icon.rgba().len(), 200 * 200 * 4);
    }

    #[test]
    fn test_default_icon_has_transparent_corners_and_opaque_body() {
        let image = default_icon(64);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(32, 40).0[3], 255);
    }

    #[test]
    fn test_custom_icon_is_resized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.png");
        RgbaImage::from_pixel(50, 30, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let icon = OverlayIcon::load(Some(&path), 120, 80);
        assert!(icon.is_custom());
        assert_eq!(icon.size(), Size::new(120, 120));
        assert_eq!(&icon.rgba()[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_unreadable_custom_icon_falls_back() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.png");
        let icon = OverlayIcon::load(Some(&missing), 100, 100);
        assert!(!icon.is_custom());

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image").unwrap();
        let icon = OverlayIcon::load(Some(&garbage), 100, 100);
        assert!(!icon.is_custom());
        assert_eq!(icon.size(), Size::new(100, 100));
    }

    #[test]
    fn test_window_alpha_maps_percentage() {
        assert_eq!(OverlayIcon::load(None, 8, 100).window_alpha(), 255);
        assert_eq!(OverlayIcon::load(None, 8, 0).window_alpha(), 0);
        assert_eq!(OverlayIcon::load(None, 8, 50).window_alpha(), 127);
        // Out of range values are capped
        assert_eq!(OverlayIcon::load(None, 8, 250).opacity(), 100);
    }

    #[test]
    fn test_keyed_pixels() {
        let icon = OverlayIcon::load(None, 64, 100);
        let bgra = icon.to_bgra_keyed(0x00FF00FF);
        assert_eq!(bgra.len(), 64 * 64 * 4);
        // Top-left corner is background
        assert_eq!(&bgra[..3], &[0xFF, 0x00, 0xFF]);
    }
}
