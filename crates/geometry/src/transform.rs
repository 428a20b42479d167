//! Screen/page coordinate mapping
//!
//! Every programmatic operation crosses the engine boundary in screen pixels;
//! the scene stores page coordinates. The two conversions here must be exact
//! inverses of each other: `screen_to_page(p) = p / scale - offset` and
//! `page_to_screen(p) = (p + offset) * scale`.

use crate::Point;
use serde::{Deserialize, Serialize};

/// The zoom/pan state of a page viewport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    /// Pan offset in page coordinates.
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Map a screen point into page coordinates.
    pub fn screen_to_page(&self, p: Point) -> Point {
        Point::new(p.x / self.scale_x - self.offset_x, p.y / self.scale_y - self.offset_y)
    }

    /// Map a page point into screen coordinates. Exact inverse of
    /// [`Self::screen_to_page`].
    pub fn page_to_screen(&self, p: Point) -> Point {
        Point::new((p.x + self.offset_x) * self.scale_x, (p.y + self.offset_y) * self.scale_y)
    }

    /// Pan by a delta in page coordinates.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Multiply the scale by `rate`, keeping the page point under the screen
    /// point `(cx, cy)` stationary.
    pub fn zoom(&mut self, rate: f64, cx: f64, cy: f64) {
        if rate <= 0.0 || !rate.is_finite() {
            return;
        }
        let anchor = self.screen_to_page(Point::new(cx, cy));
        self.scale_x *= rate;
        self.scale_y *= rate;
        let after = self.screen_to_page(Point::new(cx, cy));
        self.offset_x += after.x - anchor.x;
        self.offset_y += after.y - anchor.y;
    }

    /// Set an absolute uniform scale without adjusting the offset.
    pub fn zoom_to(&mut self, scale: f64) {
        if scale <= 0.0 || !scale.is_finite() {
            return;
        }
        self.scale_x = scale;
        self.scale_y = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity_transform() {
        let t = ViewTransform::default();
        let p = Point::new(42.0, -7.0);
        assert_eq!(t.screen_to_page(p), p);
        assert_eq!(t.page_to_screen(p), p);
    }

    #[test]
    fn test_zoom_keeps_anchor_stationary() {
        let mut t = ViewTransform::default();
        t.pan(10.0, 5.0);
        let anchor_before = t.screen_to_page(Point::new(200.0, 150.0));
        t.zoom(2.0, 200.0, 150.0);
        let anchor_after = t.screen_to_page(Point::new(200.0, 150.0));
        assert!((anchor_before.x - anchor_after.x).abs() < 1e-9);
        assert!((anchor_before.y - anchor_after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_rejects_invalid_rate() {
        let mut t = ViewTransform::default();
        t.zoom(0.0, 0.0, 0.0);
        t.zoom(-1.0, 0.0, 0.0);
        t.zoom(f64::NAN, 0.0, 0.0);
        assert_eq!(t.scale_x, 1.0);
        assert_eq!(t.scale_y, 1.0);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            x in -10_000i32..10_000,
            y in -10_000i32..10_000,
            scale in 1u32..8,
            ox in -500i32..500,
            oy in -500i32..500,
        ) {
            let t = ViewTransform {
                scale_x: f64::from(scale),
                scale_y: f64::from(scale),
                offset_x: f64::from(ox),
                offset_y: f64::from(oy),
            };
            let p = Point::new(f64::from(x), f64::from(y));
            let back = t.page_to_screen(t.screen_to_page(p));
            prop_assert!((back.x - p.x).abs() < 1e-6);
            prop_assert!((back.y - p.y).abs() < 1e-6);
        }
    }
}
