//! 2D point type and rotation helpers

use serde::{Deserialize, Serialize};

/// A 2D point with X and Y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Rotate a point around a center by an angle in degrees.
///
/// Angles below the epsilon threshold short-circuit so that repeated calls on
/// unrotated shapes stay bit-exact.
pub fn rotate_point(p: Point, center: Point, angle_deg: f64) -> Point {
    if angle_deg.abs() < 1e-6 {
        return p;
    }
    let angle_rad = angle_deg.to_radians();
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point {
        x: center.x + dx * cos_a - dy * sin_a,
        y: center.y + dx * sin_a + dy * cos_a,
    }
}
