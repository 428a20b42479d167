//! Axis-aligned rectangle

use crate::{rotate_point, Point};
use serde::{Deserialize, Serialize};

/// A rectangle in page coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the rectangle contains a point, inclusive of edges.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Point containment for a rectangle rotated around its center.
    ///
    /// The point is counter-rotated into the rectangle's local frame rather
    /// than rotating all four corners.
    pub fn contains_rotated(&self, p: Point, rotation_deg: f64) -> bool {
        let local = rotate_point(p, self.center(), -rotation_deg);
        self.contains(local)
    }

    /// Smallest rectangle covering both operands.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Bounding box of a set of points. Returns a zero rect for an empty set.
    pub fn bounding(points: &[Point]) -> Rect {
        let mut iter = points.iter();
        let first = match iter.next() {
            Some(p) => *p,
            None => return Rect::default(),
        };
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}
