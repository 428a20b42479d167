//! Attachment direction tags for connector endpoints

use crate::{rotate_point, Point, Rect};
use serde::{Deserialize, Serialize};

/// The side of a shape a connector attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    /// Midpoint of the named side of `bounds`, rotated with the shape so
    /// attachment points track rotated endpoints.
    pub fn attachment_point(&self, bounds: &Rect, rotation_deg: f64) -> Point {
        let raw = match self {
            Direction::N => Point::new(bounds.x + bounds.width / 2.0, bounds.y),
            Direction::S => Point::new(bounds.x + bounds.width / 2.0, bounds.y + bounds.height),
            Direction::E => Point::new(bounds.x + bounds.width, bounds.y + bounds.height / 2.0),
            Direction::W => Point::new(bounds.x, bounds.y + bounds.height / 2.0),
        };
        rotate_point(raw, bounds.center(), rotation_deg)
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::S => Direction::N,
            Direction::E => Direction::W,
            Direction::W => Direction::E,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_points() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(Direction::N.attachment_point(&r, 0.0), Point::new(60.0, 20.0));
        assert_eq!(Direction::S.attachment_point(&r, 0.0), Point::new(60.0, 70.0));
        assert_eq!(Direction::E.attachment_point(&r, 0.0), Point::new(110.0, 45.0));
        assert_eq!(Direction::W.attachment_point(&r, 0.0), Point::new(10.0, 45.0));
    }

    #[test]
    fn test_attachment_tracks_rotation() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        let p = Direction::N.attachment_point(&r, 180.0);
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Direction::N.opposite(), Direction::S);
        assert_eq!(Direction::E.opposite(), Direction::W);
    }
}
