//! Render item types
//!
//! The frame pass produces a flat display list of these items; the embedding
//! canvas renderer draws them in order. Items carry resolved colors, never
//! theme references.

use geometry::{Point, Rect};
use scene_model::Color;
use serde::{Deserialize, Serialize};

/// Render item types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RenderItem {
    /// A rectangle, rotated around its center
    Rectangle {
        bounds: Rect,
        rotation: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
        stroke_width: f64,
        dashed: bool,
    },
    /// An ellipse inscribed in its bounds
    Ellipse {
        bounds: Rect,
        rotation: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
        stroke_width: f64,
    },
    /// An open polyline (connector routes)
    Polyline {
        points: Vec<Point>,
        color: Color,
        width: f64,
        dashed: bool,
    },
    /// A text run centered in its bounds
    Text {
        bounds: Rect,
        rotation: f64,
        text: String,
        color: Color,
        font_size: f64,
    },
    /// A selection handle (small square, drawn unrotated)
    Handle { x: f64, y: f64, color: Color },
}

/// The ordered output of one frame: items paint back to front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    pub items: Vec<RenderItem>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: RenderItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
