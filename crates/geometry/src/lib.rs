//! Geometry primitives shared by the scene model, gesture handling and rendering
//!
//! This crate is a pure leaf: points, rectangles, attachment directions,
//! rotation helpers and the screen/page coordinate transform. No scene types
//! leak in here.

mod direction;
mod point;
mod rect;
mod transform;

pub use direction::*;
pub use point::*;
pub use rect::*;
pub use transform::*;

/// Clamp a dimension to a non-negative value, mapping NaN to zero.
///
/// Gesture math can produce a negative or NaN size (zero-distance rotate,
/// resize past the opposite edge); stored geometry must never contain either.
pub fn clamp_dimension(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}
