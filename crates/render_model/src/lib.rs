//! Render Model - drawers, display lists and the frame pass
//!
//! This crate turns a page into render items the embedding canvas renderer
//! can draw. Shape kinds bind to drawers through a registry; drawers also
//! produce the hit regions used for sub-shape click affordances.

mod drawer;
mod frame;
mod region;
mod render_item;
mod theme;

pub use drawer::*;
pub use frame::*;
pub use region::*;
pub use render_item::*;
pub use theme::*;
