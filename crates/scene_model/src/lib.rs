//! Scene Model - the diagram editor's scene graph
//!
//! This crate provides the core data model: shapes stored in an id-keyed
//! arena per page, containers and connectors as shape roles, a kind registry
//! for extension, per-mode behavior overrides, and the change-observation
//! seam every tracked mutation routes through.

mod connector;
mod container;
mod error;
mod graph;
mod mode;
mod observer;
mod page;
mod record;
mod registry;
mod shape;
mod shape_id;
mod style;

pub use container::*;
pub use error::*;
pub use graph::*;
pub use mode::*;
pub use observer::*;
pub use page::*;
pub use record::*;
pub use registry::*;
pub use shape::*;
pub use shape_id::*;
pub use style::*;
