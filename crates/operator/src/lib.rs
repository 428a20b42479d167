//! Operator - the programmatic surface of the diagram engine
//!
//! Non-UI callers (automation, replication bridges, hosts embedding the
//! canvas) drive the engine through [`GraphOperator`]. It is the assembly
//! point for the whole workspace: scene graph, command history, rendering
//! and the change-event stream.

mod error;
mod facade;

pub use error::*;
pub use facade::*;
