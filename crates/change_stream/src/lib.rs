//! Change Stream - structured change events and per-turn batching
//!
//! External observers see every engine mutation through this crate: the
//! scene model reports into a [`ChangeBatcher`] installed as its observer,
//! and the host flushes one FIFO batch per synchronous turn.

mod batcher;
mod event;

pub use batcher::*;
pub use event::*;
