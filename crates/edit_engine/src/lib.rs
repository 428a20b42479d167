//! Edit Engine - commands, history, gestures and clipboard
//!
//! Every durable mutation is expressed as a `Command` holding enough state
//! to reverse itself; `History` keeps the per-page undo/redo stacks. Pointer
//! gestures mutate the page live and commit as a single command on release.

mod clipboard;
mod command;
mod error;
mod gesture;
mod history;

pub use clipboard::*;
pub use command::*;
pub use error::*;
pub use gesture::*;
pub use history::*;
