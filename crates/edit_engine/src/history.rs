//! Per-page linear history stack
//!
//! One history per page, no branching: recording a new command while undone
//! entries exist discards the redo tail. Undo/redo on an empty stack are
//! guarded no-ops, never errors.

use crate::{Command, Result};
use scene_model::{Page, ShapeRegistry};

const DEFAULT_MAX_ENTRIES: usize = 100;

/// Manages the undo and redo stacks for one page.
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self { max_entries, ..Self::new() }
    }

    /// Execute a command and record it if it changed anything. Returns
    /// whether the command applied.
    pub fn apply(
        &mut self,
        page: &mut Page,
        registry: &ShapeRegistry,
        mut command: Box<dyn Command>,
    ) -> Result<bool> {
        if !command.execute(page, registry)? {
            tracing::debug!(command = command.display_name(), "command refused, not recorded");
            return Ok(false);
        }
        self.record(command);
        Ok(true)
    }

    /// Record a command whose effect has already been applied (gesture
    /// commits, post-hoc captures). Discards the redo tail.
    pub fn record(&mut self, command: Box<dyn Command>) {
        self.redo_stack.clear();
        self.undo_stack.push(command);
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the most recent command. `Ok(false)` when there is nothing to
    /// undo.
    pub fn undo(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool> {
        let mut command = match self.undo_stack.pop() {
            Some(c) => c,
            None => return Ok(false),
        };
        command.undo(page, registry)?;
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redo the most recently undone command. `Ok(false)` when there is
    /// nothing to redo.
    pub fn redo(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool> {
        let mut command = match self.redo_stack.pop() {
            Some(c) => c,
            None => return Ok(false),
        };
        command.redo(page, registry)?;
        self.undo_stack.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
