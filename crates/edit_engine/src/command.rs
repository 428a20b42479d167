//! Reversible editing commands
//!
//! A command captures before/after state of only the shapes it touches, not
//! the whole page, so undo stays cheap. `execute` returns whether the command
//! actually changed anything; refused/no-op commands are never pushed onto
//! the history stack.

use crate::{EditError, Result};
use scene_model::{
    GroupOutcome, Page, RemovedShape, ShapeId, ShapeRegistry, UngroupOutcome,
};
use serde_json::{Map, Value};

/// Trait for all editing commands.
pub trait Command: std::fmt::Debug {
    /// Apply the command. `Ok(false)` means the command was refused (invalid
    /// structure) and must not be recorded.
    fn execute(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool>;

    /// Exactly reverse a previously executed command.
    fn undo(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<()>;

    /// Replay after an undo. Defaults to `execute`.
    fn redo(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<()> {
        self.execute(page, registry).map(|_| ())
    }

    /// Display name for menus and logs.
    fn display_name(&self) -> &str;
}

// ============================================================================
// Create / delete
// ============================================================================

/// Create one shape of a registered kind.
#[derive(Debug)]
pub struct CreateShapeCommand {
    kind: String,
    x: f64,
    y: f64,
    created: Option<ShapeId>,
    removed: Option<Vec<RemovedShape>>,
}

impl CreateShapeCommand {
    pub fn new(kind: impl Into<String>, x: f64, y: f64) -> Self {
        Self { kind: kind.into(), x, y, created: None, removed: None }
    }

    /// The created shape's id, available after the first execute.
    pub fn created_id(&self) -> Option<ShapeId> {
        self.created
    }
}

impl Command for CreateShapeCommand {
    fn execute(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool> {
        if let Some(removed) = self.removed.take() {
            page.restore_shapes(removed);
        } else {
            let id = page.create_shape(registry, &self.kind, self.x, self.y)?;
            self.created = Some(id);
        }
        Ok(true)
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        let id = self
            .created
            .ok_or_else(|| EditError::InvalidCommand("undo before execute".into()))?;
        self.removed = Some(page.remove_shape(id));
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Create Shape"
    }
}

/// Delete shapes, cascading per the page's removal rules.
#[derive(Debug)]
pub struct DeleteShapesCommand {
    targets: Vec<ShapeId>,
    removed: Option<Vec<Vec<RemovedShape>>>,
}

impl DeleteShapesCommand {
    pub fn new(targets: Vec<ShapeId>) -> Self {
        Self { targets, removed: None }
    }
}

impl Command for DeleteShapesCommand {
    fn execute(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<bool> {
        let mut batches = Vec::new();
        for &target in &self.targets {
            let batch = page.remove_shape(target);
            if !batch.is_empty() {
                batches.push(batch);
            }
        }
        let applied = !batches.is_empty();
        self.removed = Some(batches);
        Ok(applied)
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        let batches = self
            .removed
            .take()
            .ok_or_else(|| EditError::InvalidCommand("undo before execute".into()))?;
        for batch in batches.into_iter().rev() {
            page.restore_shapes(batch);
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Delete Shapes"
    }
}

// ============================================================================
// Property changes (move, resize, style, data)
// ============================================================================

/// Before/after snapshot of the tracked properties of one shape.
#[derive(Debug, Clone)]
pub struct PropertyDelta {
    pub id: ShapeId,
    pub before: Map<String, Value>,
    pub after: Map<String, Value>,
}

/// Apply tracked-property writes to a set of shapes, reversibly.
#[derive(Debug)]
pub struct SetPropertiesCommand {
    targets: Vec<PropertyDelta>,
}

impl SetPropertiesCommand {
    /// Capture a command from desired writes: the before side snapshots the
    /// current values of exactly the keys being written.
    pub fn capture(page: &Page, writes: &[(ShapeId, Map<String, Value>)]) -> Self {
        let targets = writes
            .iter()
            .filter_map(|(id, after)| {
                let shape = page.shape(*id)?;
                let before = after
                    .keys()
                    .map(|k| (k.clone(), shape.tracked_value(k)))
                    .collect();
                Some(PropertyDelta { id: *id, before, after: after.clone() })
            })
            .collect();
        Self { targets }
    }

    /// Build from snapshots already taken (gesture commit path).
    pub fn from_deltas(targets: Vec<PropertyDelta>) -> Self {
        Self { targets }
    }

    fn apply(page: &mut Page, id: ShapeId, values: &Map<String, Value>) -> Result<bool> {
        let mut changed = false;
        for (key, value) in values {
            changed |= page.set_property(id, key, value)?;
        }
        Ok(changed)
    }
}

impl Command for SetPropertiesCommand {
    fn execute(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<bool> {
        let mut changed = false;
        for delta in &self.targets {
            changed |= Self::apply(page, delta.id, &delta.after)?;
        }
        Ok(changed)
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        for delta in self.targets.iter().rev() {
            Self::apply(page, delta.id, &delta.before)?;
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Change Properties"
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Group shapes into a new container.
#[derive(Debug)]
pub struct GroupCommand {
    ids: Vec<ShapeId>,
    outcome: Option<GroupOutcome>,
}

impl GroupCommand {
    pub fn new(ids: Vec<ShapeId>) -> Self {
        Self { ids, outcome: None }
    }

    pub fn container_id(&self) -> Option<ShapeId> {
        self.outcome.as_ref().map(|o| o.container)
    }
}

impl Command for GroupCommand {
    fn execute(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool> {
        // Replays reuse the original container id so redo rebuilds the
        // identical structure.
        let forced = self.outcome.as_ref().map(|o| o.container);
        self.outcome = page.group_with(registry, &self.ids, forced);
        Ok(self.outcome.is_some())
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        let outcome = self
            .outcome
            .as_ref()
            .ok_or_else(|| EditError::InvalidCommand("undo before execute".into()))?;
        page.undo_group(outcome);
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Group"
    }
}

/// Dissolve containers, returning children to the containers' scope.
#[derive(Debug)]
pub struct UngroupCommand {
    ids: Vec<ShapeId>,
    outcomes: Vec<UngroupOutcome>,
}

impl UngroupCommand {
    pub fn new(ids: Vec<ShapeId>) -> Self {
        Self { ids, outcomes: Vec::new() }
    }
}

impl Command for UngroupCommand {
    fn execute(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<bool> {
        self.outcomes = page.ungroup(&self.ids);
        // Narrow the target list to the containers actually dissolved so a
        // redo replays exactly those.
        if !self.outcomes.is_empty() {
            self.ids = self.outcomes.iter().map(|o| o.container.shape.id()).collect();
        }
        Ok(!self.outcomes.is_empty())
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        for outcome in self.outcomes.iter().rev() {
            page.undo_ungroup(outcome);
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Ungroup"
    }
}

// ============================================================================
// Z-order
// ============================================================================

/// Restore-order command recorded after a z-order mutation already applied.
#[derive(Debug)]
pub struct ZOrderCommand {
    id: ShapeId,
    before: Vec<ShapeId>,
    after: Vec<ShapeId>,
}

impl ZOrderCommand {
    pub fn new(id: ShapeId, before: Vec<ShapeId>, after: Vec<ShapeId>) -> Self {
        Self { id, before, after }
    }
}

impl Command for ZOrderCommand {
    fn execute(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<bool> {
        page.restore_order(self.id, self.after.clone());
        Ok(self.before != self.after)
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        page.restore_order(self.id, self.before.clone());
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Reorder"
    }
}
