//! The programmatic operator surface
//!
//! `GraphOperator` is what non-UI callers (automation, replication bridges,
//! embedding hosts) drive instead of pointer events. It owns the graph, the
//! kind and drawer registries, one history per page and the change batcher.
//! Coordinates cross this boundary in screen space and are converted against
//! the target page's viewport. Each call is one synchronous turn: the event
//! batch collected during the call is flushed exactly once before returning.

use crate::{OperatorError, Result};
use change_stream::{BatchListener, ChangeBatcher};
use edit_engine::{
    copy_shapes, paste_records, Command, CreateShapeCommand, DeleteShapesCommand, GroupCommand,
    History, PasteCommand, PropertyDelta, SetPropertiesCommand, UngroupCommand, ZOrderCommand,
};
use geometry::{Direction, Point};
use render_model::{DisplayList, Drawer, DrawerRegistry, FrameRenderer};
use scene_model::{
    Graph, ModeManager, Page, PageId, PageMode, PageRecord, Shape, ShapeDescriptor, ShapeId,
    ShapeRegistry,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Single-step or absolute z-order moves accepted by `move_shape_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMove {
    Up,
    Down,
    Top,
    Bottom,
}

pub struct GraphOperator {
    graph: Graph,
    registry: ShapeRegistry,
    modes: ModeManager,
    renderer: FrameRenderer,
    histories: HashMap<PageId, History>,
    batcher: Rc<ChangeBatcher>,
}

impl GraphOperator {
    /// An operator over a fresh one-page graph with the built-in kinds.
    pub fn new() -> Self {
        let batcher = ChangeBatcher::new();
        let mut graph = Graph::new();
        graph.set_observer(batcher.clone());
        let mut histories = HashMap::new();
        let first = graph.add_page(Page::new());
        histories.insert(first, History::new());
        batcher.discard();
        Self {
            graph,
            registry: ShapeRegistry::with_defaults(),
            modes: ModeManager::with_defaults(),
            renderer: FrameRenderer::new(DrawerRegistry::with_defaults()),
            histories,
            batcher,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    /// Mutable access to the override table, for hosts installing their own
    /// per-mode behavior rows.
    pub fn modes_mut(&mut self) -> &mut ModeManager {
        &mut self.modes
    }

    /// The active page, its history and the kind registry, borrowed apart
    /// so commands can run against all three.
    fn active(&mut self) -> Result<(&mut Page, &mut History, &ShapeRegistry)> {
        let id = self.graph.active_page_id().ok_or(OperatorError::NoActivePage)?;
        let page = self.graph.page_mut(id).ok_or(OperatorError::NoActivePage)?;
        let history = self.histories.entry(id).or_default();
        Ok((page, history, &self.registry))
    }

    // ------------------------------------------------------------------
    // Shape operations
    // ------------------------------------------------------------------

    /// Create a shape from `{"kind": ..., "x": ..., "y": ..., <attrs>}`.
    /// `x`/`y` are screen coordinates; remaining keys are applied as tracked
    /// properties. Unknown kinds fail fast.
    pub fn create_shape(&mut self, data: Value) -> Result<ShapeId> {
        let result = self.create_shape_inner(data);
        self.batcher.flush();
        result
    }

    fn create_shape_inner(&mut self, data: Value) -> Result<ShapeId> {
        let object = data
            .as_object()
            .ok_or_else(|| OperatorError::InvalidRequest("shape data must be an object".into()))?
            .clone();
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| OperatorError::InvalidRequest("missing \"kind\"".into()))?
            .to_string();
        let sx = object.get("x").and_then(Value::as_f64).unwrap_or(0.0);
        let sy = object.get("y").and_then(Value::as_f64).unwrap_or(0.0);

        let (page, history, registry) = self.active()?;
        let at = page.screen_to_page(Point::new(sx, sy));
        let mut command = CreateShapeCommand::new(&kind, at.x, at.y);
        command.execute(page, registry)?;
        let id = match command.created_id() {
            Some(id) => id,
            None => return Err(OperatorError::InvalidRequest("shape was not created".into())),
        };
        for (key, value) in &object {
            if matches!(key.as_str(), "kind" | "x" | "y") {
                continue;
            }
            if let Err(error) = page.set_property(id, key, value) {
                tracing::debug!(%id, key, %error, "attribute refused at creation");
            }
        }
        history.record(Box::new(command));
        tracing::debug!(%id, kind, "shape created");
        Ok(id)
    }

    /// Remove a shape, cascading per the page rules. Unknown or undeletable
    /// targets are refused as logged no-ops.
    pub fn remove_shape(&mut self, id: ShapeId) -> Result<bool> {
        let (page, history, registry) = self.active()?;
        let applied =
            history.apply(page, registry, Box::new(DeleteShapesCommand::new(vec![id])))?;
        if !applied {
            tracing::debug!(%id, "remove refused");
        }
        self.batcher.flush();
        Ok(applied)
    }

    /// Write tracked properties on one shape. `x`/`y` values are screen
    /// coordinates and move the shape as a unit: a container carries its
    /// subtree, exactly as a pointer drag would.
    pub fn set_attributes(&mut self, id: ShapeId, attrs: Map<String, Value>) -> Result<bool> {
        let (page, history, _) = self.active()?;
        let mut writes = attrs;
        let mut move_x = None;
        let mut move_y = None;
        for key in ["x", "y"] {
            if let Some(value) = writes.get(key).and_then(Value::as_f64) {
                writes.remove(key);
                if key == "x" {
                    move_x = Some(page.screen_to_page(Point::new(value, 0.0)).x);
                } else {
                    move_y = Some(page.screen_to_page(Point::new(0.0, value)).y);
                }
            }
        }

        // Snapshot everything the writes may disturb: the target, its
        // subtree, and the subtree of a docking parent.
        let mut affected = vec![id];
        affected.extend(page.descendants(id));
        if let Some(parent) = page.shape(id).and_then(|s| s.container()) {
            affected.push(parent);
            affected.extend(page.descendants(parent));
        }
        let mut seen = HashSet::new();
        affected.retain(|&sid| seen.insert(sid));
        let saved: Vec<(ShapeId, Map<String, Value>)> = affected
            .iter()
            .filter_map(|&sid| {
                let shape = page.shape(sid)?;
                let mut snap = shape.snapshot(&Shape::GEOMETRY_KEYS);
                if sid == id {
                    for key in writes.keys() {
                        snap.insert(key.clone(), shape.tracked_value(key));
                    }
                }
                Some((sid, snap))
            })
            .collect();

        if move_x.is_some() || move_y.is_some() {
            if let Some((cur_x, cur_y)) = page.shape(id).map(|s| (s.x, s.y)) {
                let moved = page.move_shape_to(id, move_x.unwrap_or(cur_x), move_y.unwrap_or(cur_y));
                if moved.is_empty() {
                    tracing::debug!(%id, "move had no effect");
                }
            }
        }
        for (key, value) in &writes {
            page.set_property(id, key, value)?;
        }

        let deltas: Vec<PropertyDelta> = saved
            .into_iter()
            .filter_map(|(sid, before)| {
                let shape = page.shape(sid)?;
                let after: Map<String, Value> =
                    before.keys().map(|k| (k.clone(), shape.tracked_value(k))).collect();
                if after == before {
                    None
                } else {
                    Some(PropertyDelta { id: sid, before, after })
                }
            })
            .collect();
        let applied = !deltas.is_empty();
        if applied {
            history.record(Box::new(SetPropertiesCommand::from_deltas(deltas)));
        }
        self.batcher.flush();
        Ok(applied)
    }

    /// Group shapes into a new container. Returns the container id, or
    /// `None` when the request was refused.
    pub fn group(&mut self, ids: &[ShapeId]) -> Result<Option<ShapeId>> {
        let (page, history, registry) = self.active()?;
        let mut command = GroupCommand::new(ids.to_vec());
        let applied = command.execute(page, registry)?;
        let container = command.container_id();
        if applied {
            history.record(Box::new(command));
        } else {
            tracing::debug!(?ids, "group refused");
        }
        self.batcher.flush();
        Ok(container.filter(|_| applied))
    }

    /// Dissolve containers back into their owners' scope.
    pub fn ungroup(&mut self, ids: &[ShapeId]) -> Result<bool> {
        let (page, history, registry) = self.active()?;
        let applied =
            history.apply(page, registry, Box::new(UngroupCommand::new(ids.to_vec())))?;
        self.batcher.flush();
        Ok(applied)
    }

    /// Move a shape within its owner's z-order.
    pub fn move_shape_index(&mut self, id: ShapeId, direction: IndexMove) -> Result<bool> {
        let (page, history, _) = self.active()?;
        let before = match page.owner_order(id) {
            Some(order) => order,
            None => {
                tracing::debug!(%id, "z-order move refused, unknown shape");
                return Ok(false);
            }
        };
        match direction {
            IndexMove::Up => page.bring_forward(id),
            IndexMove::Down => page.send_backward(id),
            IndexMove::Top => page.move_index_top(id),
            IndexMove::Bottom => page.move_index_bottom(id),
        }
        let after = page.owner_order(id).unwrap_or_default();
        let moved = before != after;
        if moved {
            history.record(Box::new(ZOrderCommand::new(id, before, after)));
        }
        self.batcher.flush();
        Ok(moved)
    }

    /// Dispatch a click at a screen point. The mode-override table answers
    /// first for the shape under the point; without an override the hit
    /// region's own handler runs. Returns whether any handler ran.
    pub fn click(&mut self, x: f64, y: f64) -> Result<bool> {
        let id = self.graph.active_page_id().ok_or(OperatorError::NoActivePage)?;
        let page = self.graph.page_mut(id).ok_or(OperatorError::NoActivePage)?;
        let at = page.screen_to_page(Point::new(x, y));
        let handled = match page.hit_test(at) {
            Some(target) => {
                let over = page
                    .shape(target)
                    .and_then(|shape| self.modes.click_handler(page.mode(), shape.kind()));
                match over {
                    Some(handler) => {
                        handler(page, target);
                        true
                    }
                    None => self.renderer.click(page, at),
                }
            }
            None => false,
        };
        self.batcher.flush();
        Ok(handled)
    }

    /// Attach a connector's source end. Refused as a logged no-op when
    /// either shape is missing.
    pub fn connect_from(
        &mut self,
        connector: ShapeId,
        target: ShapeId,
        direction: Direction,
    ) -> Result<bool> {
        let (page, _, _) = self.active()?;
        let connected = page.connect_from(connector, target, direction);
        self.batcher.flush();
        Ok(connected)
    }

    /// Attach a connector's destination end.
    pub fn connect_to(
        &mut self,
        connector: ShapeId,
        target: ShapeId,
        direction: Direction,
    ) -> Result<bool> {
        let (page, _, _) = self.active()?;
        let connected = page.connect_to(connector, target, direction);
        self.batcher.flush();
        Ok(connected)
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    /// Serialize shapes (plus subtrees and enclosed connectors) to a
    /// clipboard payload.
    pub fn copy(&self, ids: &[ShapeId]) -> Result<String> {
        let id = self.graph.active_page_id().ok_or(OperatorError::NoActivePage)?;
        let page = self.graph.page(id).ok_or(OperatorError::NoActivePage)?;
        Ok(copy_shapes(page, ids)?)
    }

    /// Paste a clipboard payload offset by a screen-space delta. Every
    /// pasted shape gets a fresh id.
    pub fn paste(&mut self, payload: &str, dx: f64, dy: f64) -> Result<Vec<ShapeId>> {
        let (page, history, registry) = self.active()?;
        let delta_x = dx / page.view.scale_x;
        let delta_y = dy / page.view.scale_y;
        let records = paste_records(payload, delta_x, delta_y)?;
        let mut command = PasteCommand::new(records);
        let applied = command.execute(page, registry)?;
        let pasted = command.pasted().to_vec();
        if applied {
            history.record(Box::new(command));
        }
        self.batcher.flush();
        Ok(pasted)
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Pan the active page by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<()> {
        let (page, _, _) = self.active()?;
        let delta_x = dx / page.view.scale_x;
        let delta_y = dy / page.view.scale_y;
        page.pan(delta_x, delta_y);
        self.batcher.flush();
        Ok(())
    }

    /// Multiply the active page's zoom by `rate` around the screen point
    /// `(cx, cy)`.
    pub fn zoom(&mut self, rate: f64, cx: f64, cy: f64) -> Result<()> {
        let (page, _, _) = self.active()?;
        page.zoom(rate, cx, cy);
        self.batcher.flush();
        Ok(())
    }

    /// Set an absolute zoom level on the active page.
    pub fn zoom_to(&mut self, scale: f64) -> Result<()> {
        let (page, _, _) = self.active()?;
        page.zoom_to(scale);
        self.batcher.flush();
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<bool> {
        let (page, history, registry) = self.active()?;
        let undone = history.undo(page, registry)?;
        self.batcher.flush();
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let (page, history, registry) = self.active()?;
        let redone = history.redo(page, registry)?;
        self.batcher.flush();
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.graph
            .active_page_id()
            .and_then(|id| self.histories.get(&id))
            .map(History::can_undo)
            .unwrap_or(false)
    }

    pub fn can_redo(&self) -> bool {
        self.graph
            .active_page_id()
            .and_then(|id| self.histories.get(&id))
            .map(History::can_redo)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    pub fn add_page(&mut self) -> PageId {
        let id = self.graph.add_page(Page::new());
        self.histories.insert(id, History::new());
        self.batcher.flush();
        id
    }

    pub fn remove_page(&mut self, id: PageId) -> bool {
        let removed = self.graph.remove_page(id).is_some();
        if removed {
            self.histories.remove(&id);
        }
        self.batcher.flush();
        removed
    }

    pub fn set_active_page(&mut self, id: PageId) -> bool {
        let switched = self.graph.set_active_page(id);
        self.batcher.flush();
        switched
    }

    pub fn active_page_id(&self) -> Option<PageId> {
        self.graph.active_page_id()
    }

    /// Set the editing mode of the active page, driving the mode-override
    /// table for every subsequent interaction.
    pub fn set_page_mode(&mut self, mode: PageMode) -> Result<()> {
        let (page, _, _) = self.active()?;
        page.set_mode(mode);
        self.batcher.flush();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn serialize_page(&self, id: PageId) -> Result<String> {
        let page = self
            .graph
            .page(id)
            .ok_or_else(|| OperatorError::PageNotFound(id.to_string()))?;
        Ok(serde_json::to_string(&page.serialize())?)
    }

    /// Load a serialized page into the graph as a new page. Unknown kinds
    /// in the payload fail fast.
    pub fn load_page(&mut self, payload: &str) -> Result<PageId> {
        let record: PageRecord = serde_json::from_str(payload)?;
        let page = Page::deserialize(&self.registry, &record)?;
        let id = self.graph.add_page(page);
        self.histories.insert(id, History::new());
        tracing::debug!(%id, shapes = record.shapes.len(), "page loaded");
        self.batcher.flush();
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Extension and observation
    // ------------------------------------------------------------------

    /// Register a new shape kind with its drawer. This is the only
    /// supported way to add domain-specific node types.
    pub fn register_kind(&mut self, descriptor: ShapeDescriptor, drawer: Rc<dyn Drawer>) {
        let kind = descriptor.kind.clone();
        self.registry.register(descriptor);
        self.renderer.drawers_mut().register(kind, drawer);
    }

    /// Install the event-stream callback. One batch is delivered per
    /// operator call that changed anything.
    pub fn set_listener(&self, listener: BatchListener) {
        self.batcher.set_listener(listener);
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the active page into a display list.
    pub fn render_frame(&mut self) -> Result<DisplayList> {
        let id = self.graph.active_page_id().ok_or(OperatorError::NoActivePage)?;
        let page = self.graph.page_mut(id).ok_or(OperatorError::NoActivePage)?;
        let list = self.renderer.render_page(page);
        self.batcher.flush();
        Ok(list)
    }

    /// Advance the animation tick. Only the active page animates.
    pub fn tick(&mut self) -> DisplayList {
        self.renderer.tick(&self.graph)
    }
}

impl Default for GraphOperator {
    fn default() -> Self {
        Self::new()
    }
}
