//! Page: the root container and arena of shapes
//!
//! A page owns every shape on it in an id-keyed map; all cross references
//! (containers, connector endpoints) are ids resolved through this arena, so
//! the model is cycle-free and serializes directly. The page-level order list
//! is the z-order for top-level shapes; containers keep their own child order.

use crate::{
    ObserverHandle, Ownership, PageId, PageMode, PageRecord, PropertyChange, Result, SceneError,
    Shape, ShapeId, ShapeRecord, ShapeRegistry,
};
use geometry::{clamp_dimension, Point, ViewTransform};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Where a shape sits within its owner, for exact restoration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub owner: Ownership,
    pub index: usize,
}

/// A shape taken out of the arena together with where it was, so that undo
/// can put it back exactly.
#[derive(Debug, Clone)]
pub struct RemovedShape {
    pub shape: Shape,
    pub placement: Placement,
}

/// The top-level container of shapes.
pub struct Page {
    id: PageId,
    pub(crate) shapes: HashMap<ShapeId, Shape>,
    /// Page-level z-order, bottom first.
    pub(crate) order: Vec<ShapeId>,
    pub view: ViewTransform,
    mode: PageMode,
    observer: Option<ObserverHandle>,
    dirty: bool,
}

impl Page {
    pub fn new() -> Self {
        Self {
            id: PageId::new(),
            shapes: HashMap::new(),
            order: Vec::new(),
            view: ViewTransform::default(),
            mode: PageMode::default(),
            observer: None,
            dirty: false,
        }
    }

    pub fn with_id(mut self, id: PageId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PageMode) {
        if mode == self.mode {
            return;
        }
        let pre = self.mode;
        self.mode = mode;
        self.emit(PropertyChange::page(self.id, "mode", json!(mode.to_string()), json!(pre.to_string())));
        self.invalidate();
    }

    /// Install the change observer. Everything subsequently mutated through
    /// this page, including shapes created later, reports to it.
    pub fn set_observer(&mut self, observer: ObserverHandle) {
        self.observer = Some(observer);
    }

    pub(crate) fn emit(&self, change: PropertyChange) {
        if let Some(observer) = &self.observer {
            observer.changed(change);
        }
    }

    /// Schedule a repaint. The transition into the dirty state is itself an
    /// observable event ("display"); repeated invalidations coalesce.
    pub fn invalidate(&mut self) {
        if !self.dirty {
            self.dirty = true;
            self.emit(PropertyChange::page(self.id, "display", json!(true), json!(false)));
        }
    }

    /// Consume the repaint flag; the render loop calls this once per frame.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    pub fn screen_to_page(&self, p: Point) -> Point {
        self.view.screen_to_page(p)
    }

    pub fn page_to_screen(&self, p: Point) -> Point {
        self.view.page_to_screen(p)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        let pre = json!([self.view.offset_x, self.view.offset_y]);
        self.view.pan(dx, dy);
        self.emit(PropertyChange::page(
            self.id,
            "offset",
            json!([self.view.offset_x, self.view.offset_y]),
            pre,
        ));
        self.invalidate();
    }

    /// Multiply the zoom by `rate` around the screen point `(cx, cy)`.
    pub fn zoom(&mut self, rate: f64, cx: f64, cy: f64) {
        let pre = json!([self.view.scale_x, self.view.scale_y]);
        self.view.zoom(rate, cx, cy);
        self.emit(PropertyChange::page(
            self.id,
            "scale",
            json!([self.view.scale_x, self.view.scale_y]),
            pre,
        ));
        self.invalidate();
    }

    pub fn zoom_to(&mut self, scale: f64) {
        let pre = json!([self.view.scale_x, self.view.scale_y]);
        self.view.zoom_to(scale);
        self.emit(PropertyChange::page(
            self.id,
            "scale",
            json!([self.view.scale_x, self.view.scale_y]),
            pre,
        ));
        self.invalidate();
    }

    // ------------------------------------------------------------------
    // Shape lifecycle
    // ------------------------------------------------------------------

    /// Create a shape of a registered kind at a page position and add it at
    /// the top of the page z-order.
    pub fn create_shape(&mut self, registry: &ShapeRegistry, kind: &str, x: f64, y: f64) -> Result<ShapeId> {
        let shape = registry.construct(kind, x, y)?;
        Ok(self.insert_shape(shape))
    }

    /// Add an already-built shape at the top of the page z-order.
    pub fn insert_shape(&mut self, mut shape: Shape) -> ShapeId {
        let id = shape.id();
        shape.set_ownership(Ownership::Page);
        self.shapes.insert(id, shape);
        self.order.push(id);
        self.emit(PropertyChange::page(self.id, "shapeCreated", json!(id.to_string()), Value::Null));
        self.invalidate();
        id
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub(crate) fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn contains_shape(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Top-level shape ids in z-order, bottom first.
    pub fn order(&self) -> &[ShapeId] {
        &self.order
    }

    /// Every shape id on the page, top-level order first, then container
    /// children depth-first.
    pub fn all_ids(&self) -> Vec<ShapeId> {
        let mut out = Vec::with_capacity(self.shapes.len());
        for &id in &self.order {
            self.collect_subtree(id, &mut out);
        }
        out
    }

    fn collect_subtree(&self, id: ShapeId, out: &mut Vec<ShapeId>) {
        out.push(id);
        if let Some(data) = self.shapes.get(&id).and_then(|s| s.container_data.as_ref()) {
            for &child in &data.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Descendant ids of a shape (children, grandchildren, …), depth-first.
    pub fn descendants(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut out = Vec::new();
        if let Some(data) = self.shapes.get(&id).and_then(|s| s.container_data.as_ref()) {
            for &child in &data.children {
                self.collect_subtree(child, &mut out);
            }
        }
        out
    }

    /// Whether `ancestor` transitively contains `id`.
    pub fn is_ancestor(&self, ancestor: ShapeId, id: ShapeId) -> bool {
        let mut current = self.shapes.get(&id).and_then(|s| s.container());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.shapes.get(&parent).and_then(|s| s.container());
        }
        false
    }

    // ------------------------------------------------------------------
    // The property-change seam
    // ------------------------------------------------------------------

    /// Write one tracked property. This is the seam every mutation routes
    /// through: the pre/post pair is reported to the observer and the page is
    /// invalidated. Writes to missing or detached shapes are no-ops
    /// (`Ok(false)`); equal-value writes emit nothing.
    pub fn set_property(&mut self, id: ShapeId, key: &str, value: &Value) -> Result<bool> {
        let shape = match self.shapes.get_mut(&id) {
            Some(s) if !s.is_detached() => s,
            _ => return Ok(false),
        };
        let pre = shape.tracked_value(key);
        shape.apply_tracked(key, value)?;
        let post = shape.tracked_value(key);
        if post == pre {
            return Ok(false);
        }
        self.emit(PropertyChange::shape(id, key, post, pre));
        self.invalidate();
        if matches!(key, "width" | "height") {
            self.relayout_after_resize(id);
        }
        Ok(true)
    }

    /// Move a shape (and its whole subtree) by a delta. Returns the ids that
    /// actually moved, the target first. Respects the moveable capability of
    /// the target only; descendants travel with their container regardless.
    pub fn move_shape_by(&mut self, id: ShapeId, dx: f64, dy: f64) -> Vec<ShapeId> {
        let moveable = match self.shapes.get(&id) {
            Some(s) if !s.is_detached() && s.caps.moveable => true,
            _ => false,
        };
        if !moveable || (dx == 0.0 && dy == 0.0) {
            return Vec::new();
        }
        let mut moved = vec![id];
        moved.extend(self.descendants(id));
        for &target in &moved {
            self.shift_emitting(target, dx, dy);
        }
        // A docking parent pulls the shape back into formation eagerly.
        if let Some(parent) = self.shapes.get(&id).and_then(|s| s.container()) {
            self.dock_layout(parent);
        }
        self.invalidate();
        moved
    }

    /// Move a shape to an absolute origin (page coordinates).
    pub fn move_shape_to(&mut self, id: ShapeId, x: f64, y: f64) -> Vec<ShapeId> {
        match self.shapes.get(&id) {
            Some(s) if !s.is_detached() => {
                let (dx, dy) = (x - s.x, y - s.y);
                self.move_shape_by(id, dx, dy)
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn shift_emitting(&mut self, id: ShapeId, dx: f64, dy: f64) {
        let (pre_x, pre_y, x, y) = match self.shapes.get_mut(&id) {
            Some(s) => {
                let (px, py) = (s.x, s.y);
                s.x += dx;
                s.y += dy;
                (px, py, s.x, s.y)
            }
            None => return,
        };
        self.emit(PropertyChange::shape(id, "x", json!(x), json!(pre_x)));
        self.emit(PropertyChange::shape(id, "y", json!(y), json!(pre_y)));
    }

    /// Resize a shape, clamping to non-negative dimensions. Docking layouts
    /// (its own and its parent's) are recomputed eagerly.
    pub fn resize_shape(&mut self, id: ShapeId, width: f64, height: f64) -> bool {
        let resizeable = match self.shapes.get(&id) {
            Some(s) if !s.is_detached() && s.caps.resizeable => true,
            _ => false,
        };
        if !resizeable {
            return false;
        }
        let width = clamp_dimension(width);
        let height = clamp_dimension(height);
        let changed_w = self.set_property(id, "width", &json!(width)).unwrap_or(false);
        let changed_h = self.set_property(id, "height", &json!(height)).unwrap_or(false);
        changed_w || changed_h
    }

    fn relayout_after_resize(&mut self, id: ShapeId) {
        if self.shapes.get(&id).map(|s| s.is_container()).unwrap_or(false) {
            self.dock_layout(id);
        }
        if let Some(parent) = self.shapes.get(&id).and_then(|s| s.container()) {
            self.dock_layout(parent);
        }
    }

    // ------------------------------------------------------------------
    // Selection (transient, never serialized)
    // ------------------------------------------------------------------

    pub fn select(&mut self, id: ShapeId) -> bool {
        match self.shapes.get_mut(&id) {
            Some(s) if !s.is_detached() && s.caps.selectable => {
                s.set_selected(true);
                true
            }
            _ => false,
        }
    }

    pub fn unselect(&mut self, id: ShapeId) {
        if let Some(s) = self.shapes.get_mut(&id) {
            s.set_selected(false);
        }
    }

    pub fn clear_selection(&mut self) {
        for shape in self.shapes.values_mut() {
            shape.set_selected(false);
        }
    }

    pub fn select_all(&mut self) {
        let ids = self.all_ids();
        for id in ids {
            self.select(id);
        }
    }

    /// Selected ids in document order.
    pub fn selection(&self) -> Vec<ShapeId> {
        self.all_ids()
            .into_iter()
            .filter(|id| self.shapes.get(id).map(|s| s.is_selected()).unwrap_or(false))
            .collect()
    }

    // ------------------------------------------------------------------
    // Ownership and placement
    // ------------------------------------------------------------------

    pub fn placement(&self, id: ShapeId) -> Option<Placement> {
        let shape = self.shapes.get(&id)?;
        match shape.ownership() {
            Ownership::Page => {
                let index = self.order.iter().position(|&s| s == id)?;
                Some(Placement { owner: Ownership::Page, index })
            }
            Ownership::Container(cid) => {
                let data = self.shapes.get(&cid)?.container_data.as_ref()?;
                let index = data.children.iter().position(|&s| s == id)?;
                Some(Placement { owner: Ownership::Container(cid), index })
            }
            Ownership::Detached => None,
        }
    }

    /// Pull a shape out of its owner's list without detaching it from the
    /// arena. Internal step of re-parenting.
    pub(crate) fn unlink(&mut self, id: ShapeId) {
        let owner = match self.shapes.get(&id) {
            Some(s) => s.ownership(),
            None => return,
        };
        match owner {
            Ownership::Page => self.order.retain(|&s| s != id),
            Ownership::Container(cid) => {
                if let Some(data) = self.shapes.get_mut(&cid).and_then(|s| s.container_data.as_mut()) {
                    data.children.retain(|&s| s != id);
                }
            }
            Ownership::Detached => {}
        }
    }

    /// Link a shape into an owner's list at an index (clamped), updating its
    /// ownership and emitting the container change.
    pub(crate) fn link(&mut self, id: ShapeId, owner: Ownership, index: usize) {
        let pre = self.shapes.get(&id).map(|s| s.tracked_value("container")).unwrap_or(Value::Null);
        match owner {
            Ownership::Page => {
                let at = index.min(self.order.len());
                self.order.insert(at, id);
            }
            Ownership::Container(cid) => {
                if let Some(data) = self.shapes.get_mut(&cid).and_then(|s| s.container_data.as_mut()) {
                    let at = index.min(data.children.len());
                    data.children.insert(at, id);
                }
            }
            Ownership::Detached => {}
        }
        let post = match self.shapes.get_mut(&id) {
            Some(shape) => {
                shape.set_ownership(owner);
                shape.tracked_value("container")
            }
            None => return,
        };
        if post != pre {
            self.emit(PropertyChange::shape(id, "container", post, pre));
        }
    }

    // ------------------------------------------------------------------
    // Removal and restore
    // ------------------------------------------------------------------

    /// Remove a shape, cascading to its descendants and to any connector
    /// that references a removed shape. Non-deletable or missing targets are
    /// refused as no-ops (empty result). The returned list restores exactly
    /// in reverse order.
    pub fn remove_shape(&mut self, id: ShapeId) -> Vec<RemovedShape> {
        let deletable = match self.shapes.get(&id) {
            Some(s) if !s.is_detached() && s.caps.deletable => true,
            _ => false,
        };
        if !deletable {
            return Vec::new();
        }

        // Cascade set: the subtree, plus connectors touching anything in the
        // set, to a fixpoint (a connector may reference another connector's
        // endpoints transitively through removal waves).
        let mut doomed: HashSet<ShapeId> = HashSet::new();
        doomed.insert(id);
        for d in self.descendants(id) {
            doomed.insert(d);
        }
        loop {
            let mut grew = false;
            let dangling: Vec<ShapeId> = self
                .shapes
                .values()
                .filter(|s| !doomed.contains(&s.id()))
                .filter(|s| {
                    s.connector_data.as_ref().is_some_and(|c| {
                        c.from.is_some_and(|e| doomed.contains(&e.shape))
                            || c.to.is_some_and(|e| doomed.contains(&e.shape))
                    })
                })
                .map(|s| s.id())
                .collect();
            for d in dangling {
                grew |= doomed.insert(d);
            }
            if !grew {
                break;
            }
        }

        // Take shapes out deepest-first so every placement still resolves
        // while its owning container is in the arena.
        let surviving_parent = self.shapes.get(&id).and_then(|s| s.container());
        let ordered: Vec<ShapeId> = self.all_ids().into_iter().filter(|s| doomed.contains(s)).collect();
        let mut removed = Vec::with_capacity(ordered.len());
        for &target in ordered.iter().rev() {
            let placement = match self.placement(target) {
                Some(p) => p,
                None => continue,
            };
            self.unlink(target);
            if let Some(mut shape) = self.shapes.remove(&target) {
                shape.set_ownership(Ownership::Detached);
                self.emit(PropertyChange::page(
                    self.id,
                    "shapeRemoved",
                    json!(target.to_string()),
                    Value::Null,
                ));
                removed.push(RemovedShape { shape, placement });
            }
        }
        if let Some(parent) = surviving_parent {
            self.dock_layout(parent);
        }
        if !removed.is_empty() {
            self.invalidate();
        }
        removed
    }

    /// Put removed shapes back exactly where they were. Counterpart of
    /// [`Self::remove_shape`]; feeds undo.
    pub fn restore_shapes(&mut self, removed: Vec<RemovedShape>) {
        // remove_shape emits deepest-first; restoring in reverse re-creates
        // containers before their children.
        for RemovedShape { mut shape, placement } in removed.into_iter().rev() {
            let id = shape.id();
            shape.set_ownership(Ownership::Page);
            self.shapes.insert(id, shape);
            // link() rewrites ownership to the recorded owner.
            self.unlink_placeholder(id);
            self.link(id, placement.owner, placement.index);
            self.emit(PropertyChange::page(self.id, "shapeCreated", json!(id.to_string()), Value::Null));
        }
        self.invalidate();
    }

    fn unlink_placeholder(&mut self, id: ShapeId) {
        // restore inserts into the arena without an owner list entry; make
        // sure no stale page-order entry exists before linking.
        self.order.retain(|&s| s != id);
    }

    // ------------------------------------------------------------------
    // Z-order
    // ------------------------------------------------------------------

    fn owner_list(&self, id: ShapeId) -> Option<Vec<ShapeId>> {
        match self.shapes.get(&id)?.ownership() {
            Ownership::Page => Some(self.order.clone()),
            Ownership::Container(cid) => {
                Some(self.shapes.get(&cid)?.container_data.as_ref()?.children.clone())
            }
            Ownership::Detached => None,
        }
    }

    fn set_owner_list(&mut self, id: ShapeId, list: Vec<ShapeId>) {
        let owner = match self.shapes.get(&id) {
            Some(s) => s.ownership(),
            None => return,
        };
        let pre = self.owner_list(id).map(|l| order_json(&l)).unwrap_or(Value::Null);
        match owner {
            Ownership::Page => self.order = list,
            Ownership::Container(cid) => {
                if let Some(data) = self.shapes.get_mut(&cid).and_then(|s| s.container_data.as_mut()) {
                    data.children = list;
                }
            }
            Ownership::Detached => return,
        }
        let post = self.owner_list(id).map(|l| order_json(&l)).unwrap_or(Value::Null);
        if post != pre {
            self.emit(PropertyChange::page(self.id, "zOrder", post, pre));
            self.invalidate();
        }
    }

    /// Index of a shape within its owner's z-order.
    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.placement(id).map(|p| p.index)
    }

    pub fn move_index_top(&mut self, id: ShapeId) {
        if let Some(mut list) = self.owner_list(id) {
            if list.last() == Some(&id) {
                return;
            }
            list.retain(|&s| s != id);
            list.push(id);
            self.set_owner_list(id, list);
        }
    }

    pub fn move_index_bottom(&mut self, id: ShapeId) {
        if let Some(mut list) = self.owner_list(id) {
            if list.first() == Some(&id) {
                return;
            }
            list.retain(|&s| s != id);
            list.insert(0, id);
            self.set_owner_list(id, list);
        }
    }

    /// Place `id` immediately below `target` in the same owner list.
    pub fn move_index_before(&mut self, id: ShapeId, target: ShapeId) {
        if id == target {
            return;
        }
        if let Some(mut list) = self.owner_list(id) {
            if !list.contains(&target) {
                return;
            }
            list.retain(|&s| s != id);
            if let Some(pos) = list.iter().position(|&s| s == target) {
                list.insert(pos, id);
                self.set_owner_list(id, list);
            }
        }
    }

    /// Place `id` immediately above `target` in the same owner list.
    pub fn move_index_after(&mut self, id: ShapeId, target: ShapeId) {
        if id == target {
            return;
        }
        if let Some(mut list) = self.owner_list(id) {
            if !list.contains(&target) {
                return;
            }
            list.retain(|&s| s != id);
            if let Some(pos) = list.iter().position(|&s| s == target) {
                list.insert(pos + 1, id);
                self.set_owner_list(id, list);
            }
        }
    }

    pub fn bring_forward(&mut self, id: ShapeId) {
        if let Some(list) = self.owner_list(id) {
            if let Some(pos) = list.iter().position(|&s| s == id) {
                if pos + 1 < list.len() {
                    self.move_index_after(id, list[pos + 1]);
                }
            }
        }
    }

    pub fn send_backward(&mut self, id: ShapeId) {
        if let Some(list) = self.owner_list(id) {
            if let Some(pos) = list.iter().position(|&s| s == id) {
                if pos > 0 {
                    self.move_index_before(id, list[pos - 1]);
                }
            }
        }
    }

    /// Restore a full owner-list order (undo support for z-order commands).
    pub fn restore_order(&mut self, id: ShapeId, list: Vec<ShapeId>) {
        self.set_owner_list(id, list);
    }

    pub fn owner_order(&self, id: ShapeId) -> Option<Vec<ShapeId>> {
        self.owner_list(id)
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Topmost shape under a page-coordinate point. Children are checked
    /// before their container, top of the z-order first.
    pub fn hit_test(&self, p: Point) -> Option<ShapeId> {
        for &id in self.order.iter().rev() {
            if let Some(hit) = self.hit_test_subtree(id, p) {
                return Some(hit);
            }
        }
        None
    }

    fn hit_test_subtree(&self, id: ShapeId, p: Point) -> Option<ShapeId> {
        let shape = self.shapes.get(&id)?;
        if let Some(data) = &shape.container_data {
            for &child in data.children.iter().rev() {
                if let Some(hit) = self.hit_test_subtree(child, p) {
                    return Some(hit);
                }
            }
        }
        if shape.hit_by(p) {
            Some(id)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the page: every serializable shape, depth-first in z-order.
    pub fn serialize(&self) -> PageRecord {
        let mut shapes = Vec::with_capacity(self.shapes.len());
        for id in self.all_ids() {
            if let Some(shape) = self.shapes.get(&id) {
                if shape.caps.serializable {
                    shapes.push(ShapeRecord::from_shape(shape));
                }
            }
        }
        PageRecord { id: self.id, shapes }
    }

    /// Serialize a subset of shapes (plus their subtrees and any connector
    /// whose both endpoints are inside the set), for clipboard use.
    pub fn serialize_shapes(&self, ids: &[ShapeId]) -> Vec<ShapeRecord> {
        let mut set: HashSet<ShapeId> = HashSet::new();
        for &id in ids {
            if self.shapes.contains_key(&id) {
                set.insert(id);
                for d in self.descendants(id) {
                    set.insert(d);
                }
            }
        }
        // Connectors fully inside the set travel with it.
        let connectors: Vec<ShapeId> = self
            .shapes
            .values()
            .filter(|s| {
                s.connector_data.as_ref().is_some_and(|c| {
                    c.from.is_some_and(|e| set.contains(&e.shape))
                        && c.to.is_some_and(|e| set.contains(&e.shape))
                })
            })
            .map(|s| s.id())
            .collect();
        for c in connectors {
            set.insert(c);
        }
        self.all_ids()
            .into_iter()
            .filter(|id| set.contains(id))
            .filter_map(|id| self.shapes.get(&id))
            .filter(|s| s.caps.serializable)
            .map(ShapeRecord::from_shape)
            .collect()
    }

    /// Insert a batch of records into a live page, preserving their ids.
    /// This is the paste path; `deserialize` goes through it too. Unknown
    /// kinds and id collisions fail hard before anything is inserted;
    /// dangling container references fall back to page level; connectors
    /// with a missing endpoint are dropped.
    pub fn insert_records(
        &mut self,
        registry: &ShapeRegistry,
        records: &[ShapeRecord],
    ) -> Result<Vec<ShapeId>> {
        // First pass: construct every shape, preserving recorded ids. No
        // page mutation until the whole batch has built.
        let mut built = Vec::with_capacity(records.len());
        let mut batch: HashSet<ShapeId> = HashSet::new();
        for shape_record in records {
            if self.shapes.contains_key(&shape_record.id) || !batch.insert(shape_record.id) {
                return Err(SceneError::InvalidOperation(format!(
                    "duplicate shape id {}",
                    shape_record.id
                )));
            }
            let mut shape = registry
                .construct(&shape_record.kind, shape_record.x, shape_record.y)?
                .with_id(shape_record.id);
            shape_record.apply_to(&mut shape);
            built.push(shape);
        }
        let mut inserted = Vec::with_capacity(built.len());
        for shape in built {
            let id = shape.id();
            self.shapes.insert(id, shape);
            inserted.push(id);
        }

        // Second pass: resolve ownership. Records carry both sides of the
        // relation; the container field is authoritative, child lists are
        // pruned to the children that actually point back.
        for shape_record in records {
            let id = shape_record.id;
            match shape_record.container {
                Some(cid)
                    if self.shapes.get(&cid).map(|c| c.is_container()).unwrap_or(false) =>
                {
                    if let Some(shape) = self.shapes.get_mut(&id) {
                        shape.set_ownership(Ownership::Container(cid));
                    }
                }
                other => {
                    if let Some(cid) = other {
                        tracing::warn!(shape = %id, container = %cid, "dangling container reference, reparenting to page");
                    }
                    self.order.push(id);
                    if let Some(shape) = self.shapes.get_mut(&id) {
                        shape.set_ownership(Ownership::Page);
                    }
                }
            }
        }
        for &id in &inserted {
            let pruned: Option<Vec<ShapeId>> = self.shapes.get(&id).and_then(|s| {
                s.container_data.as_ref().map(|data| {
                    data.children
                        .iter()
                        .copied()
                        .filter(|child| {
                            self.shapes.get(child).map(|c| c.container() == Some(id)).unwrap_or(false)
                        })
                        .collect()
                })
            });
            if let Some(children) = pruned {
                if let Some(data) = self.shapes.get_mut(&id).and_then(|s| s.container_data.as_mut()) {
                    data.children = children;
                }
            }
        }

        // Third pass: drop inserted connectors with dangling endpoints, then
        // route the survivors.
        let invalid: Vec<ShapeId> = inserted
            .iter()
            .copied()
            .filter_map(|id| self.shapes.get(&id))
            .filter(|s| {
                s.connector_data.as_ref().is_some_and(|c| {
                    c.from.is_some_and(|e| !self.shapes.contains_key(&e.shape))
                        || c.to.is_some_and(|e| !self.shapes.contains_key(&e.shape))
                })
            })
            .map(|s| s.id())
            .collect();
        for id in &invalid {
            tracing::warn!(connector = %id, "dropping connector with dangling endpoint");
            self.unlink(*id);
            self.shapes.remove(id);
        }
        inserted.retain(|id| !invalid.contains(id));
        // One creation event per surviving shape, container children included.
        for &id in &inserted {
            self.emit(PropertyChange::page(
                self.id,
                "shapeCreated",
                json!(id.to_string()),
                Value::Null,
            ));
        }
        self.follow_all();
        self.invalidate();
        Ok(inserted)
    }

    /// Rebuild a page from its record through the same kind registry used
    /// for interactive creation.
    pub fn deserialize(registry: &ShapeRegistry, record: &PageRecord) -> Result<Page> {
        let mut page = Page::new().with_id(record.id);
        page.insert_records(registry, &record.shapes)?;
        Ok(page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

fn order_json(list: &[ShapeId]) -> Value {
    json!(list.iter().map(|id| id.to_string()).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ShapeRegistry, Page) {
        (ShapeRegistry::with_defaults(), Page::new())
    }

    #[test]
    fn test_create_and_lookup() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 10.0, 20.0).unwrap();
        let shape = page.shape(id).unwrap();
        assert_eq!(shape.x, 10.0);
        assert_eq!(page.order(), &[id]);
    }

    #[test]
    fn test_set_property_reports_once_per_change() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        assert!(page.set_property(id, "x", &json!(50.0)).unwrap());
        // Same value again: no change.
        assert!(!page.set_property(id, "x", &json!(50.0)).unwrap());
    }

    #[test]
    fn test_set_property_on_missing_shape_is_noop() {
        let (_, mut page) = setup();
        assert!(!page.set_property(ShapeId::new(), "x", &json!(1.0)).unwrap());
    }

    #[test]
    fn test_remove_refused_for_undeletable() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        page.shape_mut(id).unwrap().caps.deletable = false;
        assert!(page.remove_shape(id).is_empty());
        assert!(page.contains_shape(id));
    }

    #[test]
    fn test_remove_and_restore() {
        let (registry, mut page) = setup();
        let a = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let b = page.create_shape(&registry, "rectangle", 50.0, 0.0).unwrap();
        let removed = page.remove_shape(a);
        assert_eq!(removed.len(), 1);
        assert!(!page.contains_shape(a));
        assert_eq!(page.order(), &[b]);

        page.restore_shapes(removed);
        assert!(page.contains_shape(a));
        assert_eq!(page.index_of(a), Some(0));
        assert_eq!(page.order(), &[a, b]);
    }

    #[test]
    fn test_z_order_ops() {
        let (registry, mut page) = setup();
        let a = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let b = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let c = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();

        page.move_index_top(a);
        assert_eq!(page.order(), &[b, c, a]);
        page.move_index_bottom(a);
        assert_eq!(page.order(), &[a, b, c]);
        page.move_index_after(a, b);
        assert_eq!(page.order(), &[b, a, c]);
        page.move_index_before(c, b);
        assert_eq!(page.order(), &[c, b, a]);
        page.bring_forward(c);
        assert_eq!(page.order(), &[b, c, a]);
        page.send_backward(a);
        assert_eq!(page.order(), &[b, a, c]);
    }

    #[test]
    fn test_hit_test_topmost_wins() {
        let (registry, mut page) = setup();
        let bottom = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let top = page.create_shape(&registry, "rectangle", 50.0, 30.0).unwrap();
        // Overlap region: both cover (60, 40).
        assert_eq!(page.hit_test(Point::new(60.0, 40.0)), Some(top));
        assert_eq!(page.hit_test(Point::new(5.0, 5.0)), Some(bottom));
        assert_eq!(page.hit_test(Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_serialize_round_trip() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 10.0, 20.0).unwrap();
        page.resize_shape(id, 100.0, 50.0);
        page.set_property(id, "text", &json!("node")).unwrap();

        let record = page.serialize();
        let restored = Page::deserialize(&registry, &record).unwrap();
        assert_eq!(restored.id(), page.id());
        let shape = restored.shape(id).expect("id stability across round trip");
        assert_eq!(shape.x, 10.0);
        assert_eq!(shape.y, 20.0);
        assert_eq!(shape.width, 100.0);
        assert_eq!(shape.height, 50.0);
        assert_eq!(shape.text, "node");
        assert_eq!(restored.serialize(), record);
    }

    #[test]
    fn test_serialize_round_trip_every_registered_kind() {
        let (registry, mut page) = setup();
        let mut kinds: Vec<String> = registry.kinds().map(str::to_string).collect();
        kinds.sort();
        let mut ids = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            ids.push(page.create_shape(&registry, kind, i as f64 * 150.0, 40.0).unwrap());
        }

        let record = page.serialize();
        let text = serde_json::to_string(&record).unwrap();
        let parsed: PageRecord = serde_json::from_str(&text).unwrap();
        let restored = Page::deserialize(&registry, &parsed).unwrap();
        for (id, kind) in ids.iter().zip(&kinds) {
            let shape = restored.shape(*id).expect("every kind survives");
            assert_eq!(shape.kind(), kind);
            let original = page.shape(*id).unwrap();
            assert_eq!(shape.x, original.x);
            assert_eq!(shape.width, original.width);
            assert_eq!(shape.height, original.height);
        }
        assert_eq!(restored.serialize(), record);
    }

    #[test]
    fn test_serialize_round_trip_nested_container_and_connector() {
        let (registry, mut page) = setup();
        let container = page.create_shape(&registry, "container", 0.0, 0.0).unwrap();
        let a = page.create_shape(&registry, "rectangle", 20.0, 20.0).unwrap();
        let b = page.create_shape(&registry, "rectangle", 140.0, 20.0).unwrap();
        page.add_child(&registry, container, a).unwrap();
        page.add_child(&registry, container, b).unwrap();
        let outside = page.create_shape(&registry, "rectangle", 400.0, 0.0).unwrap();
        let conn = page.create_shape(&registry, "connector", 0.0, 0.0).unwrap();
        page.connect_from(conn, a, geometry::Direction::E);
        page.connect_to(conn, outside, geometry::Direction::W);

        let record = page.serialize();
        let restored = Page::deserialize(&registry, &record).unwrap();
        let children = restored
            .shape(container)
            .unwrap()
            .container_data
            .as_ref()
            .unwrap()
            .children
            .clone();
        assert_eq!(children, vec![a, b]);
        for child in [a, b] {
            assert_eq!(restored.shape(child).unwrap().container(), Some(container));
        }
        let data = restored.shape(conn).unwrap().connector_data.as_ref().unwrap();
        assert_eq!(data.from.unwrap().shape, a);
        assert_eq!(data.to.unwrap().shape, outside);
        assert_eq!(restored.order(), page.order());
        assert_eq!(restored.serialize(), record);
    }

    #[test]
    fn test_deserialize_unknown_kind_fails() {
        let (registry, mut page) = setup();
        page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let mut record = page.serialize();
        record.shapes[0].kind = "mystery".into();
        assert!(matches!(
            Page::deserialize(&registry, &record),
            Err(SceneError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_deserialize_dangling_container_reparents() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let mut record = page.serialize();
        record.shapes[0].container = Some(ShapeId::new());
        let restored = Page::deserialize(&registry, &record).unwrap();
        assert_eq!(restored.shape(id).unwrap().container(), None);
        assert_eq!(restored.order(), &[id]);
    }

    #[test]
    fn test_insert_records_reports_every_creation() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Recorder(RefCell<Vec<PropertyChange>>);
        impl crate::ChangeObserver for Recorder {
            fn changed(&self, change: PropertyChange) {
                self.0.borrow_mut().push(change);
            }
        }

        let (registry, mut source) = setup();
        let container = source.create_shape(&registry, "container", 0.0, 0.0).unwrap();
        let child = source.create_shape(&registry, "rectangle", 20.0, 20.0).unwrap();
        source.add_child(&registry, container, child).unwrap();
        let record = source.serialize();

        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        let mut page = Page::new();
        page.set_observer(recorder.clone());
        page.insert_records(&registry, &record.shapes).unwrap();

        // A replaying consumer sees one creation per shape, the container's
        // child included.
        let created: Vec<String> = recorder
            .0
            .borrow()
            .iter()
            .filter(|c| c.property == "shapeCreated")
            .map(|c| c.value.as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(created.len(), 2);
        assert!(created.contains(&container.to_string()));
        assert!(created.contains(&child.to_string()));
    }

    #[test]
    fn test_selection_is_transient() {
        let (registry, mut page) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        assert!(page.select(id));
        assert_eq!(page.selection(), vec![id]);
        let restored = Page::deserialize(&registry, &page.serialize()).unwrap();
        assert!(restored.selection().is_empty());
    }
}
