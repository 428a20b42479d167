//! Container membership, grouping and dock layout
//!
//! Grouping is always flattened to one level: grouping a set that includes
//! existing group containers first dissolves those containers, then builds a
//! single new group around the leaf shapes. The outcome structs carry enough
//! placement bookkeeping for exact undo.

use crate::{
    DockAlign, DockMode, Ownership, Page, Placement, RemovedShape, Result, SceneError, Shape,
    ShapeId, ShapeRegistry,
};
use geometry::Rect;

/// Margin between a new group container's border and its members.
const GROUP_MARGIN: f64 = 8.0;

/// Result of a successful `group`, sufficient to reverse it exactly.
#[derive(Debug, Clone)]
pub struct GroupOutcome {
    /// The newly created group container.
    pub container: ShapeId,
    /// Final members, in document order.
    pub members: Vec<ShapeId>,
    /// Each member's placement before grouping. Members that lived in a
    /// dissolved container still point at it; restore the dissolved
    /// containers first.
    pub prior: Vec<(ShapeId, Placement)>,
    /// Group containers that were dissolved by flattening, child lists
    /// emptied.
    pub dissolved: Vec<RemovedShape>,
}

/// Result of ungrouping one container.
#[derive(Debug, Clone)]
pub struct UngroupOutcome {
    /// The removed container, child list emptied.
    pub container: RemovedShape,
    /// Former children in their former order.
    pub children: Vec<ShapeId>,
}

impl Page {
    /// Add an existing shape to a container, enforcing the kind's
    /// `child_allowed` policy and refusing ownership cycles. Returns
    /// `Ok(false)` when the request is structurally invalid (refused, not an
    /// error).
    pub fn add_child(
        &mut self,
        registry: &ShapeRegistry,
        container_id: ShapeId,
        child_id: ShapeId,
    ) -> Result<bool> {
        if container_id == child_id || self.is_ancestor(child_id, container_id) {
            return Ok(false);
        }
        let (container, child) = match (self.shape(container_id), self.shape(child_id)) {
            (Some(c), Some(s)) if c.is_container() && !s.is_detached() => (c, s),
            _ => return Ok(false),
        };
        let behavior = registry
            .descriptor(container.kind())
            .ok_or_else(|| SceneError::UnknownKind(container.kind().to_string()))?
            .behavior
            .clone();
        if !behavior.child_allowed(container, child) {
            tracing::debug!(container = %container_id, child = %child_id, "child refused by container policy");
            return Ok(false);
        }
        self.unlink(child_id);
        let end = self
            .shape(container_id)
            .and_then(|c| c.container_data.as_ref())
            .map(|d| d.children.len())
            .unwrap_or(0);
        self.link(child_id, Ownership::Container(container_id), end);
        self.dock_layout(container_id);
        self.invalidate();
        Ok(true)
    }

    /// Move a child out of its container back to page level (top of the
    /// z-order).
    pub fn remove_child(&mut self, child_id: ShapeId) -> bool {
        let parent = match self.shape(child_id).and_then(|s| s.container()) {
            Some(p) => p,
            None => return false,
        };
        self.unlink(child_id);
        self.link(child_id, Ownership::Page, self.order.len());
        self.dock_layout(parent);
        self.invalidate();
        true
    }

    /// Group a set of shapes into a new `container` shape.
    ///
    /// Containers in the input set are dissolved first (no nested groups);
    /// their children become members. Returns `None` when the request is
    /// refused: no usable members, or a member the container policy rejects.
    pub fn group(&mut self, registry: &ShapeRegistry, ids: &[ShapeId]) -> Option<GroupOutcome> {
        self.group_with(registry, ids, None)
    }

    /// `group` with a caller-chosen container id, so a replayed group (redo)
    /// reproduces the identical structure.
    pub fn group_with(
        &mut self,
        registry: &ShapeRegistry,
        ids: &[ShapeId],
        forced_id: Option<ShapeId>,
    ) -> Option<GroupOutcome> {
        let candidates: Vec<ShapeId> = ids
            .iter()
            .copied()
            .filter(|&id| {
                self.shape(id)
                    .map(|s| !s.is_detached() && !s.is_connector())
                    .unwrap_or(false)
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // Flattened member list, read-only pass.
        let mut members: Vec<ShapeId> = Vec::new();
        for &id in &candidates {
            let shape = self.shape(id)?;
            match &shape.container_data {
                Some(data) => members.extend(data.children.iter().copied()),
                None => members.push(id),
            }
        }
        let mut seen = std::collections::HashSet::new();
        members.retain(|id| seen.insert(*id));
        if members.is_empty() {
            return None;
        }

        // Policy pre-check against a prototype of the group container; any
        // refusal aborts before mutation.
        let prototype = registry.construct("container", 0.0, 0.0).ok()?;
        let behavior = registry.descriptor("container")?.behavior.clone();
        for &member in &members {
            if !behavior.child_allowed(&prototype, self.shape(member)?) {
                tracing::debug!(member = %member, "group refused by child policy");
                return None;
            }
        }

        let prior: Vec<(ShapeId, Placement)> = members
            .iter()
            .filter_map(|&m| self.placement(m).map(|p| (m, p)))
            .collect();
        let anchor = self.placement(candidates[0])?;

        // Dissolve selected containers.
        let mut dissolved = Vec::new();
        for &id in &candidates {
            if self.shape(id).map(|s| s.is_container()).unwrap_or(false) {
                let placement = match self.placement(id) {
                    Some(p) => p,
                    None => continue,
                };
                self.unlink(id);
                if let Some(mut shape) = self.shapes.remove(&id) {
                    if let Some(data) = shape.container_data.as_mut() {
                        data.children.clear();
                    }
                    shape.set_ownership(Ownership::Detached);
                    dissolved.push(RemovedShape { shape, placement });
                }
            }
        }

        // Build the group container around the members' bounds.
        let bounds = members
            .iter()
            .filter_map(|m| self.shape(*m).map(Shape::bounds))
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Rect::default());
        // If the anchor's owner was itself dissolved, the group lands where
        // that owner used to be.
        let mut anchor = anchor;
        while let Ownership::Container(cid) = anchor.owner {
            match dissolved.iter().find(|r| r.shape.id() == cid) {
                Some(gone) => anchor = gone.placement,
                None => break,
            }
        }
        let mut container = registry.construct("container", 0.0, 0.0).ok()?;
        if let Some(id) = forced_id {
            container = container.with_id(id);
        }
        container.x = bounds.x - GROUP_MARGIN;
        container.y = bounds.y - GROUP_MARGIN;
        container.width = bounds.width + 2.0 * GROUP_MARGIN;
        container.height = bounds.height + 2.0 * GROUP_MARGIN;
        let container_id = container.id();
        self.shapes.insert(container_id, container);
        self.link(container_id, anchor.owner, anchor.index);
        self.emit(crate::PropertyChange::page(
            self.id(),
            "shapeCreated",
            serde_json::json!(container_id.to_string()),
            serde_json::Value::Null,
        ));

        for &member in &members {
            self.unlink(member);
            let end = self
                .shape(container_id)
                .and_then(|c| c.container_data.as_ref())
                .map(|d| d.children.len())
                .unwrap_or(0);
            self.link(member, Ownership::Container(container_id), end);
        }
        self.dock_layout(container_id);
        self.invalidate();
        Some(GroupOutcome { container: container_id, members, prior, dissolved })
    }

    /// Reverse a `group`: members go back to their prior placements and any
    /// dissolved containers are resurrected.
    pub fn undo_group(&mut self, outcome: &GroupOutcome) {
        // Resurrect dissolved containers first so prior placements resolve.
        for removed in &outcome.dissolved {
            let id = removed.shape.id();
            let mut shape = removed.shape.clone();
            shape.set_ownership(Ownership::Page);
            self.shapes.insert(id, shape);
            self.order.retain(|&s| s != id);
            self.link(id, removed.placement.owner, removed.placement.index);
        }
        // Members back to where they were, ascending index keeps order.
        let mut prior = outcome.prior.clone();
        prior.sort_by_key(|(_, p)| p.index);
        for (member, placement) in prior {
            self.unlink(member);
            self.link(member, placement.owner, placement.index);
        }
        // Drop the now-empty group container.
        self.unlink(outcome.container);
        if let Some(mut shape) = self.shapes.remove(&outcome.container) {
            shape.set_ownership(Ownership::Detached);
        }
        for removed in &outcome.dissolved {
            if removed.shape.container_data.as_ref().map(|d| d.dock != DockMode::None).unwrap_or(false) {
                self.dock_layout(removed.shape.id());
            }
        }
        self.invalidate();
    }

    /// Ungroup containers: children return to the container's owner at the
    /// container's position, preserving their order; the container itself is
    /// removed. Non-containers in the input are skipped.
    pub fn ungroup(&mut self, ids: &[ShapeId]) -> Vec<UngroupOutcome> {
        let mut outcomes = Vec::new();
        for &id in ids {
            let placement = match self.placement(id) {
                Some(p) => p,
                None => continue,
            };
            let children = match self.shape(id).and_then(|s| s.container_data.as_ref()) {
                Some(data) => data.children.clone(),
                None => continue,
            };
            for (offset, &child) in children.iter().enumerate() {
                self.unlink(child);
                self.link(child, placement.owner, placement.index + offset);
            }
            self.unlink(id);
            if let Some(mut shape) = self.shapes.remove(&id) {
                if let Some(data) = shape.container_data.as_mut() {
                    data.children.clear();
                }
                shape.set_ownership(Ownership::Detached);
                self.emit(crate::PropertyChange::page(
                    self.id(),
                    "shapeRemoved",
                    serde_json::json!(id.to_string()),
                    serde_json::Value::Null,
                ));
                outcomes.push(UngroupOutcome { container: RemovedShape { shape, placement }, children });
            }
        }
        if !outcomes.is_empty() {
            self.invalidate();
        }
        outcomes
    }

    /// `break` on a single container: dissolve it, returning children to the
    /// prior scope.
    pub fn break_container(&mut self, id: ShapeId) -> Option<UngroupOutcome> {
        self.ungroup(&[id]).into_iter().next()
    }

    /// Reverse an `ungroup` of one container.
    pub fn undo_ungroup(&mut self, outcome: &UngroupOutcome) {
        let id = outcome.container.shape.id();
        let mut shape = outcome.container.shape.clone();
        shape.set_ownership(Ownership::Page);
        self.shapes.insert(id, shape);
        self.order.retain(|&s| s != id);
        self.link(id, outcome.container.placement.owner, outcome.container.placement.index);
        for (index, &child) in outcome.children.iter().enumerate() {
            self.unlink(child);
            self.link(child, Ownership::Container(id), index);
        }
        self.invalidate();
    }

    /// Recompute a docking container's child positions from scratch.
    ///
    /// The layout is a pure function of child order, container rect, padding
    /// and spacing; it is recomputed whole on every structural change so that
    /// incremental drift cannot accumulate. Children move with their own
    /// subtrees.
    pub fn dock_layout(&mut self, container_id: ShapeId) {
        let (dock, align, padding, spacing, bounds, children) = match self
            .shape(container_id)
            .and_then(|s| s.container_data.as_ref().map(|d| (s.bounds(), d)))
        {
            Some((bounds, data)) if data.dock != DockMode::None => (
                data.dock,
                data.align,
                data.padding,
                data.spacing,
                bounds,
                data.children.clone(),
            ),
            _ => return,
        };

        let mut cursor = match dock {
            DockMode::Horizontal => bounds.x + padding,
            DockMode::Vertical => bounds.y + padding,
            DockMode::None => unreachable!(),
        };
        for child in children {
            let (cw, ch, cx, cy) = match self.shape(child) {
                Some(s) => (s.width, s.height, s.x, s.y),
                None => continue,
            };
            let (target_x, target_y) = match dock {
                DockMode::Horizontal => {
                    let y = match align {
                        DockAlign::Start => bounds.y + padding,
                        DockAlign::Middle => bounds.y + (bounds.height - ch) / 2.0,
                        DockAlign::End => bounds.y + bounds.height - padding - ch,
                    };
                    let x = cursor;
                    cursor += cw + spacing;
                    (x, y)
                }
                DockMode::Vertical => {
                    let x = match align {
                        DockAlign::Start => bounds.x + padding,
                        DockAlign::Middle => bounds.x + (bounds.width - cw) / 2.0,
                        DockAlign::End => bounds.x + bounds.width - padding - cw,
                    };
                    let y = cursor;
                    cursor += ch + spacing;
                    (x, y)
                }
                DockMode::None => unreachable!(),
            };
            let (dx, dy) = (target_x - cx, target_y - cy);
            if dx != 0.0 || dy != 0.0 {
                let mut subtree = vec![child];
                subtree.extend(self.descendants(child));
                for target in subtree {
                    self.shift_emitting(target, dx, dy);
                }
            }
        }
    }
}
