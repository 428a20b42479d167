//! Pointer gesture sessions: drag, resize, rotate
//!
//! A session holds the pre-gesture geometry of every shape it may touch and
//! applies pointer deltas directly to the page. Only on pointer-up does it
//! commit, producing one property command for the history stack; cancelling
//! restores the saved geometry and leaves no history entry.

use crate::{PropertyDelta, SetPropertiesCommand};
use geometry::{clamp_dimension, Point, Rect};
use scene_model::{MethodKey, ModeManager, Page, Shape, ShapeId};
use serde_json::json;
use std::collections::HashSet;

/// Which resize handle is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

#[derive(Debug, Clone, Copy)]
enum GestureKind {
    Move,
    Resize(ResizeHandle),
    Rotate,
}

/// An in-progress pointer gesture. All coordinates are page coordinates.
pub struct GestureSession {
    kind: GestureKind,
    /// Shapes the gesture drives directly. For resize/rotate this is exactly
    /// one shape: the owner of the active handle.
    targets: Vec<ShapeId>,
    /// Pre-gesture geometry of everything the gesture may disturb.
    saved: Vec<(ShapeId, serde_json::Map<String, serde_json::Value>)>,
    origin: Point,
    last: Point,
    start_bounds: Rect,
    start_rotation: f64,
}

impl GestureSession {
    /// Begin dragging the focused set. Shapes whose ancestor is also in the
    /// set are excluded so a container and its selected descendant never both
    /// apply the same delta; shapes the mode forbids moving are skipped.
    /// Returns `None` when nothing is draggable.
    pub fn begin_move(
        page: &Page,
        modes: &ModeManager,
        focused: &[ShapeId],
        pointer: Point,
    ) -> Option<Self> {
        let set: HashSet<ShapeId> = focused.iter().copied().collect();
        let targets: Vec<ShapeId> = focused
            .iter()
            .copied()
            .filter(|&id| {
                page.shape(id)
                    .map(|s| modes.capability(page.mode(), s, MethodKey::Moveable))
                    .unwrap_or(false)
            })
            .filter(|&id| !set.iter().any(|&other| other != id && page.is_ancestor(other, id)))
            .collect();
        if targets.is_empty() {
            return None;
        }
        let saved = save_affected(page, &targets);
        Some(Self {
            kind: GestureKind::Move,
            targets,
            saved,
            origin: pointer,
            last: pointer,
            start_bounds: Rect::default(),
            start_rotation: 0.0,
        })
    }

    /// Begin resizing via a handle. Resize authority belongs solely to the
    /// handle's owner; descendants follow through layout, never directly.
    pub fn begin_resize(
        page: &Page,
        modes: &ModeManager,
        owner: ShapeId,
        handle: ResizeHandle,
        pointer: Point,
    ) -> Option<Self> {
        let shape = page.shape(owner)?;
        if !modes.capability(page.mode(), shape, MethodKey::Resizeable) {
            return None;
        }
        let start_bounds = shape.bounds();
        let saved = save_affected(page, &[owner]);
        Some(Self {
            kind: GestureKind::Resize(handle),
            targets: vec![owner],
            saved,
            origin: pointer,
            last: pointer,
            start_bounds,
            start_rotation: 0.0,
        })
    }

    /// Begin rotating a shape around its center.
    pub fn begin_rotate(
        page: &Page,
        modes: &ModeManager,
        owner: ShapeId,
        pointer: Point,
    ) -> Option<Self> {
        let shape = page.shape(owner)?;
        if !modes.capability(page.mode(), shape, MethodKey::Rotatable) {
            return None;
        }
        let start_bounds = shape.bounds();
        let start_rotation = shape.rotation;
        let saved = save_affected(page, &[owner]);
        Some(Self {
            kind: GestureKind::Rotate,
            targets: vec![owner],
            saved,
            origin: pointer,
            last: pointer,
            start_bounds,
            start_rotation,
        })
    }

    /// Feed a pointer-move. Mutations are applied immediately; nothing is
    /// recorded in history until `finish`.
    pub fn update(&mut self, page: &mut Page, pointer: Point) {
        match self.kind {
            GestureKind::Move => {
                let dx = pointer.x - self.last.x;
                let dy = pointer.y - self.last.y;
                for &target in &self.targets {
                    page.move_shape_by(target, dx, dy);
                }
            }
            GestureKind::Resize(handle) => {
                let target = self.targets[0];
                let dx = pointer.x - self.origin.x;
                let dy = pointer.y - self.origin.y;
                let rect = resized_rect(self.start_bounds, handle, dx, dy);
                let _ = page.set_property(target, "x", &json!(rect.x));
                let _ = page.set_property(target, "y", &json!(rect.y));
                page.resize_shape(target, rect.width, rect.height);
            }
            GestureKind::Rotate => {
                let target = self.targets[0];
                let center = self.start_bounds.center();
                // A pointer at the exact center gives no usable angle; hold
                // the current rotation instead of propagating NaN.
                if pointer.distance_to(&center) < 1e-9 || self.origin.distance_to(&center) < 1e-9 {
                    self.last = pointer;
                    return;
                }
                let to_deg = |p: Point| (p.y - center.y).atan2(p.x - center.x).to_degrees();
                let angle = self.start_rotation + to_deg(pointer) - to_deg(self.origin);
                let _ = page.set_property(target, "rotation", &json!(angle));
            }
        }
        self.last = pointer;
    }

    /// Commit the gesture: one property command covering everything that
    /// actually changed, or `None` for a gesture that ended where it began.
    pub fn finish(self, page: &Page) -> Option<SetPropertiesCommand> {
        let deltas: Vec<PropertyDelta> = self
            .saved
            .into_iter()
            .filter_map(|(id, before)| {
                let shape = page.shape(id)?;
                let after = shape.snapshot(&Shape::GEOMETRY_KEYS);
                if after == before {
                    None
                } else {
                    Some(PropertyDelta { id, before, after })
                }
            })
            .collect();
        if deltas.is_empty() {
            None
        } else {
            Some(SetPropertiesCommand::from_deltas(deltas))
        }
    }

    /// Abort the gesture, restoring every saved shape to its pre-gesture
    /// geometry. No history entry results.
    pub fn cancel(self, page: &mut Page) {
        for (id, before) in self.saved.iter().rev() {
            for (key, value) in before {
                let _ = page.set_property(*id, key, value);
            }
        }
    }
}

/// Snapshot the geometry of the targets, their subtrees, and the subtrees of
/// any docking parent (whose other children may reflow).
fn save_affected(
    page: &Page,
    targets: &[ShapeId],
) -> Vec<(ShapeId, serde_json::Map<String, serde_json::Value>)> {
    let mut ids: Vec<ShapeId> = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |id: ShapeId, ids: &mut Vec<ShapeId>| {
        if seen.insert(id) {
            ids.push(id);
        }
    };
    for &target in targets {
        push(target, &mut ids);
        for d in page.descendants(target) {
            push(d, &mut ids);
        }
        if let Some(parent) = page.shape(target).and_then(|s| s.container()) {
            push(parent, &mut ids);
            for d in page.descendants(parent) {
                push(d, &mut ids);
            }
        }
    }
    ids.into_iter()
        .filter_map(|id| page.shape(id).map(|s| (id, s.snapshot(&Shape::GEOMETRY_KEYS))))
        .collect()
}

fn resized_rect(start: Rect, handle: ResizeHandle, dx: f64, dy: f64) -> Rect {
    let mut x = start.x;
    let mut y = start.y;
    let mut w = start.width;
    let mut h = start.height;
    let west = matches!(handle, ResizeHandle::W | ResizeHandle::Nw | ResizeHandle::Sw);
    let east = matches!(handle, ResizeHandle::E | ResizeHandle::Ne | ResizeHandle::Se);
    let north = matches!(handle, ResizeHandle::N | ResizeHandle::Ne | ResizeHandle::Nw);
    let south = matches!(handle, ResizeHandle::S | ResizeHandle::Se | ResizeHandle::Sw);
    if east {
        w += dx;
    }
    if west {
        x += dx;
        w -= dx;
    }
    if south {
        h += dy;
    }
    if north {
        y += dy;
        h -= dy;
    }
    // Collapse to the anchored edge instead of going negative.
    if w < 0.0 {
        if west {
            x += w;
        }
        w = 0.0;
    }
    if h < 0.0 {
        if north {
            y += h;
        }
        h = 0.0;
    }
    Rect::new(x, y, clamp_dimension(w), clamp_dimension(h))
}
