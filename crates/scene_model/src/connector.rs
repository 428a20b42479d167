//! Connector attachment and routing
//!
//! A connector is a shape whose geometry is derived: `follow` recomputes its
//! route from the current geometry of its endpoint shapes. The route is a
//! pure function of that geometry, so calling `follow` twice without an
//! intervening change yields identical coordinates. Routing runs as a
//! render-phase pass (`follow_all`) after all geometry changes of a frame.

use crate::{Endpoint, Page, PropertyChange, ShapeId};
use geometry::{Direction, Point, Rect};
use serde_json::{json, Value};

impl Page {
    /// Attach the source end of a connector to a shape side. Refused as a
    /// no-op when the connector or the target does not exist.
    pub fn connect_from(&mut self, connector: ShapeId, target: ShapeId, direction: Direction) -> bool {
        self.connect_end(connector, target, direction, true)
    }

    /// Attach the destination end of a connector to a shape side.
    pub fn connect_to(&mut self, connector: ShapeId, target: ShapeId, direction: Direction) -> bool {
        self.connect_end(connector, target, direction, false)
    }

    fn connect_end(&mut self, connector: ShapeId, target: ShapeId, direction: Direction, from: bool) -> bool {
        if !self.contains_shape(target) || connector == target {
            tracing::debug!(connector = %connector, target = %target, "connect refused: target missing");
            return false;
        }
        let endpoint = Endpoint { shape: target, direction };
        let (pre, property) = match self.shape_mut(connector).and_then(|s| s.connector_data.as_mut()) {
            Some(data) => {
                let slot = if from { &mut data.from } else { &mut data.to };
                let pre = endpoint_json(*slot);
                *slot = Some(endpoint);
                (pre, if from { "connectFrom" } else { "connectTo" })
            }
            None => return false,
        };
        self.emit(PropertyChange::shape(connector, property, endpoint_json(Some(endpoint)), pre));
        self.follow_connector(connector);
        self.invalidate();
        true
    }

    /// Recompute one connector's route from its endpoints' current geometry.
    /// Free (unattached) ends keep their last routed position.
    pub fn follow_connector(&mut self, id: ShapeId) {
        let data = match self.shape(id).and_then(|s| s.connector_data.as_ref()) {
            Some(d) => d.clone(),
            None => return,
        };
        let from_point = self.endpoint_position(data.from, data.path.first().copied());
        let to_point = self.endpoint_position(data.to, data.path.last().copied());
        let (from_point, to_point) = match (from_point, to_point) {
            (Some(f), Some(t)) => (f, t),
            _ => return,
        };
        let path = route(from_point, to_point, data.from.map(|e| e.direction));
        let bounds = Rect::bounding(&path);
        if let Some(shape) = self.shape_mut(id) {
            // Derived geometry: updated in place without change events, the
            // endpoints' own moves already carry the frame's mutations.
            shape.x = bounds.x;
            shape.y = bounds.y;
            shape.width = bounds.width;
            shape.height = bounds.height;
            if let Some(data) = shape.connector_data.as_mut() {
                data.path = path;
            }
        }
    }

    fn endpoint_position(&self, endpoint: Option<Endpoint>, fallback: Option<Point>) -> Option<Point> {
        match endpoint {
            Some(e) => {
                let shape = self.shape(e.shape)?;
                Some(e.direction.attachment_point(&shape.bounds(), shape.rotation))
            }
            None => fallback,
        }
    }

    /// The render-phase routing pass: re-route every connector on the page.
    pub fn follow_all(&mut self) {
        let connectors: Vec<ShapeId> = self
            .shapes
            .values()
            .filter(|s| s.is_connector())
            .map(|s| s.id())
            .collect();
        for id in connectors {
            self.follow_connector(id);
        }
    }
}

fn endpoint_json(endpoint: Option<Endpoint>) -> Value {
    match endpoint {
        Some(e) => json!({ "shape": e.shape.to_string(), "direction": e.direction }),
        None => Value::Null,
    }
}

/// Orthogonal elbow route between two attachment points. Horizontal exits
/// break at the midpoint x, vertical exits at the midpoint y; unattached
/// sources fall back to a straight segment.
fn route(from: Point, to: Point, from_direction: Option<Direction>) -> Vec<Point> {
    match from_direction {
        Some(Direction::E) | Some(Direction::W) => {
            let mid_x = (from.x + to.x) / 2.0;
            vec![from, Point::new(mid_x, from.y), Point::new(mid_x, to.y), to]
        }
        Some(Direction::N) | Some(Direction::S) => {
            let mid_y = (from.y + to.y) / 2.0;
            vec![from, Point::new(from.x, mid_y), Point::new(to.x, mid_y), to]
        }
        None => vec![from, to],
    }
}
