//! The scene-graph node: geometry, style, ownership and tracked properties
//!
//! A [`Shape`] is data plus a kind tag; kind-specific behavior lives in the
//! registry (construction hooks, child policies) and in the drawer bound to
//! the kind at render time. Shapes hold no references to their page or to
//! other shapes; all cross-links are ids resolved through the page arena.

use crate::{Color, Result, SceneError, ShapeId, ShapeStyle};
use geometry::{clamp_dimension, Direction, Point, Rect};
use serde_json::{json, Map, Value};

/// Who currently owns a shape.
///
/// A shape belongs to exactly one owner at a time: the page, a container on
/// that page, or nothing (`Detached`, after removal). Operations on detached
/// shapes are no-ops rather than errors so that stale handles cannot crash an
/// interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Page,
    Container(ShapeId),
    Detached,
}

/// Capability flags controlling which interactions a shape participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub serializable: bool,
    pub moveable: bool,
    pub resizeable: bool,
    pub rotatable: bool,
    pub selectable: bool,
    pub deletable: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            serializable: true,
            moveable: true,
            resizeable: true,
            rotatable: true,
            selectable: true,
            deletable: true,
        }
    }
}

/// Horizontal or vertical auto-layout for docking containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// Cross-axis alignment for docked children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DockAlign {
    #[default]
    Start,
    Middle,
    End,
}

/// Child bookkeeping for container shapes. Child order doubles as z-order,
/// first child painted first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerData {
    pub children: Vec<ShapeId>,
    pub dock: DockMode,
    pub align: DockAlign,
    pub padding: f64,
    pub spacing: f64,
}

/// One end of a connector: the shape it attaches to and the side it leaves
/// from.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub shape: ShapeId,
    pub direction: Direction,
}

/// Connector endpoints plus the last computed route. The route is derived
/// state, recomputed by `follow` from current endpoint geometry, and is never
/// serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorData {
    pub from: Option<Endpoint>,
    pub to: Option<Endpoint>,
    pub path: Vec<Point>,
}

/// A positioned, styled node in the editor's scene graph.
#[derive(Debug, Clone)]
pub struct Shape {
    id: ShapeId,
    kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub style: ShapeStyle,
    pub text: String,
    pub visible: bool,
    pub caps: Capabilities,
    ownership: Ownership,
    selected: bool,
    /// Kind-specific fields carried opaquely for plugin kinds.
    pub data: Map<String, Value>,
    pub container_data: Option<ContainerData>,
    pub connector_data: Option<ConnectorData>,
}

impl Shape {
    /// Create a shape of the given kind at a position. Size and capabilities
    /// come from the registry descriptor; this is the raw constructor it uses.
    pub fn new(kind: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: ShapeId::new(),
            kind: kind.into(),
            x,
            y,
            width: clamp_dimension(width),
            height: clamp_dimension(height),
            rotation: 0.0,
            style: ShapeStyle::default(),
            text: String::new(),
            visible: true,
            caps: Capabilities::default(),
            ownership: Ownership::Page,
            selected: false,
            data: Map::new(),
            container_data: None,
            connector_data: None,
        }
    }

    /// Rebuild a shape with a known id (deserialization, undo restore).
    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// The owning container id, if any.
    pub fn container(&self) -> Option<ShapeId> {
        match self.ownership {
            Ownership::Container(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.ownership == Ownership::Detached
    }

    pub fn is_container(&self) -> bool {
        self.container_data.is_some()
    }

    pub fn is_connector(&self) -> bool {
        self.connector_data.is_some()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    /// Move the origin by a delta. No-op when detached or not moveable.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        if self.is_detached() || !self.caps.moveable {
            return;
        }
        self.x += dx;
        self.y += dy;
    }

    /// Set an absolute size, clamped to non-negative. No-op when detached or
    /// not resizeable.
    pub fn resize(&mut self, width: f64, height: f64) {
        if self.is_detached() || !self.caps.resizeable {
            return;
        }
        self.width = clamp_dimension(width);
        self.height = clamp_dimension(height);
    }

    /// Whether a page-coordinate point hits this shape, honoring rotation.
    pub fn hit_by(&self, p: Point) -> bool {
        if !self.visible {
            return false;
        }
        if let Some(conn) = &self.connector_data {
            return hit_polyline(&conn.path, p, 4.0);
        }
        self.bounds().contains_rotated(p, self.rotation)
    }

    // ------------------------------------------------------------------
    // Tracked property access
    //
    // Commands snapshot and change events report tracked properties by
    // string key; these two accessors are the uniform entry points.
    // ------------------------------------------------------------------

    /// Read a tracked property. Unknown keys fall back to the kind-specific
    /// data bag; a missing data key reads as `null` so that snapshots of new
    /// keys still invert cleanly.
    pub fn tracked_value(&self, key: &str) -> Value {
        match key {
            "x" => json!(self.x),
            "y" => json!(self.y),
            "width" => json!(self.width),
            "height" => json!(self.height),
            "rotation" => json!(self.rotation),
            "text" => json!(self.text),
            "visible" => json!(self.visible),
            "container" => match self.ownership {
                Ownership::Container(id) => json!(id.to_string()),
                Ownership::Page => json!(""),
                Ownership::Detached => Value::Null,
            },
            "borderColor" => json!(self.style.border_color.to_hex()),
            "backColor" => json!(self.style.back_color.to_hex()),
            "fontColor" => json!(self.style.font_color.to_hex()),
            "fontSize" => json!(self.style.font_size),
            "lineWidth" => json!(self.style.line_width),
            "dashed" => json!(self.style.dashed),
            other => self.data.get(other).cloned().unwrap_or(Value::Null),
        }
    }

    /// Write a tracked property. Geometry writes clamp exactly as the typed
    /// setters do; ownership ("container") is not writable through here, it
    /// only changes through page-level attach/detach.
    pub fn apply_tracked(&mut self, key: &str, value: &Value) -> Result<()> {
        if self.is_detached() {
            return Ok(());
        }
        match key {
            "x" => self.x = number(key, value)?,
            "y" => self.y = number(key, value)?,
            "width" => self.width = clamp_dimension(number(key, value)?),
            "height" => self.height = clamp_dimension(number(key, value)?),
            "rotation" => self.rotation = number(key, value)?,
            "text" => {
                self.text = value
                    .as_str()
                    .ok_or_else(|| SceneError::InvalidOperation(format!("text expects a string, got {value}")))?
                    .to_string();
            }
            "visible" => {
                self.visible = value
                    .as_bool()
                    .ok_or_else(|| SceneError::InvalidOperation(format!("visible expects a bool, got {value}")))?;
            }
            "container" => {
                return Err(SceneError::InvalidOperation(
                    "container is changed through attach/detach, not property writes".into(),
                ));
            }
            "borderColor" => self.style.border_color = color(key, value)?,
            "backColor" => self.style.back_color = color(key, value)?,
            "fontColor" => self.style.font_color = color(key, value)?,
            "fontSize" => self.style.font_size = number(key, value)?,
            "lineWidth" => self.style.line_width = number(key, value)?,
            "dashed" => {
                self.style.dashed = value
                    .as_bool()
                    .ok_or_else(|| SceneError::InvalidOperation(format!("dashed expects a bool, got {value}")))?;
            }
            other => {
                if value.is_null() {
                    self.data.remove(other);
                } else {
                    self.data.insert(other.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Snapshot the listed tracked properties into a map.
    pub fn snapshot(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter().map(|k| ((*k).to_string(), self.tracked_value(k))).collect()
    }

    /// The geometry keys every move/resize/rotate gesture touches.
    pub const GEOMETRY_KEYS: [&'static str; 5] = ["x", "y", "width", "height", "rotation"];
}

fn number(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SceneError::InvalidOperation(format!("{key} expects a finite number, got {value}")))
}

fn color(key: &str, value: &Value) -> Result<Color> {
    value
        .as_str()
        .and_then(Color::from_hex)
        .ok_or_else(|| SceneError::InvalidOperation(format!("{key} expects a hex color, got {value}")))
}

/// Distance-based hit test along a polyline, used for connectors.
fn hit_polyline(path: &[Point], p: Point, tolerance: f64) -> bool {
    path.windows(2).any(|seg| segment_distance(seg[0], seg[1], p) <= tolerance)
}

fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len_sq == 0.0 {
        return a.distance_to(&p);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    proj.distance_to(&p)
}
