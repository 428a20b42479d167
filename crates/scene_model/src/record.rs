//! Serialized shape and page records
//!
//! Records are the wire/persistence form of the scene graph: plain serde
//! structs keyed by stable ids. Deserialization goes back through the kind
//! registry so that loaded shapes get the same construction path as
//! interactively created ones.

use crate::{
    ContainerData, DockAlign, DockMode, Endpoint, PageId, Shape, ShapeId, ShapeStyle,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serialized form of one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    /// Owning container id; `None` means page-level.
    #[serde(default)]
    pub container: Option<ShapeId>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub style: ShapeStyle,
    /// Kind-specific fields, carried opaquely.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Child ids in z-order, present for containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ShapeId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dock: Option<DockMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<DockAlign>,
    /// Connector endpoints, present for connectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Endpoint>,
}

fn default_true() -> bool {
    true
}

impl ShapeRecord {
    /// Snapshot a live shape into its serialized form.
    pub fn from_shape(shape: &Shape) -> Self {
        let (children, dock, align) = match &shape.container_data {
            Some(c) => (Some(c.children.clone()), Some(c.dock), Some(c.align)),
            None => (None, None, None),
        };
        let (from, to) = match &shape.connector_data {
            Some(c) => (c.from, c.to),
            None => (None, None),
        };
        Self {
            id: shape.id(),
            kind: shape.kind().to_string(),
            x: shape.x,
            y: shape.y,
            width: shape.width,
            height: shape.height,
            rotation: shape.rotation,
            container: shape.container(),
            text: shape.text.clone(),
            visible: shape.visible,
            style: shape.style.clone(),
            data: shape.data.clone(),
            children,
            dock,
            align,
            from,
            to,
        }
    }

    /// Overwrite a freshly constructed shape with this record's fields,
    /// preserving the recorded id. Ownership is applied separately by the
    /// page once all shapes of a batch exist.
    pub fn apply_to(&self, shape: &mut Shape) {
        shape.x = self.x;
        shape.y = self.y;
        shape.width = self.width;
        shape.height = self.height;
        shape.rotation = self.rotation;
        shape.text = self.text.clone();
        shape.visible = self.visible;
        shape.style = self.style.clone();
        shape.data = self.data.clone();
        if let Some(children) = &self.children {
            let data = shape.container_data.get_or_insert_with(ContainerData::default);
            data.children = children.clone();
            if let Some(dock) = self.dock {
                data.dock = dock;
            }
            if let Some(align) = self.align {
                data.align = align;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let data = shape.connector_data.get_or_insert_with(Default::default);
            data.from = self.from;
            data.to = self.to;
        }
    }
}

/// Serialized form of a page: its id plus every serializable shape in
/// z-order (page-level order first, container children nested by id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub shapes: Vec<ShapeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_round_trip_json() {
        let mut shape = Shape::new("rectangle", 10.0, 20.0, 100.0, 50.0);
        shape.text = "hello".into();
        shape.data.insert("priority".into(), json!(3));
        let record = ShapeRecord::from_shape(&shape);

        let text = serde_json::to_string(&record).unwrap();
        let back: ShapeRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record, back);
        assert_eq!(back.id, shape.id());
    }

    #[test]
    fn test_record_applies_fields() {
        let shape = {
            let mut s = Shape::new("rectangle", 10.0, 20.0, 100.0, 50.0);
            s.rotation = 45.0;
            s.text = "t".into();
            s
        };
        let record = ShapeRecord::from_shape(&shape);

        let mut fresh = Shape::new("rectangle", 0.0, 0.0, 1.0, 1.0).with_id(record.id);
        record.apply_to(&mut fresh);
        assert_eq!(ShapeRecord::from_shape(&fresh), record);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let id = ShapeId::new();
        let text = format!(
            r#"{{"id":"{id}","kind":"rectangle","x":1.0,"y":2.0,"width":3.0,"height":4.0}}"#
        );
        let record: ShapeRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record.rotation, 0.0);
        assert!(record.visible);
        assert!(record.children.is_none());
        assert!(record.from.is_none());
    }
}
