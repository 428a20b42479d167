//! Clipboard copy and paste
//!
//! Copy serializes the selected subtrees (plus connectors fully inside the
//! selection) to a JSON payload. Paste parses the payload, mints fresh ids
//! for every shape while rewriting all internal references, offsets the
//! geometry, and inserts the batch through a command so it participates in
//! undo.

use crate::{Command, Result};
use scene_model::{Endpoint, Page, ShapeId, ShapeRecord, ShapeRegistry};
use std::collections::HashMap;

/// Serialize shapes for the clipboard. The payload is self-contained JSON;
/// ids of shapes missing from the page are ignored.
pub fn copy_shapes(page: &Page, ids: &[ShapeId]) -> Result<String> {
    let records = page.serialize_shapes(ids);
    Ok(serde_json::to_string(&records)?)
}

/// Parse a clipboard payload into insertable records: every shape gets a
/// fresh id, container and connector references are rewritten to the new
/// ids, and geometry is offset by `(dx, dy)`. References pointing outside
/// the payload are cleared rather than carried over.
pub fn paste_records(payload: &str, dx: f64, dy: f64) -> Result<Vec<ShapeRecord>> {
    let mut records: Vec<ShapeRecord> = serde_json::from_str(payload)?;
    let mapping: HashMap<ShapeId, ShapeId> =
        records.iter().map(|r| (r.id, ShapeId::new())).collect();
    let remap_endpoint = |endpoint: Option<Endpoint>| {
        endpoint.and_then(|e| {
            mapping.get(&e.shape).map(|&shape| Endpoint { shape, direction: e.direction })
        })
    };
    for record in &mut records {
        record.id = mapping[&record.id];
        record.x += dx;
        record.y += dy;
        record.container = record.container.and_then(|c| mapping.get(&c).copied());
        if let Some(children) = &mut record.children {
            *children = children.iter().filter_map(|c| mapping.get(c).copied()).collect();
        }
        record.from = remap_endpoint(record.from);
        record.to = remap_endpoint(record.to);
    }
    Ok(records)
}

/// Inserts a remapped clipboard batch. Redo replays the same records, so
/// pasted shapes keep their ids across undo/redo cycles.
#[derive(Debug)]
pub struct PasteCommand {
    records: Vec<ShapeRecord>,
    pasted: Vec<ShapeId>,
}

impl PasteCommand {
    pub fn new(records: Vec<ShapeRecord>) -> Self {
        Self { records, pasted: Vec::new() }
    }

    pub fn pasted(&self) -> &[ShapeId] {
        &self.pasted
    }
}

impl Command for PasteCommand {
    fn execute(&mut self, page: &mut Page, registry: &ShapeRegistry) -> Result<bool> {
        self.pasted = page.insert_records(registry, &self.records)?;
        Ok(!self.pasted.is_empty())
    }

    fn undo(&mut self, page: &mut Page, _registry: &ShapeRegistry) -> Result<()> {
        // Reverse insertion order so children go before their containers.
        for &id in self.pasted.iter().rev() {
            if page.contains_shape(id) {
                page.remove_shape(id);
            }
        }
        Ok(())
    }

    fn display_name(&self) -> &str {
        "Paste"
    }
}
