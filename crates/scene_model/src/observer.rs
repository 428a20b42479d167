//! The change-observation seam
//!
//! Every tracked mutation in the scene model reports through an injected
//! [`ChangeObserver`]. This is the single channel by which external consumers
//! (event batching, audit logs, replication bridges) see state changes; any
//! code path that mutates a tracked property without reporting here is a bug.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

/// What level of the document a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeScope {
    Graph,
    Page,
    Shape,
}

/// A single observed mutation: one property on one object, with the value
/// before and after. Multiple changes for the same id may occur within one
/// synchronous turn; consumers must tolerate that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub scope: ChangeScope,
    /// String form of the owning id (shape, page or graph UUID).
    pub id: String,
    pub property: String,
    pub value: Value,
    pub pre_value: Value,
}

impl PropertyChange {
    pub fn shape(id: impl ToString, property: impl Into<String>, value: Value, pre_value: Value) -> Self {
        Self {
            scope: ChangeScope::Shape,
            id: id.to_string(),
            property: property.into(),
            value,
            pre_value,
        }
    }

    pub fn page(id: impl ToString, property: impl Into<String>, value: Value, pre_value: Value) -> Self {
        Self {
            scope: ChangeScope::Page,
            id: id.to_string(),
            property: property.into(),
            value,
            pre_value,
        }
    }

    pub fn graph(id: impl ToString, property: impl Into<String>, value: Value, pre_value: Value) -> Self {
        Self {
            scope: ChangeScope::Graph,
            id: id.to_string(),
            property: property.into(),
            value,
            pre_value,
        }
    }
}

/// Sink for observed mutations. Implementations use interior mutability; the
/// engine is single-threaded so `Rc` handles are sufficient.
pub trait ChangeObserver {
    fn changed(&self, change: PropertyChange);
}

/// Shared observer handle installed on pages and the graph.
pub type ObserverHandle = Rc<dyn ChangeObserver>;
