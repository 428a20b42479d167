//! Change events

use chrono::{DateTime, Utc};
use scene_model::{ChangeScope, PropertyChange};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observed mutation, stamped at observation time. The wire form of
/// [`PropertyChange`] for external consumers (UI sync, audit logs,
/// replication).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub scope: ChangeScope,
    pub id: String,
    pub property: String,
    pub value: Value,
    pub pre_value: Value,
    pub at: DateTime<Utc>,
}

impl From<PropertyChange> for ChangeEvent {
    fn from(change: PropertyChange) -> Self {
        Self {
            scope: change.scope,
            id: change.id,
            property: change.property,
            value: change.value,
            pre_value: change.pre_value,
            at: Utc::now(),
        }
    }
}
