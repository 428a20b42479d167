//! Shape and page ID generation and management

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a shape within a page.
/// Uses UUID v4 for globally unique, stable IDs that survive serialization;
/// connector endpoint resolution on load depends on this stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(Uuid);

impl ShapeId {
    /// Create a new random ShapeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a ShapeId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Create a ShapeId from a string representation
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ShapeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ShapeId> for Uuid {
    fn from(id: ShapeId) -> Self {
        id.0
    }
}

/// Unique identifier for a page within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    /// Create a new random PageId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a PageId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_id_round_trip_string() {
        let id = ShapeId::new();
        let parsed = ShapeId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_shape_id_uniqueness() {
        assert_ne!(ShapeId::new(), ShapeId::new());
    }
}
