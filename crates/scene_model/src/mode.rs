//! Per-mode behavior overrides
//!
//! A page is always in one editing mode; the mode manager lets hosts swap
//! the answer to "can this shape be dragged/resized/selected?" or the click
//! handler per `(mode, kind, method)` without subclassing shape kinds.
//! Resolution looks up the exact kind first and falls back to the shape's own
//! capabilities when no override is registered.

use crate::{Page, Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The editing mode a page is in. Drives override resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// Full authoring: everything interactive.
    #[default]
    Configuration,
    /// Execution/preview: structure is read-only by default.
    Runtime,
    /// Pure display, e.g. an embedded read-only view.
    Display,
}

impl std::fmt::Display for PageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PageMode::Configuration => "configuration",
            PageMode::Runtime => "runtime",
            PageMode::Display => "display",
        };
        write!(f, "{name}")
    }
}

/// The overridable methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKey {
    Moveable,
    Resizeable,
    Rotatable,
    Selectable,
    Deletable,
    Click,
}

/// Handler signature for overridden interaction methods.
pub type ClickHandler = fn(&mut Page, ShapeId);

/// What an override substitutes for the shape's own behavior.
#[derive(Clone, Copy)]
pub enum MethodOverride {
    /// Replace a capability answer with a fixed value.
    Capability(bool),
    /// Replace the click handler.
    Handler(ClickHandler),
}

/// The override table, keyed by `(mode, kind, method)`.
#[derive(Default)]
pub struct ModeManager {
    table: HashMap<(PageMode, String, MethodKey), MethodOverride>,
}

impl ModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with the stock policy: in runtime and display modes shapes
    /// are frozen (no move/resize/rotate/delete); display mode also disables
    /// selection for every built-in kind.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        let frozen = [
            MethodKey::Moveable,
            MethodKey::Resizeable,
            MethodKey::Rotatable,
            MethodKey::Deletable,
        ];
        for kind in ["rectangle", "circle", "text", "container", "dock_container", "connector"] {
            for method in frozen {
                manager.register(PageMode::Runtime, kind, method, MethodOverride::Capability(false));
                manager.register(PageMode::Display, kind, method, MethodOverride::Capability(false));
            }
            manager.register(
                PageMode::Display,
                kind,
                MethodKey::Selectable,
                MethodOverride::Capability(false),
            );
        }
        manager
    }

    pub fn register(
        &mut self,
        mode: PageMode,
        kind: impl Into<String>,
        method: MethodKey,
        replacement: MethodOverride,
    ) {
        self.table.insert((mode, kind.into(), method), replacement);
    }

    pub fn resolve(&self, mode: PageMode, kind: &str, method: MethodKey) -> Option<&MethodOverride> {
        self.table.get(&(mode, kind.to_string(), method))
    }

    /// Answer a capability question for a shape under a mode: the override
    /// wins if present, otherwise the shape's own flag.
    pub fn capability(&self, mode: PageMode, shape: &Shape, method: MethodKey) -> bool {
        if let Some(MethodOverride::Capability(value)) = self.resolve(mode, shape.kind(), method) {
            return *value;
        }
        match method {
            MethodKey::Moveable => shape.caps.moveable,
            MethodKey::Resizeable => shape.caps.resizeable,
            MethodKey::Rotatable => shape.caps.rotatable,
            MethodKey::Selectable => shape.caps.selectable,
            MethodKey::Deletable => shape.caps.deletable,
            MethodKey::Click => true,
        }
    }

    /// The click handler override for a shape under a mode, if any.
    pub fn click_handler(&self, mode: PageMode, kind: &str) -> Option<ClickHandler> {
        match self.resolve(mode, kind, MethodKey::Click) {
            Some(MethodOverride::Handler(handler)) => Some(*handler),
            _ => None,
        }
    }
}
