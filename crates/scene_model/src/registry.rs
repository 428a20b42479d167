//! Shape-kind registry
//!
//! New node kinds (flow states, milestones, …) register a descriptor here;
//! this is the only supported way to add domain-specific shapes. The
//! descriptor carries construction defaults plus a behavior hook object,
//! replacing prototype-chain extension with a lookup table.

use crate::{ConnectorData, ContainerData, DockAlign, DockMode, Result, SceneError, Shape};
use std::collections::HashMap;
use std::rc::Rc;

/// Kind-specific hooks invoked by the engine at well-defined seams.
pub trait ShapeBehavior {
    /// Adjust a freshly constructed shape (capability flags, default data).
    fn init(&self, _shape: &mut Shape) {}

    /// Whether `child` may be added to `container`. Enforced on every add.
    fn child_allowed(&self, _container: &Shape, child: &Shape) -> bool {
        // Connectors track their endpoints and never live inside containers.
        !child.is_connector()
    }
}

/// Default behavior for plain shapes.
pub struct DefaultBehavior;

impl ShapeBehavior for DefaultBehavior {}

struct ConnectorBehavior;

impl ShapeBehavior for ConnectorBehavior {
    fn init(&self, shape: &mut Shape) {
        shape.connector_data = Some(ConnectorData::default());
        shape.caps.resizeable = false;
        shape.caps.rotatable = false;
        shape.caps.moveable = false;
    }
}

/// How a registered kind is constructed.
#[derive(Clone)]
pub struct ShapeDescriptor {
    pub kind: String,
    pub default_width: f64,
    pub default_height: f64,
    /// Containers get child bookkeeping and an optional dock layout.
    pub container: Option<(DockMode, DockAlign)>,
    pub behavior: Rc<dyn ShapeBehavior>,
}

impl ShapeDescriptor {
    pub fn new(kind: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            kind: kind.into(),
            default_width: width,
            default_height: height,
            container: None,
            behavior: Rc::new(DefaultBehavior),
        }
    }

    pub fn container(mut self, dock: DockMode, align: DockAlign) -> Self {
        self.container = Some((dock, align));
        self
    }

    pub fn behavior(mut self, behavior: Rc<dyn ShapeBehavior>) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Registry mapping kind tags to descriptors. One per engine instance.
pub struct ShapeRegistry {
    kinds: HashMap<String, ShapeDescriptor>,
}

impl ShapeRegistry {
    /// An empty registry with no kinds.
    pub fn empty() -> Self {
        Self { kinds: HashMap::new() }
    }

    /// A registry with the built-in kinds: `rectangle`, `circle`, `text`,
    /// `container`, `dock_container` and `connector`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ShapeDescriptor::new("rectangle", 100.0, 60.0));
        registry.register(ShapeDescriptor::new("circle", 80.0, 80.0));
        registry.register(ShapeDescriptor::new("text", 120.0, 24.0));
        registry.register(
            ShapeDescriptor::new("container", 300.0, 200.0)
                .container(DockMode::None, DockAlign::Start),
        );
        registry.register(
            ShapeDescriptor::new("dock_container", 300.0, 200.0)
                .container(DockMode::Horizontal, DockAlign::Middle),
        );
        registry.register(
            ShapeDescriptor::new("connector", 0.0, 0.0).behavior(Rc::new(ConnectorBehavior)),
        );
        registry
    }

    /// Register a kind, replacing any previous descriptor with the same tag.
    pub fn register(&mut self, descriptor: ShapeDescriptor) {
        if self.kinds.contains_key(&descriptor.kind) {
            tracing::warn!(kind = %descriptor.kind, "replacing registered shape kind");
        }
        self.kinds.insert(descriptor.kind.clone(), descriptor);
    }

    pub fn descriptor(&self, kind: &str) -> Option<&ShapeDescriptor> {
        self.kinds.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered kind tags, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Construct a shape of a registered kind at a page position. Fails fast
    /// on unknown kinds; silently dropping them would desync connectors.
    pub fn construct(&self, kind: &str, x: f64, y: f64) -> Result<Shape> {
        let descriptor = self
            .kinds
            .get(kind)
            .ok_or_else(|| SceneError::UnknownKind(kind.to_string()))?;
        let mut shape = Shape::new(
            descriptor.kind.clone(),
            x,
            y,
            descriptor.default_width,
            descriptor.default_height,
        );
        if let Some((dock, align)) = descriptor.container {
            shape.container_data = Some(ContainerData {
                dock,
                align,
                padding: 8.0,
                spacing: 8.0,
                ..Default::default()
            });
        }
        descriptor.behavior.init(&mut shape);
        Ok(shape)
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
