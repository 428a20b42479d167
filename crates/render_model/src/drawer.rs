//! Drawers: the rendering strategy bound to a shape kind
//!
//! A drawer answers "how is this kind painted" separately from what the
//! shape is. Kinds resolve through a registry map built at registration
//! time; unknown kinds fall back to a plain rectangle outline.

use crate::{DisplayList, HitRegion, RenderItem, Theme};
use scene_model::Shape;
use std::collections::HashMap;
use std::rc::Rc;

/// Paints one shape kind into the display list.
pub trait Drawer {
    fn draw(&self, shape: &Shape, theme: &Theme, list: &mut DisplayList);

    /// Hit regions for the shape, regenerated each frame. Most kinds have
    /// none.
    fn regions(&self, _shape: &Shape) -> Vec<HitRegion> {
        Vec::new()
    }
}

fn text_item(shape: &Shape) -> Option<RenderItem> {
    if shape.text.is_empty() {
        return None;
    }
    Some(RenderItem::Text {
        bounds: shape.bounds(),
        rotation: shape.rotation,
        text: shape.text.clone(),
        color: shape.style.font_color,
        font_size: shape.style.font_size,
    })
}

/// Filled, stroked rectangle with centered text.
pub struct RectangleDrawer;

impl Drawer for RectangleDrawer {
    fn draw(&self, shape: &Shape, _theme: &Theme, list: &mut DisplayList) {
        list.push(RenderItem::Rectangle {
            bounds: shape.bounds(),
            rotation: shape.rotation,
            fill: Some(shape.style.back_color),
            stroke: Some(shape.style.border_color),
            stroke_width: shape.style.line_width,
            dashed: shape.style.dashed,
        });
        if let Some(text) = text_item(shape) {
            list.push(text);
        }
    }
}

/// Ellipse inscribed in the shape bounds.
pub struct EllipseDrawer;

impl Drawer for EllipseDrawer {
    fn draw(&self, shape: &Shape, _theme: &Theme, list: &mut DisplayList) {
        list.push(RenderItem::Ellipse {
            bounds: shape.bounds(),
            rotation: shape.rotation,
            fill: Some(shape.style.back_color),
            stroke: Some(shape.style.border_color),
            stroke_width: shape.style.line_width,
        });
        if let Some(text) = text_item(shape) {
            list.push(text);
        }
    }
}

/// Borderless text run.
pub struct TextDrawer;

impl Drawer for TextDrawer {
    fn draw(&self, shape: &Shape, _theme: &Theme, list: &mut DisplayList) {
        if let Some(text) = text_item(shape) {
            list.push(text);
        }
    }
}

/// Container frame. Children paint through their own drawers after it.
pub struct ContainerDrawer;

impl Drawer for ContainerDrawer {
    fn draw(&self, shape: &Shape, theme: &Theme, list: &mut DisplayList) {
        list.push(RenderItem::Rectangle {
            bounds: shape.bounds(),
            rotation: shape.rotation,
            fill: Some(theme.container_fill),
            stroke: Some(theme.container_outline),
            stroke_width: shape.style.line_width,
            dashed: true,
        });
        if let Some(text) = text_item(shape) {
            list.push(text);
        }
    }
}

/// Connector route polyline.
pub struct ConnectorDrawer;

impl Drawer for ConnectorDrawer {
    fn draw(&self, shape: &Shape, _theme: &Theme, list: &mut DisplayList) {
        let points = match &shape.connector_data {
            Some(data) if data.path.len() >= 2 => data.path.clone(),
            _ => return,
        };
        list.push(RenderItem::Polyline {
            points,
            color: shape.style.border_color,
            width: shape.style.line_width,
            dashed: shape.style.dashed,
        });
    }
}

/// Map from shape kind to its drawer, resolved at registration time.
pub struct DrawerRegistry {
    drawers: HashMap<String, Rc<dyn Drawer>>,
    fallback: Rc<dyn Drawer>,
}

impl DrawerRegistry {
    pub fn empty() -> Self {
        Self { drawers: HashMap::new(), fallback: Rc::new(RectangleDrawer) }
    }

    /// Registry covering the built-in kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("rectangle", Rc::new(RectangleDrawer));
        registry.register("circle", Rc::new(EllipseDrawer));
        registry.register("text", Rc::new(TextDrawer));
        registry.register("container", Rc::new(ContainerDrawer));
        registry.register("dock_container", Rc::new(ContainerDrawer));
        registry.register("connector", Rc::new(ConnectorDrawer));
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, drawer: Rc<dyn Drawer>) {
        let kind = kind.into();
        if self.drawers.insert(kind.clone(), drawer).is_some() {
            tracing::warn!(kind, "replacing registered drawer");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.drawers.contains_key(kind)
    }

    /// Drawer for a kind, falling back to the rectangle drawer.
    pub fn resolve(&self, kind: &str) -> Rc<dyn Drawer> {
        match self.drawers.get(kind) {
            Some(drawer) => Rc::clone(drawer),
            None => {
                tracing::debug!(kind, "no drawer registered, using fallback");
                Rc::clone(&self.fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_drawer_emits_fill_and_text() {
        let mut shape = Shape::new("rectangle", 0.0, 0.0, 100.0, 50.0);
        shape.text = "node".into();
        let mut list = DisplayList::new();
        RectangleDrawer.draw(&shape, &Theme::default(), &mut list);
        assert_eq!(list.len(), 2);
        assert!(matches!(list.items[0], RenderItem::Rectangle { .. }));
        assert!(matches!(list.items[1], RenderItem::Text { .. }));
    }

    #[test]
    fn test_connector_drawer_skips_unrouted() {
        let mut shape = Shape::new("connector", 0.0, 0.0, 0.0, 0.0);
        shape.connector_data = Some(Default::default());
        let mut list = DisplayList::new();
        ConnectorDrawer.draw(&shape, &Theme::default(), &mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let registry = DrawerRegistry::with_defaults();
        let shape = Shape::new("mystery", 0.0, 0.0, 10.0, 10.0);
        let mut list = DisplayList::new();
        registry.resolve("mystery").draw(&shape, &Theme::default(), &mut list);
        assert!(matches!(list.items[0], RenderItem::Rectangle { .. }));
    }
}
