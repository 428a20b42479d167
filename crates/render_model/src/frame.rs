//! The frame pass
//!
//! One call per repaint: route connectors first, then walk the page z-order
//! painting each visible shape through its drawer, then selection adornments
//! on top. Hit regions produced by the drawers are kept for hit-testing and
//! for the animation tick, which repaints only dynamic regions of the active
//! page.

use crate::{DisplayList, DrawerRegistry, RegionSet, RenderItem, Theme};
use geometry::Point;
use scene_model::{Graph, Page, ShapeId};
use std::collections::HashMap;

const HANDLE_SIZE: f64 = 6.0;

pub struct FrameRenderer {
    pub theme: Theme,
    drawers: DrawerRegistry,
    regions: HashMap<ShapeId, RegionSet>,
    phase: f64,
}

impl FrameRenderer {
    pub fn new(drawers: DrawerRegistry) -> Self {
        Self { theme: Theme::default(), drawers, regions: HashMap::new(), phase: 0.0 }
    }

    pub fn drawers(&self) -> &DrawerRegistry {
        &self.drawers
    }

    pub fn drawers_mut(&mut self) -> &mut DrawerRegistry {
        &mut self.drawers
    }

    /// Render one page. Connector routes are recomputed before painting so
    /// they never lag a frame behind their endpoints; the page's repaint
    /// flag is consumed.
    pub fn render_page(&mut self, page: &mut Page) -> DisplayList {
        page.follow_all();
        let mut list = DisplayList::new();
        self.regions.clear();

        for id in page.all_ids() {
            let shape = match page.shape(id) {
                Some(s) if s.visible => s,
                _ => continue,
            };
            let drawer = self.drawers.resolve(shape.kind());
            drawer.draw(shape, &self.theme, &mut list);
            let regions = RegionSet::new(drawer.regions(shape));
            for region in regions.iter() {
                region.draw_static(shape, &self.theme, &mut list);
            }
            self.regions.insert(id, regions);
        }

        for id in page.selection() {
            if let Some(shape) = page.shape(id) {
                self.draw_selection(shape.bounds(), &mut list);
            }
        }

        page.take_dirty();
        list
    }

    /// One animation tick. Only the graph's active page animates; the
    /// returned overlay holds the dynamic region draws for this tick.
    pub fn tick(&mut self, graph: &Graph) -> DisplayList {
        self.phase += 1.0;
        let mut list = DisplayList::new();
        let page = match graph.active_page() {
            Some(p) => p,
            None => return list,
        };
        for (&id, regions) in &self.regions {
            let shape = match page.shape(id) {
                Some(s) if s.visible => s,
                _ => continue,
            };
            for region in regions.iter() {
                region.draw_dynamic(shape, self.phase, &self.theme, &mut list);
            }
        }
        list
    }

    /// The hit region under a page-space point, if the topmost shape there
    /// has one. Regions come from the last rendered frame.
    pub fn region_at<'a>(&'a self, page: &Page, p: Point) -> Option<(ShapeId, &'a str)> {
        let id = page.hit_test(p)?;
        let shape = page.shape(id)?;
        let region = self.regions.get(&id)?.hit_test(shape, p)?;
        Some((id, region.name()))
    }

    /// Dispatch a click to the region under the point. Returns whether a
    /// region handler ran.
    pub fn click(&self, page: &mut Page, p: Point) -> bool {
        let id = match page.hit_test(p) {
            Some(id) => id,
            None => return false,
        };
        let handler = page.shape(id).and_then(|shape| {
            self.regions.get(&id).and_then(|set| set.hit_test(shape, p)).and_then(|r| r.click_handler())
        });
        match handler {
            Some(click) => {
                click(page, id);
                true
            }
            None => false,
        }
    }

    fn draw_selection(&self, bounds: geometry::Rect, list: &mut DisplayList) {
        list.push(RenderItem::Rectangle {
            bounds,
            rotation: 0.0,
            fill: None,
            stroke: Some(self.theme.selection),
            stroke_width: 1.0,
            dashed: true,
        });
        let xs = [bounds.x, bounds.x + bounds.width / 2.0, bounds.x + bounds.width];
        let ys = [bounds.y, bounds.y + bounds.height / 2.0, bounds.y + bounds.height];
        for &x in &xs {
            for &y in &ys {
                if x == xs[1] && y == ys[1] {
                    continue;
                }
                list.push(RenderItem::Handle {
                    x: x - HANDLE_SIZE / 2.0,
                    y: y - HANDLE_SIZE / 2.0,
                    color: self.theme.handle_fill,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_model::ShapeRegistry;
    use serde_json::json;

    fn setup() -> (ShapeRegistry, Page, FrameRenderer) {
        (
            ShapeRegistry::with_defaults(),
            Page::new(),
            FrameRenderer::new(DrawerRegistry::with_defaults()),
        )
    }

    #[test]
    fn test_frame_paints_in_z_order() {
        let (registry, mut page, mut renderer) = setup();
        let bottom = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let top = page.create_shape(&registry, "circle", 50.0, 0.0).unwrap();
        let _ = (bottom, top);

        let list = renderer.render_page(&mut page);
        assert_eq!(list.len(), 2);
        assert!(matches!(list.items[0], RenderItem::Rectangle { .. }));
        assert!(matches!(list.items[1], RenderItem::Ellipse { .. }));
    }

    #[test]
    fn test_invisible_shape_skipped() {
        let (registry, mut page, mut renderer) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        page.set_property(id, "visible", &json!(false)).unwrap();
        assert!(renderer.render_page(&mut page).is_empty());
    }

    #[test]
    fn test_frame_routes_connectors_before_painting() {
        let (registry, mut page, mut renderer) = setup();
        let a = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        let b = page.create_shape(&registry, "rectangle", 300.0, 0.0).unwrap();
        let connector = page.create_shape(&registry, "connector", 0.0, 0.0).unwrap();
        page.connect_from(connector, a, geometry::Direction::E);
        page.connect_to(connector, b, geometry::Direction::W);

        // Move an endpoint without an explicit follow.
        page.move_shape_by(a, 0.0, 80.0);
        let list = renderer.render_page(&mut page);
        let route = list
            .items
            .iter()
            .find_map(|item| match item {
                RenderItem::Polyline { points, .. } => Some(points.clone()),
                _ => None,
            })
            .expect("connector painted");
        // The route starts at the moved endpoint.
        assert_eq!(route[0].y, page.shape(a).unwrap().center().y);
    }

    #[test]
    fn test_selection_draws_handles() {
        let (registry, mut page, mut renderer) = setup();
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        page.select(id);
        let list = renderer.render_page(&mut page);
        let handles = list
            .items
            .iter()
            .filter(|item| matches!(item, RenderItem::Handle { .. }))
            .count();
        assert_eq!(handles, 8);
    }

    #[test]
    fn test_render_consumes_repaint_flag() {
        let (registry, mut page, mut renderer) = setup();
        page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();
        renderer.render_page(&mut page);
        assert!(!page.take_dirty());
    }

    #[test]
    fn test_region_at_reports_topmost_region_after_render() {
        use crate::{Drawer, HitRegion};
        use std::rc::Rc;

        struct BadgedDrawer;
        impl Drawer for BadgedDrawer {
            fn draw(&self, shape: &scene_model::Shape, _theme: &Theme, list: &mut DisplayList) {
                list.push(RenderItem::Rectangle {
                    bounds: shape.bounds(),
                    rotation: shape.rotation,
                    fill: None,
                    stroke: None,
                    stroke_width: 1.0,
                    dashed: false,
                });
            }

            fn regions(&self, _shape: &scene_model::Shape) -> Vec<HitRegion> {
                vec![
                    HitRegion::new(
                        "body",
                        |s| Point::new(s.x, s.y),
                        |s| (s.width, s.height),
                    ),
                    HitRegion::new(
                        "badge",
                        |s| Point::new(s.x + s.width - 16.0, s.y),
                        |_| (16.0, 16.0),
                    )
                    .with_index(5),
                ]
            }
        }

        let registry = ShapeRegistry::with_defaults();
        let mut page = Page::new();
        let mut drawers = DrawerRegistry::empty();
        drawers.register("rectangle", Rc::new(BadgedDrawer));
        let mut renderer = FrameRenderer::new(drawers);
        let id = page.create_shape(&registry, "rectangle", 0.0, 0.0).unwrap();

        // Regions come from the rendered frame; before it, nothing answers.
        assert!(renderer.region_at(&page, Point::new(10.0, 10.0)).is_none());

        renderer.render_page(&mut page);
        assert_eq!(renderer.region_at(&page, Point::new(10.0, 10.0)), Some((id, "body")));
        assert_eq!(renderer.region_at(&page, Point::new(95.0, 5.0)), Some((id, "badge")));
        assert_eq!(renderer.region_at(&page, Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_tick_animates_active_page_only() {
        let (_, _, mut renderer) = setup();
        let graph = Graph::new();
        // No active page: the tick produces nothing.
        assert!(renderer.tick(&graph).is_empty());
    }
}
