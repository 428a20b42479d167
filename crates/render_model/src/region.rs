//! Hit regions: named sub-areas of a shape with their own draw and click
//! behavior
//!
//! Regions are presentation-only. They are regenerated from the owning
//! shape's drawer at draw time and never serialized. Position and size are
//! accessor functions of the owning shape, so regions track resizing without
//! bookkeeping.

use crate::{DisplayList, Theme};
use geometry::{Point, Rect};
use scene_model::{Page, Shape, ShapeId};

/// Shape-relative position accessor.
pub type RegionPosition = fn(&Shape) -> Point;
/// Region size accessor, `(width, height)`.
pub type RegionSize = fn(&Shape) -> (f64, f64);
/// Static draw callback, run once per frame.
pub type RegionDraw = fn(&Shape, Rect, &Theme, &mut DisplayList);
/// Dynamic draw callback, run every animation tick with the current phase.
pub type RegionDrawDynamic = fn(&Shape, Rect, f64, &Theme, &mut DisplayList);
/// Click handler, invoked when a hit-test lands on the region.
pub type RegionClick = fn(&mut Page, ShapeId);

/// A named, positioned sub-area of a shape's bounding box.
pub struct HitRegion {
    name: String,
    /// Hit-test priority; higher regions intercept clicks first.
    pub index: i32,
    pub visible: bool,
    position: RegionPosition,
    size: RegionSize,
    draw_static: Option<RegionDraw>,
    draw_dynamic: Option<RegionDrawDynamic>,
    click: Option<RegionClick>,
}

impl HitRegion {
    pub fn new(name: impl Into<String>, position: RegionPosition, size: RegionSize) -> Self {
        Self {
            name: name.into(),
            index: 0,
            visible: true,
            position,
            size,
            draw_static: None,
            draw_dynamic: None,
            click: None,
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    pub fn with_draw_static(mut self, draw: RegionDraw) -> Self {
        self.draw_static = Some(draw);
        self
    }

    pub fn with_draw_dynamic(mut self, draw: RegionDrawDynamic) -> Self {
        self.draw_dynamic = Some(draw);
        self
    }

    pub fn with_click(mut self, click: RegionClick) -> Self {
        self.click = Some(click);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current bounds, evaluated against the owning shape.
    pub fn bounds(&self, shape: &Shape) -> Rect {
        let origin = (self.position)(shape);
        let (width, height) = (self.size)(shape);
        Rect::new(origin.x, origin.y, width, height)
    }

    pub fn contains(&self, shape: &Shape, p: Point) -> bool {
        self.visible && self.bounds(shape).contains(p)
    }

    pub fn has_dynamic_draw(&self) -> bool {
        self.draw_dynamic.is_some()
    }

    pub fn draw_static(&self, shape: &Shape, theme: &Theme, list: &mut DisplayList) {
        if self.visible {
            if let Some(draw) = self.draw_static {
                draw(shape, self.bounds(shape), theme, list);
            }
        }
    }

    pub fn draw_dynamic(&self, shape: &Shape, phase: f64, theme: &Theme, list: &mut DisplayList) {
        if self.visible {
            if let Some(draw) = self.draw_dynamic {
                draw(shape, self.bounds(shape), phase, theme, list);
            }
        }
    }

    pub fn click_handler(&self) -> Option<RegionClick> {
        self.click
    }

    /// Run the click handler. Returns whether one was registered.
    pub fn click(&self, page: &mut Page, owner: ShapeId) -> bool {
        match self.click {
            Some(handler) => {
                handler(page, owner);
                true
            }
            None => false,
        }
    }
}

/// The regions of one shape for one frame, hit-tested in descending `index`
/// with insertion order breaking ties.
#[derive(Default)]
pub struct RegionSet {
    regions: Vec<HitRegion>,
}

impl RegionSet {
    pub fn new(regions: Vec<HitRegion>) -> Self {
        Self { regions }
    }

    pub fn insert(&mut self, region: HitRegion) {
        self.regions.push(region);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HitRegion> {
        self.regions.iter()
    }

    pub fn has_dynamic_draw(&self) -> bool {
        self.regions.iter().any(HitRegion::has_dynamic_draw)
    }

    /// Topmost region under the point. Strict comparison keeps the
    /// first-inserted region ahead of later ones with the same index.
    pub fn hit_test(&self, shape: &Shape, p: Point) -> Option<&HitRegion> {
        let mut best: Option<&HitRegion> = None;
        for region in &self.regions {
            if region.contains(shape, p) && best.map(|b| region.index > b.index).unwrap_or(true) {
                best = Some(region);
            }
        }
        best
    }
}
