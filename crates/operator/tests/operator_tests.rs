//! Integration tests for the operator surface
//!
//! These drive the whole engine the way an embedding host would: through
//! `GraphOperator` only, with screen-space coordinates crossing the boundary
//! and change batches observed through the installed listener.

use change_stream::ChangeEvent;
use geometry::Direction;
use operator::{GraphOperator, IndexMove};
use proptest::prelude::*;
use render_model::{DisplayList, Drawer, RenderItem, Theme};
use scene_model::{
    ChangeScope, Color, MethodKey, MethodOverride, Page, PageMode, Shape, ShapeDescriptor, ShapeId,
};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn attrs(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

fn rect_at(op: &mut GraphOperator, x: f64, y: f64) -> ShapeId {
    op.create_shape(json!({ "kind": "rectangle", "x": x, "y": y })).unwrap()
}

fn shape_x(op: &GraphOperator, id: ShapeId) -> f64 {
    op.graph().active_page().unwrap().shape(id).unwrap().x
}

fn connector_path(op: &GraphOperator, id: ShapeId) -> Vec<geometry::Point> {
    op.graph()
        .active_page()
        .unwrap()
        .shape(id)
        .unwrap()
        .connector_data
        .as_ref()
        .unwrap()
        .path
        .clone()
}

// ----------------------------------------------------------------------
// Persistence
// ----------------------------------------------------------------------

#[test]
fn test_serialize_then_load_preserves_geometry_and_ids() {
    init_tracing();
    let mut source = GraphOperator::new();
    let id = source
        .create_shape(json!({
            "kind": "rectangle", "x": 10.0, "y": 20.0,
            "width": 100.0, "height": 50.0,
        }))
        .unwrap();
    let page_id = source.active_page_id().unwrap();
    let payload = source.serialize_page(page_id).unwrap();

    let mut target = GraphOperator::new();
    let loaded = target.load_page(&payload).unwrap();
    assert_eq!(loaded, page_id);

    let page = target.graph().page(loaded).unwrap();
    let shape = page.shape(id).expect("shape id survives the round trip");
    assert_eq!(shape.x, 10.0);
    assert_eq!(shape.y, 20.0);
    assert_eq!(shape.width, 100.0);
    assert_eq!(shape.height, 50.0);
    assert_eq!(shape.kind(), "rectangle");
}

#[test]
fn test_load_page_with_unknown_kind_fails() {
    let mut op = GraphOperator::new();
    let payload = json!({
        "id": scene_model::PageId::new().to_string(),
        "shapes": [{
            "id": ShapeId::new().to_string(),
            "kind": "flux_capacitor",
            "x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0,
        }],
    })
    .to_string();
    assert!(op.load_page(&payload).is_err());
    // The failed load must not leave a page behind.
    assert_eq!(op.graph().page_count(), 1);
}

// ----------------------------------------------------------------------
// Connectors
// ----------------------------------------------------------------------

#[test]
fn test_connector_follows_endpoint_moved_through_operator() {
    let mut op = GraphOperator::new();
    let a = rect_at(&mut op, 0.0, 0.0);
    let b = rect_at(&mut op, 200.0, 0.0);
    let conn = op.create_shape(json!({ "kind": "connector" })).unwrap();
    assert!(op.connect_from(conn, a, Direction::E).unwrap());
    assert!(op.connect_to(conn, b, Direction::W).unwrap());

    let before = connector_path(&op, conn);
    let end_before = *before.last().unwrap();

    assert!(op.set_attributes(b, attrs(&[("x", json!(230.0))])).unwrap());
    op.render_frame().unwrap();

    let after = connector_path(&op, conn);
    let end_after = *after.last().unwrap();
    assert_eq!(end_after.x - end_before.x, 30.0);
    assert_eq!(end_after.y, end_before.y);
}

#[test]
fn test_deleting_endpoint_cascades_to_connector() {
    let mut op = GraphOperator::new();
    let a = rect_at(&mut op, 0.0, 0.0);
    let b = rect_at(&mut op, 200.0, 0.0);
    let conn = op.create_shape(json!({ "kind": "connector" })).unwrap();
    op.connect_from(conn, a, Direction::E).unwrap();
    op.connect_to(conn, b, Direction::W).unwrap();

    assert!(op.remove_shape(b).unwrap());
    let page = op.graph().active_page().unwrap();
    assert!(!page.contains_shape(b));
    assert!(!page.contains_shape(conn));
    assert!(page.contains_shape(a));

    // Undo restores the endpoint and the cascaded connector, still attached.
    assert!(op.undo().unwrap());
    let page = op.graph().active_page().unwrap();
    assert!(page.contains_shape(b));
    let data = page.shape(conn).unwrap().connector_data.as_ref().unwrap();
    assert_eq!(data.from.unwrap().shape, a);
    assert_eq!(data.to.unwrap().shape, b);
}

// ----------------------------------------------------------------------
// Grouping
// ----------------------------------------------------------------------

#[test]
fn test_group_and_ungroup_restore_membership() {
    let mut op = GraphOperator::new();
    let a = rect_at(&mut op, 0.0, 0.0);
    let b = rect_at(&mut op, 120.0, 0.0);
    let c = rect_at(&mut op, 240.0, 0.0);

    let container = op.group(&[a, b, c]).unwrap().expect("group applies");
    {
        let page = op.graph().active_page().unwrap();
        let children =
            page.shape(container).unwrap().container_data.as_ref().unwrap().children.clone();
        assert_eq!(children, vec![a, b, c]);
        for id in [a, b, c] {
            assert_eq!(page.shape(id).unwrap().container(), Some(container));
        }
        // The container replaced its members at page level.
        assert_eq!(page.order(), &[container]);
    }

    assert!(op.ungroup(&[container]).unwrap());
    let page = op.graph().active_page().unwrap();
    assert!(!page.contains_shape(container));
    assert_eq!(page.order(), &[a, b, c]);
    for id in [a, b, c] {
        assert_eq!(page.shape(id).unwrap().container(), None);
    }
}

#[test]
fn test_container_move_via_set_attributes_carries_children() {
    init_tracing();
    let mut op = GraphOperator::new();
    let a = rect_at(&mut op, 10.0, 10.0);
    let b = rect_at(&mut op, 150.0, 10.0);
    let container = op.group(&[a, b]).unwrap().expect("group applies");
    let container_x = shape_x(&op, container);
    let a_x = shape_x(&op, a);
    let b_x = shape_x(&op, b);

    assert!(op
        .set_attributes(container, attrs(&[("x", json!(container_x + 50.0))]))
        .unwrap());
    assert_eq!(shape_x(&op, container), container_x + 50.0);
    assert_eq!(shape_x(&op, a), a_x + 50.0);
    assert_eq!(shape_x(&op, b), b_x + 50.0);

    // One undo puts the whole subtree back.
    assert!(op.undo().unwrap());
    assert_eq!(shape_x(&op, container), container_x);
    assert_eq!(shape_x(&op, a), a_x);
    assert_eq!(shape_x(&op, b), b_x);
}

// ----------------------------------------------------------------------
// History
// ----------------------------------------------------------------------

#[test]
fn test_undo_redo_walk_across_property_writes() {
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 0.0, 0.0);
    for x in [10.0, 20.0, 30.0, 40.0, 50.0] {
        assert!(op.set_attributes(id, attrs(&[("x", json!(x))])).unwrap());
    }
    assert_eq!(shape_x(&op, id), 50.0);

    for _ in 0..3 {
        assert!(op.undo().unwrap());
    }
    assert_eq!(shape_x(&op, id), 20.0);
    assert!(op.can_redo());

    for _ in 0..2 {
        assert!(op.redo().unwrap());
    }
    assert_eq!(shape_x(&op, id), 40.0);
    assert!(op.can_undo());
    assert!(op.can_redo());
}

#[test]
fn test_noop_write_is_not_recorded() {
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 0.0, 0.0);
    assert!(op.set_attributes(id, attrs(&[("x", json!(25.0))])).unwrap());
    // Same value again: refused, so redo/undo depth is unchanged.
    assert!(!op.set_attributes(id, attrs(&[("x", json!(25.0))])).unwrap());

    assert!(op.undo().unwrap());
    assert_eq!(shape_x(&op, id), 0.0);
    assert!(op.undo().unwrap());
    assert!(!op.can_undo());
}

#[test]
fn test_histories_are_per_page() {
    let mut op = GraphOperator::new();
    let first = op.active_page_id().unwrap();
    rect_at(&mut op, 0.0, 0.0);
    assert!(op.can_undo());

    let second = op.add_page();
    assert!(op.set_active_page(second));
    assert!(!op.can_undo());
    rect_at(&mut op, 5.0, 5.0);
    assert!(op.can_undo());

    assert!(op.set_active_page(first));
    assert!(op.undo().unwrap());
    assert!(op.graph().page(first).unwrap().order().is_empty());
    assert_eq!(op.graph().page(second).unwrap().order().len(), 1);
}

// ----------------------------------------------------------------------
// Change batches
// ----------------------------------------------------------------------

#[test]
fn test_one_call_delivers_one_batch() {
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 0.0, 0.0);

    let batches: Rc<RefCell<Vec<Vec<ChangeEvent>>>> = Rc::default();
    let sink = batches.clone();
    op.set_listener(Rc::new(move |events: &[ChangeEvent]| {
        sink.borrow_mut().push(events.to_vec());
    }));

    let writes = attrs(&[
        ("backColor", json!("#00FF00")),
        ("borderColor", json!("#FF0000")),
        ("dashed", json!(true)),
        ("fontColor", json!("#0000FF")),
        ("fontSize", json!(18.0)),
        ("height", json!(90.0)),
        ("lineWidth", json!(2.5)),
        ("rotation", json!(15.0)),
        ("text", json!("label")),
        ("width", json!(140.0)),
    ]);
    assert!(op.set_attributes(id, writes).unwrap());

    let batches = batches.borrow();
    assert_eq!(batches.len(), 1, "one turn, one batch");
    let batch = &batches[0];
    assert_eq!(batch.len(), 10);
    let properties: Vec<&str> = batch.iter().map(|e| e.property.as_str()).collect();
    assert_eq!(
        properties,
        [
            "backColor", "borderColor", "dashed", "fontColor", "fontSize", "height",
            "lineWidth", "rotation", "text", "width",
        ]
    );
    for event in batch {
        assert_eq!(event.scope, ChangeScope::Shape);
        assert_eq!(event.id, id.to_string());
    }
    // Pre/post pairs carry the actual transition.
    assert_eq!(batch[9].pre_value, json!(100.0));
    assert_eq!(batch[9].value, json!(140.0));
}

#[test]
fn test_refused_write_delivers_no_batch() {
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 40.0, 0.0);

    let count = Rc::new(RefCell::new(0usize));
    let sink = count.clone();
    op.set_listener(Rc::new(move |_: &[ChangeEvent]| {
        *sink.borrow_mut() += 1;
    }));

    assert!(!op.set_attributes(id, attrs(&[("x", json!(40.0))])).unwrap());
    assert_eq!(*count.borrow(), 0);

    assert!(op.set_attributes(id, attrs(&[("x", json!(41.0))])).unwrap());
    assert_eq!(*count.borrow(), 1);
}

// ----------------------------------------------------------------------
// Screen-space boundary
// ----------------------------------------------------------------------

#[test]
fn test_create_converts_screen_coordinates_under_zoom() {
    let mut op = GraphOperator::new();
    op.zoom_to(2.0).unwrap();
    let id = rect_at(&mut op, 100.0, 80.0);
    let page = op.graph().active_page().unwrap();
    let shape = page.shape(id).unwrap();
    assert_eq!(shape.x, 50.0);
    assert_eq!(shape.y, 40.0);
}

#[test]
fn test_pan_delta_is_scaled() {
    let mut op = GraphOperator::new();
    op.zoom_to(2.0).unwrap();
    op.pan(100.0, -60.0).unwrap();
    let view = op.graph().active_page().unwrap().view;
    assert_eq!(view.offset_x, 50.0);
    assert_eq!(view.offset_y, -30.0);
}

#[test]
fn test_paste_offset_is_scaled() {
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 10.0, 10.0);
    let payload = op.copy(&[id]).unwrap();

    op.zoom_to(2.0).unwrap();
    let pasted = op.paste(&payload, 50.0, 0.0).unwrap();
    assert_eq!(pasted.len(), 1);
    assert_ne!(pasted[0], id);
    let page = op.graph().active_page().unwrap();
    assert_eq!(page.shape(pasted[0]).unwrap().x, 35.0);

    assert!(op.undo().unwrap());
    assert!(!op.graph().active_page().unwrap().contains_shape(pasted[0]));
}

// ----------------------------------------------------------------------
// Z-order
// ----------------------------------------------------------------------

#[test]
fn test_move_shape_index_through_operator() {
    let mut op = GraphOperator::new();
    let a = rect_at(&mut op, 0.0, 0.0);
    let b = rect_at(&mut op, 10.0, 0.0);
    let c = rect_at(&mut op, 20.0, 0.0);

    assert!(op.move_shape_index(a, IndexMove::Top).unwrap());
    assert_eq!(op.graph().active_page().unwrap().order(), &[b, c, a]);

    assert!(op.move_shape_index(c, IndexMove::Down).unwrap());
    assert_eq!(op.graph().active_page().unwrap().order(), &[c, b, a]);

    // Already at the bottom: refused, nothing recorded.
    assert!(!op.move_shape_index(c, IndexMove::Bottom).unwrap());

    assert!(op.undo().unwrap());
    assert_eq!(op.graph().active_page().unwrap().order(), &[b, c, a]);
    assert!(op.undo().unwrap());
    assert_eq!(op.graph().active_page().unwrap().order(), &[a, b, c]);
}

// ----------------------------------------------------------------------
// Modes and pages
// ----------------------------------------------------------------------

#[test]
fn test_set_page_mode() {
    let mut op = GraphOperator::new();
    op.set_page_mode(PageMode::Display).unwrap();
    assert_eq!(op.graph().active_page().unwrap().mode(), PageMode::Display);
}

fn mark_clicked(page: &mut Page, id: ShapeId) {
    let _ = page.set_property(id, "text", &json!("clicked"));
}

#[test]
fn test_mode_click_override_replaces_region_dispatch() {
    init_tracing();
    let mut op = GraphOperator::new();
    let id = rect_at(&mut op, 40.0, 40.0);
    op.modes_mut().register(
        PageMode::Runtime,
        "rectangle",
        MethodKey::Click,
        MethodOverride::Handler(mark_clicked),
    );

    // Configuration mode: no override row, no region handler, click falls
    // through.
    assert!(!op.click(60.0, 60.0).unwrap());

    op.set_page_mode(PageMode::Runtime).unwrap();
    assert!(op.click(60.0, 60.0).unwrap());
    let page = op.graph().active_page().unwrap();
    assert_eq!(page.shape(id).unwrap().text, "clicked");

    // A click on empty canvas hits nothing in any mode.
    assert!(!op.click(500.0, 500.0).unwrap());
}

#[test]
fn test_remove_active_page_activates_next() {
    let mut op = GraphOperator::new();
    let first = op.active_page_id().unwrap();
    let second = op.add_page();
    assert!(op.remove_page(first));
    assert_eq!(op.active_page_id(), Some(second));
    assert!(!op.remove_page(first));
}

// ----------------------------------------------------------------------
// Kind extension
// ----------------------------------------------------------------------

struct BadgeDrawer;

impl Drawer for BadgeDrawer {
    fn draw(&self, shape: &Shape, _theme: &Theme, list: &mut DisplayList) {
        list.push(RenderItem::Ellipse {
            bounds: shape.bounds(),
            rotation: shape.rotation,
            fill: Some(Color::rgb(250, 200, 60)),
            stroke: None,
            stroke_width: 1.0,
        });
    }
}

#[test]
fn test_registered_kind_creates_and_renders() {
    init_tracing();
    let mut op = GraphOperator::new();
    op.register_kind(ShapeDescriptor::new("badge", 40.0, 40.0), Rc::new(BadgeDrawer));

    let id = op.create_shape(json!({ "kind": "badge", "x": 5.0, "y": 5.0 })).unwrap();
    let page = op.graph().active_page().unwrap();
    assert_eq!(page.shape(id).unwrap().width, 40.0);

    let list = op.render_frame().unwrap();
    let badge_fill = Some(Color::rgb(250, 200, 60));
    assert!(list
        .items
        .iter()
        .any(|item| matches!(item, RenderItem::Ellipse { fill, .. } if *fill == badge_fill)));
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_creates_fully_unwind(count in 1usize..12) {
        let mut op = GraphOperator::new();
        for i in 0..count {
            op.create_shape(json!({ "kind": "rectangle", "x": i as f64 * 10.0, "y": 0.0 }))
                .unwrap();
        }
        for _ in 0..count {
            prop_assert!(op.undo().unwrap());
        }
        prop_assert!(op.graph().active_page().unwrap().order().is_empty());
        prop_assert!(!op.can_undo());
        for _ in 0..count {
            prop_assert!(op.redo().unwrap());
        }
        prop_assert_eq!(op.graph().active_page().unwrap().order().len(), count);
    }
}
