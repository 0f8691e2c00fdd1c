//! Layout, dirty-flag and layer behavior over the public API.

use scenedoc::glam::dvec2;
use scenedoc::scene::{GroupData, NodeKind, PageLayout, RectData, Scene};
use scenedoc::types::Rect;

fn first_page(scene: &Scene) -> scenedoc::NodeId {
    scene[scene.document()].children()[0]
}

#[test]
fn one_deep_layout_pass_converges() {
    let mut scene = Scene::new_letter();
    let doc = scene.document();
    let page = first_page(&scene);
    let group = scene.create(NodeKind::Group(GroupData));
    scene.append_child(page, group).unwrap();
    let rect = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(group, rect).unwrap();
    scene.set_width(group, 200.0);

    scene.layout_deep(doc);
    for id in scene.node_ids().collect::<Vec<_>>() {
        assert!(!scene[id].needs_layout(), "{id} still dirty");
        assert!(!scene[id].needs_layout_deep(), "{id} still deep-dirty");
    }

    // A second pass right away is a no-op.
    scene.take_events();
    scene.layout_deep(doc);
    assert!(scene.take_events().is_empty());
}

#[test]
fn switching_layout_modes_rearranges_pages() {
    let mut scene = Scene::new_letter();
    let doc = scene.document();
    scene.add_page(doc).unwrap();
    scene.add_page(doc).unwrap();

    scene.set_page_layout(doc, PageLayout::Continuous).unwrap();
    scene.layout_deep(doc);
    let pages = scene.pages(doc).to_vec();
    assert!(scene[pages[2]].y() > scene[pages[1]].y());
    assert!(scene[pages[1]].y() > scene[pages[0]].y());

    scene.set_page_layout(doc, PageLayout::Single).unwrap();
    scene.select_page(doc, 0).unwrap();
    scene.layout_deep(doc);
    assert_eq!(scene[pages[0]].y(), 0.0);
    assert!(scene[pages[1]].x() > 1000.0);
}

#[test]
fn hit_testing_respects_z_order_and_layers() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);

    let below = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, below).unwrap();
    scene.set_frame(below, Rect::new(0.0, 0.0, 100.0, 100.0));
    let above = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, above).unwrap();
    scene.set_frame(above, Rect::new(50.0, 50.0, 100.0, 100.0));

    // Front-most child wins where they overlap.
    assert_eq!(scene.child_at_point(page, dvec2(75.0, 75.0)), Some(above));
    assert_eq!(scene.child_at_point(page, dvec2(10.0, 10.0)), Some(below));

    scene.send_to_back(above).unwrap();
    assert_eq!(scene.child_at_point(page, dvec2(75.0, 75.0)), Some(below));
}

#[test]
fn locked_layer_blocks_hits_until_selected() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let a = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, a).unwrap();
    scene.add_layer(page, "Layer 2").unwrap();
    let b = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, b).unwrap();

    scene.set_layer_locked(page, 0, true).unwrap();
    assert!(!scene.is_hittable(a));
    assert!(scene.is_hittable(b));

    scene.select_layer(page, "Layer 1").unwrap();
    assert!(scene.is_hittable(a));
}

#[test]
fn divide_splits_a_page_at_an_offset() {
    let mut scene = Scene::new_letter();
    let doc = scene.document();
    let page = first_page(&scene);

    let top = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, top).unwrap();
    scene.set_frame(top, Rect::new(10.0, 10.0, 50.0, 50.0));
    let bottom = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, bottom).unwrap();
    scene.set_frame(bottom, Rect::new(10.0, 500.0, 50.0, 50.0));

    let sibling = scene.divide(page, 400.0).unwrap();
    assert_eq!(scene.pages(doc).len(), 2);
    assert_eq!(scene[page].height(), 400.0);

    // Above stays, below moves with its offset preserved.
    assert_eq!(scene[top].parent(), Some(page));
    assert_eq!(scene[bottom].parent(), Some(sibling));
    assert_eq!(scene[bottom].y(), 100.0);
}

#[test]
fn structural_errors_leave_the_tree_unchanged() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let group = scene.create(NodeKind::Group(GroupData));
    scene.append_child(page, group).unwrap();

    // Out-of-range insert is rejected before any mutation.
    let rect = scene.create(NodeKind::Rect(RectData::default()));
    assert!(scene.add_child(group, rect, 5).is_err());
    assert_eq!(scene[group].children().len(), 0);
    assert_eq!(scene[rect].parent(), None);

    // A node cannot become its own descendant's child.
    scene.add_child(group, rect, 0).unwrap();
    assert!(scene.add_child(rect, group, 0).is_err());
    assert_eq!(scene[group].parent(), Some(page));
}
