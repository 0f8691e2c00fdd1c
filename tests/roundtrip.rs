//! Archive round-trip coverage over documents built through the public
//! API.

use scenedoc::glam;
use scenedoc::scene::{
    Border, Color, Effect, Fill, NodeKind, PolygonData, RectData, Scene, TextData,
};
use scenedoc::types::Rect;

fn first_page(scene: &Scene) -> scenedoc::NodeId {
    scene[scene.document()].children()[0]
}

#[test]
fn rotated_rect_survives_a_round_trip() {
    let mut scene = Scene::new(612.0, 792.0);
    let page = first_page(&scene);
    let rect = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, rect).unwrap();
    scene.set_frame(rect, Rect::new(36.0, 36.0, 100.0, 50.0));
    scene.set_roll(rect, 45.0);

    let restored = Scene::from_xml(&scene.to_xml()).unwrap();
    let page = first_page(&restored);
    assert_eq!(restored[page].width(), 612.0);
    assert_eq!(restored[page].height(), 792.0);
    let child = restored[page].children()[0];
    let node = &restored[child];
    assert!((node.x() - 36.0).abs() < 0.01);
    assert!((node.y() - 36.0).abs() < 0.01);
    assert!((node.width() - 100.0).abs() < 0.01);
    assert!((node.height() - 50.0).abs() < 0.01);
    assert!((node.roll() - 45.0).abs() < 0.01);
}

#[test]
fn full_document_round_trips() {
    let mut scene = Scene::new_letter();
    let doc = scene.document();
    let page = first_page(&scene);

    let rect = scene.create(NodeKind::Rect(RectData { radius: 6.0 }));
    scene.append_child(page, rect).unwrap();
    scene.set_frame(rect, Rect::new(10.0, 20.0, 120.0, 80.0));
    scene.set_fill(
        rect,
        Some(Fill::Gradient {
            start: Color::WHITE,
            end: Color::rgb(0.0, 0.0, 1.0),
            roll: 90.0,
        }),
    );
    scene.set_border(
        rect,
        Some(Border {
            color: Color::rgb(1.0, 0.0, 0.0),
            width: 2.5,
            dash: Some(vec![4.0, 2.0]),
        }),
    );
    scene.set_effect(
        rect,
        Some(Effect::Shadow {
            radius: 3.0,
            dx: 1.0,
            dy: -1.0,
            color: Color::rgba(0.0, 0.0, 0.0, 0.5),
        }),
    );
    scene.set_name(rect, Some("hero"));
    scene.set_opacity(rect, 0.75);

    let polygon = scene.create(NodeKind::Polygon(PolygonData {
        points: vec![
            glam::DVec2::new(0.0, 0.0),
            glam::DVec2::new(40.0, 0.0),
            glam::DVec2::new(20.0, 30.0),
        ],
        closed: true,
    }));
    scene.append_child(page, polygon).unwrap();
    scene.set_frame_xy(polygon, 200.0, 200.0);

    let bytes = vec![0x89, 0x50, 0x4e, 0x47];
    let resource = scene.add_resource(bytes.clone());
    let image = scene.create(NodeKind::Image(scenedoc::scene::ImageData {
        resource: resource.clone(),
    }));
    scene.append_child(page, image).unwrap();
    scene.set_frame(image, Rect::new(300.0, 300.0, 64.0, 64.0));

    scene.add_page(doc).unwrap();
    scene
        .set_page_layout(doc, scenedoc::scene::PageLayout::Continuous)
        .unwrap();
    scene.set_unit(doc, scenedoc::Unit::Inch).unwrap();

    let restored = Scene::from_xml(&scene.to_xml()).unwrap();
    let rdoc = restored.document();
    assert_eq!(restored.pages(rdoc).len(), 2);
    assert_eq!(
        restored.page_layout(rdoc).unwrap(),
        scenedoc::scene::PageLayout::Continuous
    );
    assert_eq!(restored.unit(rdoc).unwrap(), scenedoc::Unit::Inch);
    assert_eq!(restored.selected_page(rdoc).unwrap(), 1);

    let rpage = restored.pages(rdoc)[0];
    let rrect = restored[rpage].children()[0];
    let node = &restored[rrect];
    assert_eq!(node.name(), Some("hero"));
    assert_eq!(node.opacity(), 0.75);
    match node.kind() {
        NodeKind::Rect(data) => assert_eq!(data.radius, 6.0),
        other => panic!("expected rect, got {}", other.name()),
    }
    match node.fill().unwrap() {
        Fill::Gradient { start, end, roll } => {
            assert_eq!(*start, Color::WHITE);
            assert_eq!(*end, Color::rgb(0.0, 0.0, 1.0));
            assert_eq!(*roll, 90.0);
        }
        other => panic!("expected gradient, got {}", other.tag()),
    }
    let border = node.border().unwrap();
    assert_eq!(border.width, 2.5);
    assert_eq!(border.dash.as_deref(), Some(&[4.0, 2.0][..]));
    assert!(matches!(
        node.effect(),
        Some(Effect::Shadow { radius, .. }) if *radius == 3.0
    ));

    let rpoly = restored[rpage].children()[1];
    match restored[rpoly].kind() {
        NodeKind::Polygon(data) => {
            assert_eq!(data.points.len(), 3);
            assert!(data.closed);
            assert_eq!(data.points[2], glam::DVec2::new(20.0, 30.0));
        }
        other => panic!("expected polygon, got {}", other.name()),
    }

    let rimage = restored[rpage].children()[2];
    match restored[rimage].kind() {
        NodeKind::Image(data) => {
            assert_eq!(restored.resource(&data.resource), Some(bytes.as_slice()));
        }
        other => panic!("expected image, got {}", other.name()),
    }
}

#[test]
fn linked_text_chain_survives_a_round_trip() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let a = scene.create(NodeKind::Text(TextData {
        string: "the quick brown fox".to_string(),
        successor: None,
    }));
    let b = scene.create(NodeKind::Text(TextData {
        string: "jumps over".to_string(),
        successor: None,
    }));
    let c = scene.create(NodeKind::Text(TextData::default()));
    scene.append_child(page, a).unwrap();
    scene.append_child(page, b).unwrap();
    scene.append_child(page, c).unwrap();
    scene.set_linked_successor(a, Some(b)).unwrap();
    scene.set_linked_successor(b, Some(c)).unwrap();

    let restored = Scene::from_xml(&scene.to_xml()).unwrap();
    let page = first_page(&restored);
    let children = restored[page].children().to_vec();
    assert_eq!(restored.linked_successor(children[0]), Some(children[1]));
    assert_eq!(restored.linked_successor(children[1]), Some(children[2]));
    assert_eq!(restored.linked_successor(children[2]), None);
    match restored[children[0]].kind() {
        NodeKind::Text(data) => assert_eq!(data.string, "the quick brown fox"),
        other => panic!("expected text, got {}", other.name()),
    }
}

#[test]
fn text_content_keeps_edge_whitespace() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let text = scene.create(NodeKind::Text(TextData {
        string: "  leading and trailing  ".to_string(),
        successor: None,
    }));
    scene.append_child(page, text).unwrap();

    let restored = Scene::from_xml(&scene.to_xml()).unwrap();
    let page = first_page(&restored);
    match restored[restored[page].children()[0]].kind() {
        NodeKind::Text(data) => assert_eq!(data.string, "  leading and trailing  "),
        other => panic!("expected text, got {}", other.name()),
    }
}

#[test]
fn layered_page_round_trips_with_membership() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let a = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, a).unwrap();
    scene.add_layer(page, "Annotations").unwrap();
    let b = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, b).unwrap();
    scene.set_layer_locked(page, 0, true).unwrap();

    let restored = Scene::from_xml(&scene.to_xml()).unwrap();
    let page = first_page(&restored);
    let layers = restored.layers(page).unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].name, "Layer 1");
    assert!(layers[0].locked);
    assert_eq!(layers[1].name, "Annotations");
    assert_eq!(layers[0].children().len(), 1);
    assert_eq!(layers[1].children().len(), 1);
    assert_eq!(restored.selected_layer(page).unwrap(), 1);

    // The flattened child list equals the layer concatenation.
    let flattened: Vec<_> = layers
        .iter()
        .flat_map(|l| l.children().iter().copied())
        .collect();
    assert_eq!(restored[page].children(), flattened.as_slice());
}

#[test]
fn write_read_write_is_stable() {
    let mut scene = Scene::new_letter();
    let page = first_page(&scene);
    let rect = scene.create(NodeKind::Rect(RectData::default()));
    scene.append_child(page, rect).unwrap();
    scene.set_frame(rect, Rect::new(36.0, 36.0, 100.0, 50.0));
    scene.set_roll(rect, 45.0);
    scene.set_fill(rect, Some(Fill::Solid(Color::rgb(0.0, 0.5, 0.0))));

    let first = scene.to_xml();
    let second = Scene::from_xml(&first).unwrap().to_xml();
    assert_eq!(first, second);
}

#[test]
fn save_and_load_paths() {
    let dir = std::env::temp_dir().join("scenedoc-roundtrip-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("doc.xml");

    let scene = Scene::new_letter();
    scene.save_path(&path).unwrap();
    let restored = Scene::load_path(&path).unwrap();
    assert_eq!(restored.pages(restored.document()).len(), 1);

    let missing = dir.join("nope.xml");
    assert!(matches!(
        Scene::load_path(&missing),
        Err(scenedoc::ArchiveError::UnreadableSource { .. })
    ));
}
