//! Rebuild a scene from an archive element tree.
//!
//! The reader is two-pass: the first pass builds every node and records
//! `id`/`linked-text` attributes, the second resolves the recorded
//! references once every possible target exists. Any error aborts the
//! whole read; a partially built scene is never returned.
//!
//! Legacy spellings still read: `rotation` for `roll`, `linewidth` for a
//! stroke's `width`, and the old unit and layout-mode names. Unknown
//! legacy enum values are logged and defaulted, never fatal.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::archive::element::Element;
use crate::archive::registry;
use crate::errors::ArchiveError;
use crate::log::warn;
use crate::scene::kind::NodeKind;
use crate::scene::layer::Layer;
use crate::scene::style::{Border, Color, Effect, Fill};
use crate::scene::{NodeId, Scene};
use crate::types::Unit;

#[derive(Default)]
struct RefTable {
    ids: BTreeMap<String, NodeId>,
    pending: Vec<(NodeId, String)>,
}

pub(crate) fn scene_from_element(root: &Element) -> Result<Scene, ArchiveError> {
    if root.name != "document" {
        return Err(ArchiveError::BadRoot {
            tag: root.name.clone(),
        });
    }
    let mut scene = Scene::empty();
    let doc = scene.document();
    let mut refs = RefTable::default();

    read_document_attrs(&mut scene, doc, root)?;

    for child in &root.children {
        match child.name.as_str() {
            "page" => {
                let page = read_page(&mut scene, child, &mut refs)?;
                let index = scene[doc].children().len();
                scene
                    .add_child(doc, page, index)
                    .expect("attaching a fresh page cannot fail");
            }
            "resource" => read_resource(&mut scene, child)?,
            other => {
                return Err(ArchiveError::UnknownTag {
                    tag: other.to_string(),
                });
            }
        }
    }

    // Second pass: wire up linked-text chains.
    for (source, target) in std::mem::take(&mut refs.pending) {
        let &target_id = refs
            .ids
            .get(&target)
            .ok_or(ArchiveError::UnresolvedReference { id: target })?;
        if let NodeKind::Text(text) = &mut scene[source].kind {
            text.successor = Some(target_id);
        }
    }

    // A document never has zero pages.
    if scene[doc].children().is_empty() {
        let page = scene.create_page();
        let (w, h) = crate::scene::document::page_size_default();
        let node = &mut scene[page];
        node.width = w;
        node.height = h;
        scene
            .add_child(doc, page, 0)
            .expect("attaching a fresh page cannot fail");
    }

    // Clamp the archived selection now that the page count is known.
    let selected = root.usize_attr("selected-page", 0)?;
    let page_count = scene[doc].children().len();
    if let NodeKind::Document(data) = &mut scene[doc].kind {
        data.selected_page = selected.min(page_count - 1);
    }

    scene.layout_deep(doc);
    scene.take_events();
    Ok(scene)
}

fn read_document_attrs(
    scene: &mut Scene,
    doc: NodeId,
    e: &Element,
) -> Result<(), ArchiveError> {
    let layout = match e.attr("layout") {
        Some(name) => Scene::page_layout_from_archive(name),
        None => Default::default(),
    };
    let unit = match e.attr("unit") {
        Some(name) => name.parse::<Unit>().unwrap_or_else(|_| {
            warn!("unknown unit {name:?}, using points");
            Unit::default()
        }),
        None => Unit::default(),
    };
    let margins = crate::scene::Margins {
        left: e.f64_attr("margin-left", 36.0)?,
        right: e.f64_attr("margin-right", 36.0)?,
        top: e.f64_attr("margin-top", 36.0)?,
        bottom: e.f64_attr("margin-bottom", 36.0)?,
    };
    let show_margin = e.bool_attr("show-margin", false)?;
    let show_grid = e.bool_attr("show-grid", false)?;
    let grid_spacing = e.f64_attr("grid-spacing", 36.0)?;

    if let NodeKind::Document(data) = &mut scene[doc].kind {
        data.layout = layout;
        data.unit = unit;
        data.margins = margins;
        data.show_margin = show_margin;
        data.show_grid = show_grid;
        data.grid_spacing = grid_spacing;
    }
    Ok(())
}

fn read_resource(scene: &mut Scene, e: &Element) -> Result<(), ArchiveError> {
    let name = e.required_attr("name")?.to_string();
    let encoded: String = e.text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|_| ArchiveError::BadResource { name: name.clone() })?;
    scene.add_named_resource(name, bytes);
    Ok(())
}

fn read_page(
    scene: &mut Scene,
    e: &Element,
    refs: &mut RefTable,
) -> Result<NodeId, ArchiveError> {
    let page = scene.create_page();
    read_common_attrs(scene, page, e)?;

    let layer_elements: Vec<&Element> = e.children_named("layer").collect();
    if layer_elements.is_empty() {
        for child in &e.children {
            if registry::is_nested_tag(&child.name) {
                read_style(scene, page, child)?;
            } else {
                let node = read_node(scene, child, refs)?;
                append_to_page(scene, page, node);
            }
        }
    } else {
        // Replace the default layer with the archived layer list, filling
        // each layer's children as it becomes the selected one.
        if let NodeKind::Page(data) = &mut scene[page].kind {
            data.layers.clear();
        }
        for (index, le) in layer_elements.iter().enumerate() {
            let mut layer = Layer::new(le.attr("name").unwrap_or("Layer 1"));
            layer.visible = le.bool_attr("visible", true)?;
            layer.locked = le.bool_attr("locked", false)?;
            if let NodeKind::Page(data) = &mut scene[page].kind {
                data.layers.push(layer);
                data.selected_layer = index;
            }
            for child in &le.children {
                let node = read_node(scene, child, refs)?;
                append_to_page(scene, page, node);
            }
        }
        // Styles and any stray shapes written outside the layer groups.
        for child in &e.children {
            if child.name == "layer" {
                continue;
            }
            if registry::is_nested_tag(&child.name) {
                read_style(scene, page, child)?;
            } else {
                let node = read_node(scene, child, refs)?;
                append_to_page(scene, page, node);
            }
        }
        let layer_count = layer_elements.len();
        let selected = e.usize_attr("selected-layer", 0)?;
        if let NodeKind::Page(data) = &mut scene[page].kind {
            data.selected_layer = selected.min(layer_count - 1);
        }
    }
    Ok(page)
}

/// Append a freshly read node into the page's currently selected layer.
fn append_to_page(scene: &mut Scene, page: NodeId, node: NodeId) {
    scene
        .append_child(page, node)
        .expect("attaching a fresh node cannot fail");
}

fn read_node(
    scene: &mut Scene,
    e: &Element,
    refs: &mut RefTable,
) -> Result<NodeId, ArchiveError> {
    let id = registry::create_for_tag(scene, &e.name)?;
    read_common_attrs(scene, id, e)?;
    read_kind_attrs(scene, id, e, refs)?;

    for child in &e.children {
        if registry::is_nested_tag(&child.name) {
            read_style(scene, id, child)?;
        } else {
            let node = read_node(scene, child, refs)?;
            let index = scene[id].children().len();
            scene
                .add_child(id, node, index)
                .expect("attaching a fresh node cannot fail");
        }
    }
    Ok(id)
}

fn read_common_attrs(scene: &mut Scene, id: NodeId, e: &Element) -> Result<(), ArchiveError> {
    {
        let node = &mut scene[id];
        node.x = e.f64_attr("x", 0.0)?;
        node.y = e.f64_attr("y", 0.0)?;
        node.width = e.f64_attr("width", 0.0)?;
        node.height = e.f64_attr("height", 0.0)?;
        node.opacity = e.f64_attr("opacity", 1.0)?.clamp(0.0, 1.0);
        node.visible = e.bool_attr("visible", true)?;
    }

    // `rotation` is the legacy spelling of `roll`.
    let roll = match e.attr("roll") {
        Some(_) => e.f64_attr("roll", 0.0)?,
        None => e.f64_attr("rotation", 0.0)?,
    };
    scene.set_roll(id, roll);
    scene.set_scale_x(id, e.f64_attr("scale-x", 1.0)?);
    scene.set_scale_y(id, e.f64_attr("scale-y", 1.0)?);
    scene.set_skew_x(id, e.f64_attr("skew-x", 0.0)?);
    scene.set_skew_y(id, e.f64_attr("skew-y", 0.0)?);

    if let Some(name) = e.attr("name") {
        scene.set_name(id, Some(name));
    }
    if let Some(url) = e.attr("url") {
        scene.set_url(id, Some(url));
    }
    if e.bool_attr("locked", false)? {
        scene.set_locked(id, true);
    }
    if e.attr("min-width").is_some() {
        let v = e.f64_attr("min-width", 0.0)?;
        scene.set_min_width(id, Some(v));
    }
    if e.attr("min-height").is_some() {
        let v = e.f64_attr("min-height", 0.0)?;
        scene.set_min_height(id, Some(v));
    }
    if e.attr("pref-width").is_some() {
        let v = e.f64_attr("pref-width", 0.0)?;
        scene.set_pref_width(id, Some(v));
    }
    if e.attr("pref-height").is_some() {
        let v = e.f64_attr("pref-height", 0.0)?;
        scene.set_pref_height(id, Some(v));
    }
    Ok(())
}

fn read_kind_attrs(
    scene: &mut Scene,
    id: NodeId,
    e: &Element,
    refs: &mut RefTable,
) -> Result<(), ArchiveError> {
    match &mut scene[id].kind {
        NodeKind::Rect(rect) => {
            rect.radius = e.f64_attr("radius", 0.0)?;
        }
        NodeKind::Polygon(poly) => {
            if let Some(points) = e.attr("points") {
                poly.points = parse_points(&e.name, points)?;
            }
            poly.closed = e.bool_attr("closed", false)?;
        }
        NodeKind::Text(text) => {
            text.string = e.text.clone();
        }
        NodeKind::Image(image) => {
            image.resource = e.required_attr("resource")?.to_string();
        }
        NodeKind::Scene3d(scene3d) => {
            scene3d.depth = e.f64_attr("depth", 0.0)?;
            scene3d.yaw = e.f64_attr("yaw", 0.0)?;
            scene3d.pitch = e.f64_attr("pitch", 0.0)?;
        }
        _ => {}
    }

    if let Some(link_id) = e.attr("id") {
        refs.ids.insert(link_id.to_string(), id);
    }
    if let Some(target) = e.attr("linked-text") {
        refs.pending.push((id, target.to_string()));
    }
    Ok(())
}

fn parse_points(tag: &str, s: &str) -> Result<Vec<glam::DVec2>, ArchiveError> {
    let bad = || ArchiveError::BadAttribute {
        tag: tag.to_string(),
        attr: "points".to_string(),
        value: s.to_string(),
    };
    let mut points = Vec::new();
    for pair in s.split_whitespace() {
        let (x, y) = pair.split_once(',').ok_or_else(bad)?;
        let x: f64 = x.trim().parse().map_err(|_| bad())?;
        let y: f64 = y.trim().parse().map_err(|_| bad())?;
        points.push(glam::DVec2::new(x, y));
    }
    Ok(points)
}

fn read_style(scene: &mut Scene, id: NodeId, e: &Element) -> Result<(), ArchiveError> {
    match e.name.as_str() {
        "fill" => {
            let color = color_attr(e, "color", Color::BLACK)?;
            scene.set_fill(id, Some(Fill::Solid(color)));
        }
        "gradient-fill" => {
            let start = color_attr(e, "start", Color::WHITE)?;
            let end = color_attr(e, "end", Color::BLACK)?;
            let roll = e.f64_attr("roll", 0.0)?;
            scene.set_fill(id, Some(Fill::Gradient { start, end, roll }));
        }
        "image-fill" => {
            let resource = e.required_attr("resource")?.to_string();
            let tiled = e.bool_attr("tiled", false)?;
            scene.set_fill(id, Some(Fill::Image { resource, tiled }));
        }
        "stroke" => {
            let color = color_attr(e, "color", Color::BLACK)?;
            // `linewidth` is the legacy spelling of `width`.
            let width = match e.attr("width") {
                Some(_) => e.f64_attr("width", 1.0)?,
                None => e.f64_attr("linewidth", 1.0)?,
            };
            let dash = match e.attr("dash") {
                Some(pattern) => Some(parse_dash(&e.name, pattern)?),
                None => None,
            };
            scene.set_border(id, Some(Border { color, width, dash }));
        }
        "shadow-effect" => {
            scene.set_effect(
                id,
                Some(Effect::Shadow {
                    radius: e.f64_attr("radius", 0.0)?,
                    dx: e.f64_attr("dx", 0.0)?,
                    dy: e.f64_attr("dy", 0.0)?,
                    color: color_attr(e, "color", Color::BLACK)?,
                }),
            );
        }
        "emboss-effect" => {
            scene.set_effect(
                id,
                Some(Effect::Emboss {
                    altitude: e.f64_attr("altitude", 0.0)?,
                    azimuth: e.f64_attr("azimuth", 0.0)?,
                    radius: e.f64_attr("radius", 0.0)?,
                }),
            );
        }
        other => {
            return Err(ArchiveError::UnknownTag {
                tag: other.to_string(),
            });
        }
    }
    Ok(())
}

fn color_attr(e: &Element, name: &str, default: Color) -> Result<Color, ArchiveError> {
    match e.attr(name) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ArchiveError::BadAttribute {
            tag: e.name.clone(),
            attr: name.to_string(),
            value: v.to_string(),
        }),
    }
}

fn parse_dash(tag: &str, s: &str) -> Result<Vec<f64>, ArchiveError> {
    s.split_whitespace()
        .map(|v| {
            v.parse().map_err(|_| ArchiveError::BadAttribute {
                tag: tag.to_string(),
                attr: "dash".to_string(),
                value: s.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::parse::parse_document;

    fn read(markup: &str) -> Result<Scene, ArchiveError> {
        scene_from_element(&parse_document("<input>", markup)?)
    }

    #[test]
    fn empty_document_gets_a_page() {
        let scene = read("<document/>").unwrap();
        let doc = scene.document();
        assert_eq!(scene[doc].children().len(), 1);
        let page = scene[doc].children()[0];
        assert_eq!(scene[page].width(), 612.0);
    }

    #[test]
    fn legacy_rotation_and_linewidth_read() {
        let scene = read(
            r##"<document>
                 <page width="612" height="792">
                   <rect x="10" y="10" width="50" height="40" rotation="30">
                     <stroke color="#ff0000" linewidth="3"/>
                   </rect>
                 </page>
               </document>"##,
        )
        .unwrap();
        let page = scene[scene.document()].children()[0];
        let rect = scene[page].children()[0];
        assert_eq!(scene[rect].roll(), 30.0);
        let border = scene[rect].border().unwrap();
        assert_eq!(border.width, 3.0);
        assert_eq!(border.color, Color::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn unknown_legacy_enums_default_instead_of_failing() {
        let scene = read(r#"<document layout="brochure-spread" unit="cubit"/>"#).unwrap();
        let doc = scene.document();
        assert_eq!(
            scene.page_layout(doc).unwrap(),
            crate::scene::PageLayout::Single
        );
        assert_eq!(scene.unit(doc).unwrap(), Unit::Point);
    }

    #[test]
    fn unknown_shape_tag_fails_the_read() {
        let err = read(r#"<document><page><hologram/></page></document>"#).unwrap_err();
        assert!(matches!(err, ArchiveError::UnknownTag { tag } if tag == "hologram"));
    }

    #[test]
    fn nested_structural_tags_fail_the_read() {
        let err = read(r#"<document><page><document/></page></document>"#).unwrap_err();
        assert!(matches!(err, ArchiveError::UnknownTag { tag } if tag == "document"));
        let err = read(r#"<document><page><rect><page/></rect></page></document>"#).unwrap_err();
        assert!(matches!(err, ArchiveError::UnknownTag { tag } if tag == "page"));
    }

    #[test]
    fn dangling_linked_text_fails_the_read() {
        let err = read(
            r#"<document><page>
                 <text linked-text="text-9">overflow</text>
               </page></document>"#,
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::UnresolvedReference { id } if id == "text-9"));
    }

    #[test]
    fn layers_restore_with_membership() {
        let scene = read(
            r#"<document>
                 <page width="612" height="792" selected-layer="1">
                   <layer name="Background" locked="true">
                     <rect width="10" height="10"/>
                   </layer>
                   <layer name="Notes" visible="false">
                     <oval width="5" height="5"/>
                   </layer>
                 </page>
               </document>"#,
        )
        .unwrap();
        let page = scene[scene.document()].children()[0];
        let layers = scene.layers(page).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "Background");
        assert!(layers[0].locked);
        assert!(!layers[1].visible);
        assert_eq!(layers[0].children().len(), 1);
        assert_eq!(layers[1].children().len(), 1);
        assert_eq!(scene.selected_layer(page).unwrap(), 1);
        assert_eq!(scene[page].children().len(), 2);
    }

    #[test]
    fn bad_resource_bytes_fail_the_read() {
        let err = read(r#"<document><resource name="r">@@not-base64@@</resource></document>"#)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::BadResource { name } if name == "r"));
    }

    #[test]
    fn selected_page_is_clamped() {
        let scene = read(r#"<document selected-page="7"><page width="10" height="10"/></document>"#)
            .unwrap();
        assert_eq!(scene.selected_page(scene.document()).unwrap(), 0);
    }
}
