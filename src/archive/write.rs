//! Serialize a scene into the archive element tree.
//!
//! The writer omits attributes at their default values, so a fresh node
//! archives as a bare tag and the output stays diffable. Layer groups are
//! only written when a page actually uses more than its default layer.
//! Linked text chains are encoded by giving every chain target an `id`
//! attribute and every source a `linked-text` reference; the reader
//! resolves these after the whole tree is in.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::archive::element::Element;
use crate::scene::kind::{GeometryHooks, NodeKind};
use crate::scene::layer::Layer;
use crate::scene::style::{Border, Effect, Fill};
use crate::scene::{NodeId, Scene};

/// Compact float form: integral values lose the trailing `.0`.
pub(crate) fn num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub(crate) fn scene_to_element(scene: &Scene) -> Element {
    let doc = scene.document();
    let ids = assign_link_ids(scene);
    let mut root = Element::new("document");
    document_attrs(scene, doc, &mut root);
    for &page in scene[doc].children() {
        root.push(page_element(scene, page, &ids));
    }
    for (name, bytes) in scene.resources() {
        let mut e = Element::new("resource");
        e.set_attr("name", name);
        e.text = BASE64.encode(bytes);
        root.push(e);
    }
    root
}

/// Every text node that some other node links to gets a stable id,
/// assigned in slot order so output is deterministic.
fn assign_link_ids(scene: &Scene) -> BTreeMap<NodeId, String> {
    let mut ids = BTreeMap::new();
    let mut next = 1u32;
    for id in scene.node_ids() {
        if let NodeKind::Text(text) = &scene[id].kind {
            if let Some(successor) = text.successor {
                ids.entry(successor).or_insert_with(|| {
                    let id = format!("text-{next}");
                    next += 1;
                    id
                });
            }
        }
    }
    ids
}

fn document_attrs(scene: &Scene, doc: NodeId, e: &mut Element) {
    let NodeKind::Document(data) = &scene[doc].kind else {
        return;
    };
    if data.selected_page() != 0 {
        e.set_attr("selected-page", data.selected_page().to_string());
    }
    if data.layout() != Default::default() {
        e.set_attr("layout", data.layout().to_string());
    }
    if data.unit() != Default::default() {
        e.set_attr("unit", data.unit().to_string());
    }
    let m = data.margins;
    let dm = crate::scene::Margins::default();
    if m != dm {
        e.set_attr("margin-left", num(m.left));
        e.set_attr("margin-right", num(m.right));
        e.set_attr("margin-top", num(m.top));
        e.set_attr("margin-bottom", num(m.bottom));
    }
    if data.show_margin {
        e.set_attr("show-margin", "true");
    }
    if data.show_grid {
        e.set_attr("show-grid", "true");
    }
    if data.grid_spacing != 36.0 {
        e.set_attr("grid-spacing", num(data.grid_spacing));
    }
}

fn page_element(scene: &Scene, page: NodeId, ids: &BTreeMap<NodeId, String>) -> Element {
    let mut e = Element::new("page");
    common_attrs(scene, page, &mut e);
    // Page positions are arrangement output, recomputed on load.
    e.attrs.retain(|(k, _)| k != "x" && k != "y");
    style_children(scene, page, &mut e);

    let NodeKind::Page(data) = &scene[page].kind else {
        return e;
    };
    if uses_layers(data.layers()) {
        if data.selected_layer_index() != 0 {
            e.set_attr("selected-layer", data.selected_layer_index().to_string());
        }
        for layer in data.layers() {
            let mut le = Element::new("layer");
            le.set_attr("name", &layer.name);
            if !layer.visible {
                le.set_attr("visible", "false");
            }
            if layer.locked {
                le.set_attr("locked", "true");
            }
            for &child in layer.children() {
                le.push(node_element(scene, child, ids));
            }
            e.push(le);
        }
    } else {
        for &child in scene[page].children() {
            e.push(node_element(scene, child, ids));
        }
    }
    e
}

/// Layer groups are only worth archiving once a page departs from its
/// single default layer.
fn uses_layers(layers: &[Layer]) -> bool {
    match layers {
        [only] => only.name != "Layer 1" || !only.visible || only.locked,
        _ => true,
    }
}

fn node_element(scene: &Scene, id: NodeId, ids: &BTreeMap<NodeId, String>) -> Element {
    let node = &scene[id];
    let mut e = Element::new(node.kind().tag());
    common_attrs(scene, id, &mut e);

    match &node.kind {
        NodeKind::Rect(rect) => {
            if rect.radius != 0.0 {
                e.set_attr("radius", num(rect.radius));
            }
        }
        NodeKind::Polygon(poly) => {
            let points: Vec<String> = poly
                .points
                .iter()
                .map(|p| format!("{},{}", num(p.x), num(p.y)))
                .collect();
            e.set_attr("points", points.join(" "));
            if poly.closed {
                e.set_attr("closed", "true");
            }
        }
        NodeKind::Text(text) => {
            e.text = text.string.clone();
            if let Some(link_id) = ids.get(&id) {
                e.set_attr("id", link_id);
            }
            if let Some(successor) = text.successor {
                e.set_attr("linked-text", &ids[&successor]);
            }
        }
        NodeKind::Image(image) => {
            e.set_attr("resource", &image.resource);
        }
        NodeKind::Scene3d(scene3d) => {
            if scene3d.depth != 0.0 {
                e.set_attr("depth", num(scene3d.depth));
            }
            if scene3d.yaw != 0.0 {
                e.set_attr("yaw", num(scene3d.yaw));
            }
            if scene3d.pitch != 0.0 {
                e.set_attr("pitch", num(scene3d.pitch));
            }
        }
        _ => {}
    }

    style_children(scene, id, &mut e);
    for &child in node.children() {
        e.push(node_element(scene, child, ids));
    }
    e
}

/// Geometry, transform, opacity/visibility and the sparse attribute bag,
/// shared by every node element including pages.
fn common_attrs(scene: &Scene, id: NodeId, e: &mut Element) {
    let node = &scene[id];
    if node.x_raw() != 0.0 {
        e.set_attr("x", num(node.x_raw()));
    }
    if node.y_raw() != 0.0 {
        e.set_attr("y", num(node.y_raw()));
    }
    if node.width_raw() != 0.0 {
        e.set_attr("width", num(node.width_raw()));
    }
    if node.height_raw() != 0.0 {
        e.set_attr("height", num(node.height_raw()));
    }
    if node.roll() != 0.0 {
        e.set_attr("roll", num(node.roll()));
    }
    if node.scale_x() != 1.0 {
        e.set_attr("scale-x", num(node.scale_x()));
    }
    if node.scale_y() != 1.0 {
        e.set_attr("scale-y", num(node.scale_y()));
    }
    if node.skew_x() != 0.0 {
        e.set_attr("skew-x", num(node.skew_x()));
    }
    if node.skew_y() != 0.0 {
        e.set_attr("skew-y", num(node.skew_y()));
    }
    if node.opacity() != 1.0 {
        e.set_attr("opacity", num(node.opacity()));
    }
    if !node.visible() {
        e.set_attr("visible", "false");
    }
    if let Some(name) = node.name() {
        e.set_attr("name", name);
    }
    if let Some(url) = node.url() {
        e.set_attr("url", url);
    }
    if node.is_locked() {
        e.set_attr("locked", "true");
    }
    if let Some(v) = node.min_width() {
        e.set_attr("min-width", num(v));
    }
    if let Some(v) = node.min_height() {
        e.set_attr("min-height", num(v));
    }
    if let Some(v) = node.pref_width() {
        e.set_attr("pref-width", num(v));
    }
    if let Some(v) = node.pref_height() {
        e.set_attr("pref-height", num(v));
    }
}

fn style_children(scene: &Scene, id: NodeId, e: &mut Element) {
    let node = &scene[id];
    if let Some(fill) = node.fill() {
        e.push(fill_element(fill));
    }
    if let Some(border) = node.border() {
        e.push(border_element(border));
    }
    if let Some(effect) = node.effect() {
        e.push(effect_element(effect));
    }
}

fn fill_element(fill: &Fill) -> Element {
    let mut e = Element::new(fill.tag());
    match fill {
        Fill::Solid(color) => {
            e.set_attr("color", color.to_hex());
        }
        Fill::Gradient { start, end, roll } => {
            e.set_attr("start", start.to_hex());
            e.set_attr("end", end.to_hex());
            if *roll != 0.0 {
                e.set_attr("roll", num(*roll));
            }
        }
        Fill::Image { resource, tiled } => {
            e.set_attr("resource", resource);
            if *tiled {
                e.set_attr("tiled", "true");
            }
        }
    }
    e
}

fn border_element(border: &Border) -> Element {
    let mut e = Element::new("stroke");
    e.set_attr("color", border.color.to_hex());
    if border.width != 1.0 {
        e.set_attr("width", num(border.width));
    }
    if let Some(dash) = &border.dash {
        let pattern: Vec<String> = dash.iter().map(|&v| num(v)).collect();
        e.set_attr("dash", pattern.join(" "));
    }
    e
}

fn effect_element(effect: &Effect) -> Element {
    let mut e = Element::new(effect.tag());
    match effect {
        Effect::Shadow {
            radius,
            dx,
            dy,
            color,
        } => {
            e.set_attr("radius", num(*radius));
            e.set_attr("dx", num(*dx));
            e.set_attr("dy", num(*dy));
            e.set_attr("color", color.to_hex());
        }
        Effect::Emboss {
            altitude,
            azimuth,
            radius,
        } => {
            e.set_attr("altitude", num(*altitude));
            e.set_attr("azimuth", num(*azimuth));
            e.set_attr("radius", num(*radius));
        }
    }
    e
}
