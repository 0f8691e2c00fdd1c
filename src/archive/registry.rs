//! The class registry: element tag to node-kind constructor.
//!
//! Shape tags resolve through a single static table, so the reader never
//! hard-codes the variant set. The `document` and `page` tags are
//! structural, consumed directly by the reader, and deliberately absent:
//! neither may appear nested inside a page. Style and grouping tags
//! (fills, strokes, effects, layers, resources) nest inside shape
//! elements and are listed here only so an unknown tag can be told apart
//! from a known non-shape tag.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::errors::ArchiveError;
use crate::scene::Scene;
use crate::scene::kind::{
    GroupData, ImageData, LineData, NodeKind, OvalData, PolygonData, RectData, Scene3dData,
    TextData,
};

type KindCtor = fn() -> NodeKind;

static SHAPE_REGISTRY: LazyLock<BTreeMap<&'static str, KindCtor>> = LazyLock::new(|| {
    let mut m: BTreeMap<&'static str, KindCtor> = BTreeMap::new();
    m.insert("rect", || NodeKind::Rect(RectData::default()));
    m.insert("oval", || NodeKind::Oval(OvalData));
    m.insert("line", || NodeKind::Line(LineData));
    m.insert("polygon", || NodeKind::Polygon(PolygonData::default()));
    m.insert("text", || NodeKind::Text(TextData::default()));
    m.insert("image-shape", || NodeKind::Image(ImageData::default()));
    m.insert("scene3d", || NodeKind::Scene3d(Scene3dData::default()));
    m.insert("group", || NodeKind::Group(GroupData));
    m
});

/// Tags that nest inside shape elements and are consumed by the owner's
/// reader rather than resolved to a node kind.
const NESTED_TAGS: &[&str] = &[
    "fill",
    "gradient-fill",
    "image-fill",
    "stroke",
    "shadow-effect",
    "emboss-effect",
    "layer",
    "resource",
];

/// Resolve a shape tag to a fresh detached node in `scene`.
pub(crate) fn create_for_tag(scene: &mut Scene, tag: &str) -> Result<crate::scene::NodeId, ArchiveError> {
    let ctor = SHAPE_REGISTRY
        .get(tag)
        .ok_or_else(|| ArchiveError::UnknownTag {
            tag: tag.to_string(),
        })?;
    Ok(scene.create(ctor()))
}

pub(crate) fn is_nested_tag(tag: &str) -> bool {
    NESTED_TAGS.contains(&tag)
}
