//! The closed set of node variants and their statically dispatched hooks.
//!
//! Instead of a virtual inheritance chain, every node carries a `NodeKind`
//! and the per-kind behavior (outline path, archive tag, container
//! policy) is dispatched over the enum with `enum_dispatch`. The archive
//! registry maps tags straight to variant constructors.

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use crate::scene::NodeId;
use crate::scene::document::DocData;
use crate::scene::layer::PageData;
use crate::scene::paint::Path;
use crate::types::Rect;

/// Per-kind behavior hooks, dispatched statically over `NodeKind`.
#[enum_dispatch]
pub trait GeometryHooks {
    /// The element tag this kind archives under (and the registry key).
    fn tag(&self) -> &'static str;

    /// Outline path in local coordinates.
    fn path(&self, bounds: Rect) -> Path;

    /// Whether this kind is a structural container: geometry changes mark
    /// it layout-dirty and `layout` runs an arrangement algorithm.
    fn is_structural(&self) -> bool {
        false
    }

    /// Whether children paint clipped to this node's bounds.
    fn clips_children(&self) -> bool {
        false
    }
}

/// A rectangle, optionally with rounded corners.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RectData {
    pub radius: f64,
}

impl GeometryHooks for RectData {
    fn tag(&self) -> &'static str {
        "rect"
    }

    fn path(&self, bounds: Rect) -> Path {
        if self.radius > 0.0 {
            Path::rounded_rect(bounds, self.radius)
        } else {
            Path::rect(bounds)
        }
    }
}

/// An ellipse inscribed in the node's bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OvalData;

impl GeometryHooks for OvalData {
    fn tag(&self) -> &'static str {
        "oval"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::oval(bounds)
    }
}

/// A straight line across the node's bounds diagonal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineData;

impl GeometryHooks for LineData {
    fn tag(&self) -> &'static str {
        "line"
    }

    fn path(&self, bounds: Rect) -> Path {
        let mut p = Path::new();
        p.move_to(bounds.origin())
            .line_to(DVec2::new(bounds.max_x(), bounds.max_y()));
        p
    }
}

/// A polygon or polyline over explicit local points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolygonData {
    pub points: Vec<DVec2>,
    pub closed: bool,
}

impl GeometryHooks for PolygonData {
    fn tag(&self) -> &'static str {
        "polygon"
    }

    fn path(&self, _bounds: Rect) -> Path {
        Path::polygon(&self.points, self.closed)
    }
}

/// A text box. `successor` is the next box in a linked overflow chain;
/// the chain is singly linked forward.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextData {
    pub string: String,
    pub successor: Option<NodeId>,
}

impl GeometryHooks for TextData {
    fn tag(&self) -> &'static str {
        "text"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }
}

/// An image placed in the node's bounds. Pixel bytes live in the scene's
/// resource store under `resource`; the node only holds the name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageData {
    pub resource: String,
}

impl GeometryHooks for ImageData {
    fn tag(&self) -> &'static str {
        "image-shape"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }
}

/// A 3D inset. Extrusion math is external; within the scene graph this is
/// a plain box with the camera parameters carried for round-trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene3dData {
    pub depth: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl GeometryHooks for Scene3dData {
    fn tag(&self) -> &'static str {
        "scene3d"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }
}

/// A plain grouping container with no geometry of its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupData;

impl GeometryHooks for GroupData {
    fn tag(&self) -> &'static str {
        "group"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }

    fn is_structural(&self) -> bool {
        true
    }
}

impl GeometryHooks for PageData {
    fn tag(&self) -> &'static str {
        "page"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }

    fn is_structural(&self) -> bool {
        true
    }

    fn clips_children(&self) -> bool {
        true
    }
}

impl GeometryHooks for DocData {
    fn tag(&self) -> &'static str {
        "document"
    }

    fn path(&self, bounds: Rect) -> Path {
        Path::rect(bounds)
    }

    fn is_structural(&self) -> bool {
        true
    }
}

/// The closed variant set. The archive registry resolves element tags to
/// these constructors; no other node types exist.
#[enum_dispatch(GeometryHooks)]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Rect(RectData),
    Oval(OvalData),
    Line(LineData),
    Polygon(PolygonData),
    Text(TextData),
    Image(ImageData),
    Scene3d(Scene3dData),
    Group(GroupData),
    Page(PageData),
    Document(DocData),
}

impl NodeKind {
    /// Short human name for error messages.
    pub fn name(&self) -> &'static str {
        self.tag()
    }
}
