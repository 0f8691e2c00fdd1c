//! Per-node state and the geometric mutation contract.
//!
//! Geometry is stored *signed*: negative width/height is the normalized
//! encoding of a flipped rectangle. The canonical accessors (`x`, `y`,
//! `width`, `height`) report the equivalent non-negative rect while the
//! raw fields drive the transform math.
//!
//! Every setter follows the same contract: no-op when the new value equals
//! the current one (post-rounding for roll/scale/skew), repaint requests
//! before and after the change, and a structured change notification
//! carrying (property, old, new). Width/height on container nodes also
//! mark layout dirty.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use glam::{DMat2, DVec2, dvec2};

use crate::errors::SceneError;
use crate::scene::kind::{GeometryHooks, NodeKind};
use crate::scene::style::{Border, Effect, Fill};
use crate::scene::{Change, NodeId, Prop, PropChange, PropValue, Scene};
use crate::transform::{Transform, XformParams};
use crate::types::{Rect, round2};

const EPS: f64 = 1e-6;

/// Keys of the sparse attribute map. This is the complete set the core
/// uses; the map exists so nodes without any of these pay nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttrKey {
    Name,
    Url,
    Locked,
    MinWidth,
    MinHeight,
    PrefWidth,
    PrefHeight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl AttrValue {
    fn to_prop_value(opt: Option<&AttrValue>) -> PropValue {
        match opt {
            None => PropValue::Unset,
            Some(AttrValue::Str(s)) => PropValue::Text(s.clone()),
            Some(AttrValue::Num(n)) => PropValue::Num(*n),
            Some(AttrValue::Bool(b)) => PropValue::Bool(*b),
        }
    }
}

type AttrMap = BTreeMap<AttrKey, AttrValue>;

/// The canonical shared empty attribute map. Every fresh node aliases this
/// one instance; `Arc::make_mut` clones it into private storage on the
/// first write, so the shared instance is never mutated in place (the
/// static itself holds a reference, keeping the count above one).
static EMPTY_ATTRS: LazyLock<Arc<AttrMap>> = LazyLock::new(|| Arc::new(AttrMap::new()));

/// One node in the scene graph: geometry, style, sparse attributes, child
/// list and a non-owning parent back-reference.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    // Raw signed geometry, in the parent's coordinate space.
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,

    /// Roll/scale/skew, allocated only when any is non-default. `None` is
    /// the "not rotated/scaled/skewed" fast-path flag.
    pub(crate) xform: Option<Box<XformParams>>,

    pub(crate) fill: Option<Fill>,
    pub(crate) border: Option<Border>,
    pub(crate) effect: Option<Effect>,
    pub(crate) opacity: f64,
    pub(crate) visible: bool,

    pub(crate) attrs: Arc<AttrMap>,

    pub(crate) needs_layout: bool,
    pub(crate) needs_layout_deep: bool,
    pub(crate) in_layout: bool,

    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Node {
        Node {
            parent: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            xform: None,
            fill: None,
            border: None,
            effect: None,
            opacity: 1.0,
            visible: true,
            attrs: EMPTY_ATTRS.clone(),
            needs_layout: false,
            needs_layout_deep: false,
            in_layout: false,
            kind,
        }
    }

    /// Copy of this node with no parent and no children; used by divide to
    /// clone a container's trailing attributes into a new sibling.
    pub(crate) fn clone_detached(&self) -> Node {
        let mut node = self.clone();
        node.parent = None;
        node.children = Vec::new();
        node.needs_layout = false;
        node.needs_layout_deep = false;
        node.in_layout = false;
        node
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    // ------------------------------------------------------------------
    // Canonical geometry accessors
    // ------------------------------------------------------------------

    /// Canonical x: shifted left by the width when the raw width is
    /// negative.
    pub fn x(&self) -> f64 {
        self.x + self.width.min(0.0)
    }

    pub fn y(&self) -> f64 {
        self.y + self.height.min(0.0)
    }

    /// Canonical non-negative width.
    pub fn width(&self) -> f64 {
        self.width.abs()
    }

    pub fn height(&self) -> f64 {
        self.height.abs()
    }

    /// Raw signed fields, used by the transform math and the archive.
    pub fn x_raw(&self) -> f64 {
        self.x
    }

    pub fn y_raw(&self) -> f64 {
        self.y
    }

    pub fn width_raw(&self) -> f64 {
        self.width
    }

    pub fn height_raw(&self) -> f64 {
        self.height
    }

    /// Local bounds: the canonicalized (0, 0, width, height) box.
    pub fn bounds_local(&self) -> Rect {
        Rect::canonical(0.0, 0.0, self.width, self.height)
    }

    // ------------------------------------------------------------------
    // Transform parameters
    // ------------------------------------------------------------------

    /// Fast-path test: true when the node has no roll/scale/skew block.
    pub fn is_transformed(&self) -> bool {
        self.xform.is_some()
    }

    pub fn roll(&self) -> f64 {
        self.xform.as_ref().map_or(0.0, |p| p.roll)
    }

    pub fn scale_x(&self) -> f64 {
        self.xform.as_ref().map_or(1.0, |p| p.scale_x)
    }

    pub fn scale_y(&self) -> f64 {
        self.xform.as_ref().map_or(1.0, |p| p.scale_y)
    }

    pub fn skew_x(&self) -> f64 {
        self.xform.as_ref().map_or(0.0, |p| p.skew_x)
    }

    pub fn skew_y(&self) -> f64 {
        self.xform.as_ref().map_or(0.0, |p| p.skew_y)
    }

    // ------------------------------------------------------------------
    // Visual attributes
    // ------------------------------------------------------------------

    pub fn fill(&self) -> Option<&Fill> {
        self.fill.as_ref()
    }

    pub fn border(&self) -> Option<&Border> {
        self.border.as_ref()
    }

    pub fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn clips_children(&self) -> bool {
        self.kind.clips_children()
    }

    // ------------------------------------------------------------------
    // Sparse attributes
    // ------------------------------------------------------------------

    pub fn attr(&self, key: AttrKey) -> Option<&AttrValue> {
        self.attrs.get(&key)
    }

    pub fn name(&self) -> Option<&str> {
        match self.attr(AttrKey::Name) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self.attr(AttrKey::Url) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.attr(AttrKey::Locked), Some(AttrValue::Bool(true)))
    }

    fn num_attr(&self, key: AttrKey) -> Option<f64> {
        match self.attr(key) {
            Some(AttrValue::Num(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn min_width(&self) -> Option<f64> {
        self.num_attr(AttrKey::MinWidth)
    }

    pub fn min_height(&self) -> Option<f64> {
        self.num_attr(AttrKey::MinHeight)
    }

    pub fn pref_width(&self) -> Option<f64> {
        self.num_attr(AttrKey::PrefWidth)
    }

    pub fn pref_height(&self) -> Option<f64> {
        self.num_attr(AttrKey::PrefHeight)
    }

    // ------------------------------------------------------------------
    // Layout flags
    // ------------------------------------------------------------------

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    pub fn needs_layout_deep(&self) -> bool {
        self.needs_layout_deep
    }
}

impl Scene {
    // ------------------------------------------------------------------
    // Geometric setters
    // ------------------------------------------------------------------

    pub fn set_x(&mut self, id: NodeId, v: f64) {
        self.set_geom(id, Prop::X, v);
    }

    pub fn set_y(&mut self, id: NodeId, v: f64) {
        self.set_geom(id, Prop::Y, v);
    }

    pub fn set_width(&mut self, id: NodeId, v: f64) {
        self.set_geom(id, Prop::Width, v);
    }

    pub fn set_height(&mut self, id: NodeId, v: f64) {
        self.set_geom(id, Prop::Height, v);
    }

    fn set_geom(&mut self, id: NodeId, prop: Prop, v: f64) {
        let node = &self[id];
        let old = match prop {
            Prop::X => node.x,
            Prop::Y => node.y,
            Prop::Width => node.width,
            Prop::Height => node.height,
            _ => unreachable!("set_geom only handles x/y/width/height"),
        };
        if old == v {
            return;
        }
        // Old region, then new region: both ends of a resize stay fresh.
        self.push_repaint(id);
        let node = &mut self[id];
        match prop {
            Prop::X => node.x = v,
            Prop::Y => node.y = v,
            Prop::Width => node.width = v,
            Prop::Height => node.height = v,
            _ => unreachable!(),
        }
        self.push_repaint(id);
        self.push_change(Change::Property(PropChange {
            node: id,
            prop,
            old: PropValue::Num(old),
            new: PropValue::Num(v),
        }));
        // A resized container rearranges its children.
        if matches!(prop, Prop::Width | Prop::Height) && self.is_container(id) {
            self.invalidate_layout(id);
        }
    }

    pub fn set_roll(&mut self, id: NodeId, v: f64) {
        self.set_xform_param(id, Prop::Roll, v);
    }

    pub fn set_scale_x(&mut self, id: NodeId, v: f64) {
        self.set_xform_param(id, Prop::ScaleX, v);
    }

    pub fn set_scale_y(&mut self, id: NodeId, v: f64) {
        self.set_xform_param(id, Prop::ScaleY, v);
    }

    pub fn set_skew_x(&mut self, id: NodeId, v: f64) {
        self.set_xform_param(id, Prop::SkewX, v);
    }

    pub fn set_skew_y(&mut self, id: NodeId, v: f64) {
        self.set_xform_param(id, Prop::SkewY, v);
    }

    fn set_xform_param(&mut self, id: NodeId, prop: Prop, v: f64) {
        let v = round2(v);
        let node = &self[id];
        let params = node.xform.as_deref();
        let old = match prop {
            Prop::Roll => params.map_or(0.0, |p| p.roll),
            Prop::ScaleX => params.map_or(1.0, |p| p.scale_x),
            Prop::ScaleY => params.map_or(1.0, |p| p.scale_y),
            Prop::SkewX => params.map_or(0.0, |p| p.skew_x),
            Prop::SkewY => params.map_or(0.0, |p| p.skew_y),
            _ => unreachable!("set_xform_param only handles roll/scale/skew"),
        };
        if old == v {
            return;
        }
        self.push_repaint(id);
        let node = &mut self[id];
        let params = node.xform.get_or_insert_with(Default::default);
        match prop {
            Prop::Roll => params.roll = v,
            Prop::ScaleX => params.scale_x = v,
            Prop::ScaleY => params.scale_y = v,
            Prop::SkewX => params.skew_x = v,
            Prop::SkewY => params.skew_y = v,
            _ => unreachable!(),
        }
        // Back to all defaults: drop the block to restore the fast path.
        if params.is_identity() {
            node.xform = None;
        }
        self.push_repaint(id);
        self.push_change(Change::Property(PropChange {
            node: id,
            prop,
            old: PropValue::Num(old),
            new: PropValue::Num(v),
        }));
    }

    // ------------------------------------------------------------------
    // Visual setters
    // ------------------------------------------------------------------

    pub fn set_opacity(&mut self, id: NodeId, v: f64) {
        let v = v.clamp(0.0, 1.0);
        let old = self[id].opacity;
        if old == v {
            return;
        }
        self[id].opacity = v;
        self.push_repaint(id);
        self.push_change(Change::Property(PropChange {
            node: id,
            prop: Prop::Opacity,
            old: PropValue::Num(old),
            new: PropValue::Num(v),
        }));
    }

    pub fn set_visible(&mut self, id: NodeId, v: bool) {
        let old = self[id].visible;
        if old == v {
            return;
        }
        self[id].visible = v;
        self.push_repaint(id);
        self.push_change(Change::Property(PropChange {
            node: id,
            prop: Prop::Visible,
            old: PropValue::Bool(old),
            new: PropValue::Bool(v),
        }));
    }

    pub fn set_fill(&mut self, id: NodeId, fill: Option<Fill>) {
        self.set_style(id, Prop::Fill, fill, |n| &mut n.fill);
    }

    pub fn set_border(&mut self, id: NodeId, border: Option<Border>) {
        self.set_style(id, Prop::Border, border, |n| &mut n.border);
    }

    pub fn set_effect(&mut self, id: NodeId, effect: Option<Effect>) {
        self.set_style(id, Prop::Effect, effect, |n| &mut n.effect);
    }

    fn set_style<T: PartialEq>(
        &mut self,
        id: NodeId,
        prop: Prop,
        value: Option<T>,
        slot: impl Fn(&mut Node) -> &mut Option<T>,
    ) {
        let node = &mut self[id];
        let current = slot(node);
        if *current == value {
            return;
        }
        let old = if current.is_some() {
            PropValue::Opaque
        } else {
            PropValue::Unset
        };
        let new = if value.is_some() {
            PropValue::Opaque
        } else {
            PropValue::Unset
        };
        *current = value;
        self.push_repaint(id);
        self.push_change(Change::Property(PropChange {
            node: id,
            prop,
            old,
            new,
        }));
    }

    // ------------------------------------------------------------------
    // Sparse attribute setters
    // ------------------------------------------------------------------

    /// Set or clear a sparse attribute. The backing map is copy-on-write:
    /// a node sharing the canonical empty map gets a private clone on the
    /// first real write.
    pub fn set_attr(&mut self, id: NodeId, key: AttrKey, value: Option<AttrValue>) {
        let node = &self[id];
        let current = node.attr(key);
        if current == value.as_ref() {
            return;
        }
        let old = AttrValue::to_prop_value(current);
        let new = AttrValue::to_prop_value(value.as_ref());
        let node = &mut self[id];
        let map = Arc::make_mut(&mut node.attrs);
        match value {
            Some(v) => {
                map.insert(key, v);
            }
            None => {
                map.remove(&key);
                // Fully sparse again: re-alias the canonical empty map.
                if map.is_empty() {
                    node.attrs = EMPTY_ATTRS.clone();
                }
            }
        }
        self.push_change(Change::Property(PropChange {
            node: id,
            prop: Prop::Attr(key),
            old,
            new,
        }));
    }

    pub fn set_name(&mut self, id: NodeId, name: Option<&str>) {
        self.set_attr(id, AttrKey::Name, name.map(|s| AttrValue::Str(s.to_string())));
    }

    pub fn set_url(&mut self, id: NodeId, url: Option<&str>) {
        self.set_attr(id, AttrKey::Url, url.map(|s| AttrValue::Str(s.to_string())));
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) {
        let value = locked.then_some(AttrValue::Bool(true));
        self.set_attr(id, AttrKey::Locked, value);
    }

    pub fn set_min_width(&mut self, id: NodeId, v: Option<f64>) {
        self.set_attr(id, AttrKey::MinWidth, v.map(AttrValue::Num));
    }

    pub fn set_min_height(&mut self, id: NodeId, v: Option<f64>) {
        self.set_attr(id, AttrKey::MinHeight, v.map(AttrValue::Num));
    }

    pub fn set_pref_width(&mut self, id: NodeId, v: Option<f64>) {
        self.set_attr(id, AttrKey::PrefWidth, v.map(AttrValue::Num));
    }

    pub fn set_pref_height(&mut self, id: NodeId, v: Option<f64>) {
        self.set_attr(id, AttrKey::PrefHeight, v.map(AttrValue::Num));
    }

    // ------------------------------------------------------------------
    // Coordinate spaces
    // ------------------------------------------------------------------

    /// Local bounds of a node (canonicalized, origin at 0,0).
    pub fn bounds(&self, id: NodeId) -> Rect {
        self[id].bounds_local()
    }

    /// The local→parent transform for a node.
    pub fn local_transform(&self, id: NodeId) -> Transform {
        let n = &self[id];
        Transform::for_node(n.x, n.y, n.width, n.height, n.xform.as_deref())
    }

    /// Compose transforms from a node up to (excluding) `ancestor`; with
    /// `None`, all the way to the document root. Ancestors not on the
    /// parent chain are treated as the root.
    pub fn transform_to_ancestor(&self, id: NodeId, ancestor: Option<NodeId>) -> Transform {
        let mut t = self.local_transform(id);
        let mut cursor = self[id].parent;
        while let Some(cur) = cursor {
            if Some(cur) == ancestor {
                break;
            }
            t = t.then(&self.local_transform(cur));
            cursor = self[cur].parent;
        }
        t
    }

    /// Convert a local point to the parent's space.
    pub fn convert_to_parent(&self, id: NodeId, p: DVec2) -> DVec2 {
        self.local_transform(id).apply(p)
    }

    /// Convert a point in the parent's space to local coordinates.
    pub fn convert_from_parent(&self, id: NodeId, p: DVec2) -> DVec2 {
        self.local_transform(id).invert().apply(p)
    }

    pub fn convert_to_ancestor(&self, id: NodeId, ancestor: Option<NodeId>, p: DVec2) -> DVec2 {
        self.transform_to_ancestor(id, ancestor).apply(p)
    }

    pub fn convert_from_ancestor(&self, id: NodeId, ancestor: Option<NodeId>, p: DVec2) -> DVec2 {
        self.transform_to_ancestor(id, ancestor).invert().apply(p)
    }

    /// True if `ancestor` is on `id`'s parent chain (or is `id` itself).
    pub fn is_ancestor_or_self(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            if cur == ancestor {
                return true;
            }
            cursor = self[cur].parent;
        }
        false
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// The smallest axis-aligned parent-space rect enclosing the
    /// transformed bounds.
    pub fn frame(&self, id: NodeId) -> Rect {
        self.local_transform(id).transform_rect(&self.bounds(id))
    }

    /// Frame expressed in an ancestor's coordinate space.
    pub fn frame_in_ancestor(&self, id: NodeId, ancestor: Option<NodeId>) -> Rect {
        self.transform_to_ancestor(id, ancestor)
            .transform_rect(&self.bounds(id))
    }

    /// Move the frame origin without changing size or transform.
    pub fn set_frame_xy(&mut self, id: NodeId, fx: f64, fy: f64) {
        let cur = self.frame(id);
        let n = &self[id];
        let (nx, ny) = (n.x + fx - cur.x, n.y + fy - cur.y);
        self.set_x(id, nx);
        self.set_y(id, ny);
    }

    /// Resize so the frame has the requested extent.
    ///
    /// For an untransformed node this just sets width/height (keeping the
    /// flip sign). For a transformed node it decomposes the requested
    /// parent-space box into local axis vectors, scales them by the size
    /// ratio and re-derives width, height and skew; when a local axis has
    /// collapsed the skew solution degenerates and roll alone is
    /// re-derived instead. Both paths are idempotent to the 2-decimal
    /// rounding shared by all transform setters.
    pub fn set_frame_size(&mut self, id: NodeId, fw: f64, fh: f64) {
        let node = &self[id];
        if node.xform.is_none() {
            let (sw, sh) = (node.width.signum(), node.height.signum());
            let (sw, sh) = (
                if sw == 0.0 { 1.0 } else { sw },
                if sh == 0.0 { 1.0 } else { sh },
            );
            self.set_width(id, fw * sw);
            self.set_height(id, fh * sh);
            return;
        }

        let params = node.xform.as_deref().cloned().unwrap_or_default();
        let t = self.local_transform(id);
        let f0 = t.transform_rect(&node.bounds_local());
        let rx = if f0.w.abs() > EPS { fw / f0.w } else { 1.0 };
        let ry = if f0.h.abs() > EPS { fh / f0.h } else { 1.0 };

        // Local axis vectors mapped to parent space, then stretched to the
        // requested frame extent. Scaling the x components by rx and the y
        // components by ry scales the enclosing box exactly.
        let vx = t.apply_vector(dvec2(node.width, 0.0));
        let vy = t.apply_vector(dvec2(0.0, node.height));
        let vx = dvec2(vx.x * rx, vx.y * ry);
        let vy = dvec2(vy.x * rx, vy.y * ry);

        // Unrotate; what remains is scale followed by skew.
        let unrotate = DMat2::from_angle(-params.roll.to_radians());
        let ux = unrotate * vx;
        let uy = unrotate * vy;

        let sx = if params.scale_x.abs() > EPS {
            params.scale_x
        } else {
            1.0
        };
        let sy = if params.scale_y.abs() > EPS {
            params.scale_y
        } else {
            1.0
        };

        if ux.x.abs() < EPS || uy.y.abs() < EPS {
            // Degenerate local axis: no skew solution exists. Fall back to
            // a roll-only decomposition.
            let roll = vx.y.atan2(vx.x).to_degrees();
            self.set_roll(id, roll);
            self.set_skew_x(id, 0.0);
            self.set_skew_y(id, 0.0);
            self.set_width(id, vx.length() / sx);
            self.set_height(id, vy.length() / sy);
        } else {
            let w = ux.x / sx;
            let h = uy.y / sy;
            let skew_y = (ux.y / (sy * w)).atan().to_degrees();
            let skew_x = (uy.x / (sx * h)).atan().to_degrees();
            self.set_width(id, w);
            self.set_height(id, h);
            self.set_skew_x(id, skew_x);
            self.set_skew_y(id, skew_y);
        }
    }

    /// Set the full frame: size first, then origin (the origin fix-up uses
    /// the post-resize frame).
    pub fn set_frame(&mut self, id: NodeId, f: Rect) {
        self.set_frame_size(id, f.w, f.h);
        self.set_frame_xy(id, f.x, f.y);
    }

    // ------------------------------------------------------------------
    // Linked text chain
    // ------------------------------------------------------------------

    /// Successor in a linked-text overflow chain, if this is a text node
    /// with one.
    pub fn linked_successor(&self, id: NodeId) -> Option<NodeId> {
        match &self[id].kind {
            NodeKind::Text(t) => t.successor,
            _ => None,
        }
    }

    /// Link (or unlink) a text node's overflow successor.
    pub fn set_linked_successor(
        &mut self,
        id: NodeId,
        successor: Option<NodeId>,
    ) -> Result<(), SceneError> {
        let node = &mut self[id];
        let NodeKind::Text(text) = &mut node.kind else {
            return Err(SceneError::WrongKind {
                expected: "text",
                got: node.kind.name(),
            });
        };
        if text.successor == successor {
            return Ok(());
        }
        text.successor = successor;
        self.push_change(Change::Property(PropChange {
            node: id,
            prop: Prop::LinkedSuccessor,
            old: PropValue::Opaque,
            new: PropValue::Opaque,
        }));
        Ok(())
    }

    /// Rewire the chain around a node being detached: the predecessor's
    /// successor becomes the detached node's successor, and the detached
    /// node leaves the chain entirely.
    pub(crate) fn unlink_from_chain(&mut self, id: NodeId) {
        let successor = match &self[id].kind {
            NodeKind::Text(t) => t.successor,
            _ => return,
        };
        let predecessor = self.node_ids().find(|&other| {
            other != id
                && matches!(&self[other].kind, NodeKind::Text(t) if t.successor == Some(id))
        });
        if let Some(pred) = predecessor {
            // Both are known text nodes; the Results cannot fail.
            let _ = self.set_linked_successor(pred, successor);
        }
        let _ = self.set_linked_successor(id, None);
    }
}
