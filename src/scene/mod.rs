//! The scene graph: arena, node model, containers, layers, document root.
//!
//! This module is organized into submodules:
//! - `node`: per-node state, the geometric mutation contract, frame math
//! - `kind`: the closed variant set and per-kind hooks
//! - `container`: child management, layout scheduling, hit testing
//! - `layer`: the page/layer partition
//! - `document`: page list and arrangement modes
//! - `style`: fills, borders, effects, colors
//! - `paint`: the paint traversal and `Canvas` interface
//! - `coordinator`: the host-facing viewer facade
//!
//! Nodes live in a slab owned by `Scene` and refer to each other by
//! `NodeId`. Parents own their children's ids; a child's parent link is a
//! non-owning back-reference used only for upward queries (dirty
//! propagation, coordinate conversion, ancestor search). All mutation goes
//! through `&mut Scene` on one thread; notifications accumulate on the
//! scene and are drained by the coordinator after each operation.

pub mod container;
pub mod coordinator;
pub mod document;
pub mod kind;
pub mod layer;
pub mod node;
pub mod paint;
pub mod style;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};

pub use coordinator::{Host, Viewer};
pub use document::{DocData, Margins, PageLayout};
pub use kind::{
    GeometryHooks, GroupData, ImageData, LineData, NodeKind, OvalData, PolygonData, RectData,
    Scene3dData, TextData,
};
pub use layer::{Layer, PageData};
pub use node::{AttrKey, AttrValue, Node};
pub use paint::{Canvas, Path, PathEl};
pub use style::{Border, Color, Effect, Fill};

use crate::scene::document::page_size_default;

/// Handle to a node slot in a `Scene`. Only meaningful for the scene that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which property changed, for change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    X,
    Y,
    Width,
    Height,
    Roll,
    ScaleX,
    ScaleY,
    SkewX,
    SkewY,
    Opacity,
    Visible,
    Fill,
    Border,
    Effect,
    Attr(AttrKey),
    LinkedSuccessor,
    SelectedPage,
    PageLayout,
    Unit,
    SelectedLayer,
}

/// Old/new value carried by a property change. Structured values (fills,
/// borders, effects) report `Opaque`; listeners that care re-read the
/// node.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Num(f64),
    Bool(bool),
    Text(String),
    Opaque,
    Unset,
}

/// A single property mutation on one node.
#[derive(Debug, Clone, PartialEq)]
pub struct PropChange {
    pub node: NodeId,
    pub prop: Prop,
    pub old: PropValue,
    pub new: PropValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    ChildAdded,
    ChildRemoved,
}

/// A change notification: either a property edit or a structural edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Property(PropChange),
    Structure {
        parent: NodeId,
        kind: StructureKind,
        index: usize,
        child: NodeId,
    },
}

impl Change {
    /// The node this change originated at.
    pub fn origin(&self) -> NodeId {
        match self {
            Change::Property(c) => c.node,
            Change::Structure { parent, .. } => *parent,
        }
    }
}

/// Notifications accumulated on the scene, drained by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Changed(Change),
    /// Repaint request tagged with the originating node. Pushed before a
    /// geometric change (old region) and after it (new region).
    Repaint(NodeId),
    /// Some node became layout-dirty; one relayout should be scheduled.
    NeedsLayout,
}

/// The node arena plus document-wide state: resource store and the
/// pending notification queue.
pub struct Scene {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    root: NodeId,
    events: Vec<SceneEvent>,
    resources: BTreeMap<String, Vec<u8>>,
    next_resource: u32,
    /// Depth of in-progress `layout_deep` passes; dirty marking is
    /// suppressed while nonzero (an arrangement algorithm that dirties its
    /// own subtree during layout is a contract violation).
    pub(crate) layout_pass_depth: u32,
}

impl Scene {
    /// A new document with one page of the given size (points) and one
    /// layer.
    pub fn new(page_width: f64, page_height: f64) -> Scene {
        let mut scene = Scene::empty();
        let page = scene.create_page();
        {
            let node = &mut scene[page];
            node.width = page_width;
            node.height = page_height;
        }
        let root = scene.root;
        scene
            .add_child(root, page, 0)
            .expect("adding the first page to a fresh document cannot fail");
        scene.events.clear();
        scene
    }

    /// A new document with a default letter-sized page.
    pub fn new_letter() -> Scene {
        let (w, h) = page_size_default();
        Scene::new(w, h)
    }

    /// A scene holding only a document root, no pages. Used by the archive
    /// reader, which restores pages itself (and guarantees at least one
    /// before handing the scene out).
    pub(crate) fn empty() -> Scene {
        let mut scene = Scene {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            events: Vec::new(),
            resources: BTreeMap::new(),
            next_resource: 1,
            layout_pass_depth: 0,
        };
        let root = scene.create(NodeKind::Document(DocData::default()));
        scene.root = root;
        scene
    }

    /// The document root node.
    pub fn document(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node of the given kind. It joins the tree via
    /// `add_child`.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Allocate a detached page with one layer.
    pub fn create_page(&mut self) -> NodeId {
        self.create(NodeKind::Page(PageData::with_default_layer()))
    }

    /// Place a fully built node into a fresh slot. Its recorded children
    /// get their parent links pointed at the new id.
    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        let children = node.children.clone();
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        };
        for child in children {
            self[child].parent = Some(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Free a *detached* subtree's slots. The ids become invalid; using
    /// them afterwards is a programmer error.
    pub fn release(&mut self, id: NodeId) {
        debug_assert!(
            self.get(id).is_none_or(|n| n.parent.is_none()),
            "release requires a detached node"
        );
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.slots[next.0 as usize].take() {
                stack.extend(node.children);
                self.free.push(next.0);
            }
        }
    }

    /// Number of live nodes (all kinds, attached or not).
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live node id, in slot order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Drain accumulated notifications. The coordinator calls this after
    /// every mutating operation and forwards to the host.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    pub(crate) fn push_change(&mut self, change: Change) {
        self.events.push(SceneEvent::Changed(change));
    }

    pub(crate) fn push_repaint(&mut self, node: NodeId) {
        self.events.push(SceneEvent::Repaint(node));
    }

    // ------------------------------------------------------------------
    // Resource store
    // ------------------------------------------------------------------

    /// Store resource bytes under a generated name and return the name.
    /// Image nodes reference resources by name only; the archive writes
    /// the bytes out-of-band under the document root.
    pub fn add_resource(&mut self, bytes: Vec<u8>) -> String {
        loop {
            let name = format!("resource-{}", self.next_resource);
            self.next_resource += 1;
            if !self.resources.contains_key(&name) {
                self.resources.insert(name.clone(), bytes);
                return name;
            }
        }
    }

    /// Store resource bytes under an explicit name (archive reader path).
    pub fn add_named_resource(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.resources.insert(name.into(), bytes);
    }

    pub fn resource(&self, name: &str) -> Option<&[u8]> {
        self.resources.get(name).map(|v| v.as_slice())
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl Index<NodeId> for Scene {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {id}"),
        }
    }
}

impl IndexMut<NodeId> for Scene {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {id}"),
        }
    }
}

/// Compact tree dump for `{:?}`, one node per line.
impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(
            scene: &Scene,
            id: NodeId,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            let node = &scene[id];
            writeln!(
                f,
                "{:indent$}{} {} [{} {} {} {}]",
                "",
                node.kind.name(),
                id,
                node.x,
                node.y,
                node.width,
                node.height,
                indent = depth * 2
            )?;
            for &child in &node.children {
                walk(scene, child, depth + 1, f)?;
            }
            Ok(())
        }
        walk(self, self.root, 0, f)
    }
}
