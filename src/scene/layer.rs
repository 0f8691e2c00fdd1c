//! The page/layer partition.
//!
//! A page groups its children into named, orderable layers. Every page
//! child belongs to exactly one layer, and concatenating the layers'
//! child lists in layer order always reconstructs the page's child list
//! (`order_children_from_layers` re-establishes this after any layer
//! edit). Layer visibility/lock state drives painting and hit-testing for
//! the children it owns; the selected layer is the active editing layer.

use crate::errors::SceneError;
use crate::scene::kind::NodeKind;
use crate::scene::{Change, NodeId, Prop, PropChange, PropValue, Scene};

/// A named, independently visible/lockable slice of a page's children.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub(crate) children: Vec<NodeId>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Layer {
        Layer {
            name: name.into(),
            visible: true,
            locked: false,
            children: Vec::new(),
        }
    }

    /// The page children this layer owns, in z-order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Kind payload for page nodes: the layer list and the selected layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PageData {
    pub(crate) layers: Vec<Layer>,
    pub(crate) selected_layer: usize,
}

impl PageData {
    /// A page starts with one layer; it can never drop below one.
    pub fn with_default_layer() -> PageData {
        PageData {
            layers: vec![Layer::new("Layer 1")],
            selected_layer: 0,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn selected_layer_index(&self) -> usize {
        self.selected_layer
    }

    /// Which layer owns a page child.
    pub fn layer_index_of(&self, child: NodeId) -> Option<usize> {
        self.layers
            .iter()
            .position(|l| l.children.contains(&child))
    }

    /// Index of the first child of layer `index` in the flattened list.
    fn layer_start(&self, index: usize) -> usize {
        self.layers[..index].iter().map(|l| l.children.len()).sum()
    }
}

impl Scene {
    fn page_data(&self, page: NodeId) -> Result<&PageData, SceneError> {
        match &self[page].kind {
            NodeKind::Page(data) => Ok(data),
            other => Err(SceneError::WrongKind {
                expected: "page",
                got: other.name(),
            }),
        }
    }

    fn page_data_mut(&mut self, page: NodeId) -> Result<&mut PageData, SceneError> {
        match &mut self[page].kind {
            NodeKind::Page(data) => Ok(data),
            _ => Err(SceneError::WrongKind {
                expected: "page",
                got: "other",
            }),
        }
    }

    pub fn layers(&self, page: NodeId) -> Result<&[Layer], SceneError> {
        Ok(self.page_data(page)?.layers())
    }

    pub fn selected_layer(&self, page: NodeId) -> Result<usize, SceneError> {
        Ok(self.page_data(page)?.selected_layer)
    }

    /// Which layer owns a page child.
    pub fn layer_of(&self, page: NodeId, child: NodeId) -> Result<Option<usize>, SceneError> {
        Ok(self.page_data(page)?.layer_index_of(child))
    }

    // ------------------------------------------------------------------
    // Child routing (page side of add_child/remove_child)
    // ------------------------------------------------------------------

    /// Page route for `add_child`: membership goes into the selected
    /// layer, clamped into its z-range, then the flattened list is
    /// rebuilt so it stays the concatenation of the layers.
    pub(crate) fn page_add_child(
        &mut self,
        page: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), SceneError> {
        // Pre-detach from a previous page parent so both its layer list
        // and child list are consistent before we compute spans.
        if let Some(old_parent) = self[child].parent {
            if matches!(self[old_parent].kind, NodeKind::Page(_)) {
                self.page_remove_child(old_parent, child);
            }
        }
        let data = self.page_data(page)?;
        let selected = data.selected_layer;
        let start = data.layer_start(selected);
        let span = data.layers[selected].children.len();
        // A child cannot land outside its layer's z-range.
        let global = index.clamp(start, start + span);
        let local = global - start;
        let data = self.page_data_mut(page)?;
        data.layers[selected].children.insert(local, child);
        self.attach(page, child, global);
        Ok(())
    }

    /// Page route for `remove_child`: drop layer membership, then detach
    /// from the flattened list.
    pub(crate) fn page_remove_child(&mut self, page: NodeId, child: NodeId) {
        if let Ok(data) = self.page_data_mut(page) {
            if let Some(layer_index) = data.layer_index_of(child) {
                data.layers[layer_index].children.retain(|&c| c != child);
            }
        }
        if let Some(index) = self.index_of(page, child) {
            self.detach(page, index);
        }
    }

    /// Rebuild the page's flattened child list from its layers. The
    /// invariant: `page.children == concat(layers[i].children)`.
    pub fn order_children_from_layers(&mut self, page: NodeId) -> Result<(), SceneError> {
        let flattened: Vec<NodeId> = self
            .page_data(page)?
            .layers
            .iter()
            .flat_map(|l| l.children.iter().copied())
            .collect();
        if self[page].children != flattened {
            self[page].children = flattened;
            self.push_repaint(page);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Layer list management
    // ------------------------------------------------------------------

    /// Add a new front-most layer and select it.
    pub fn add_layer(&mut self, page: NodeId, name: impl Into<String>) -> Result<usize, SceneError> {
        let data = self.page_data_mut(page)?;
        data.layers.push(Layer::new(name));
        let index = data.layers.len() - 1;
        self.select_layer_index(page, index)?;
        Ok(index)
    }

    /// Remove a layer, merging its children into the layer behind it (or
    /// the one in front, for the bottom layer). Refuses to remove the
    /// last remaining layer.
    pub fn remove_layer(&mut self, page: NodeId, index: usize) -> Result<(), SceneError> {
        let data = self.page_data_mut(page)?;
        let len = data.layers.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(SceneError::LastLayer);
        }
        let removed = data.layers.remove(index);
        let target = if index > 0 { index - 1 } else { 0 };
        data.layers[target].children.extend(removed.children);
        if data.selected_layer >= data.layers.len() {
            data.selected_layer = data.layers.len() - 1;
        }
        self.order_children_from_layers(page)?;
        self.push_change(Change::Property(PropChange {
            node: page,
            prop: Prop::SelectedLayer,
            old: PropValue::Opaque,
            new: PropValue::Opaque,
        }));
        Ok(())
    }

    /// Select a layer by name.
    pub fn select_layer(&mut self, page: NodeId, name: &str) -> Result<(), SceneError> {
        let data = self.page_data(page)?;
        let index = data
            .layers
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| SceneError::UnknownLayer {
                name: name.to_string(),
            })?;
        self.select_layer_index(page, index)
    }

    pub fn select_layer_index(&mut self, page: NodeId, index: usize) -> Result<(), SceneError> {
        let data = self.page_data_mut(page)?;
        let len = data.layers.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        let old = data.selected_layer;
        if old == index {
            return Ok(());
        }
        data.selected_layer = index;
        self.push_change(Change::Property(PropChange {
            node: page,
            prop: Prop::SelectedLayer,
            old: PropValue::Num(old as f64),
            new: PropValue::Num(index as f64),
        }));
        Ok(())
    }

    /// Create a new layer and move the given page children into it (in
    /// the order given). The new layer becomes selected.
    pub fn move_children_to_new_layer(
        &mut self,
        page: NodeId,
        children: &[NodeId],
        name: impl Into<String>,
    ) -> Result<usize, SceneError> {
        let index = self.add_layer(page, name)?;
        let data = self.page_data_mut(page)?;
        for &child in children {
            if let Some(owner) = data.layer_index_of(child) {
                data.layers[owner].children.retain(|&c| c != child);
                data.layers[index].children.push(child);
            }
        }
        self.order_children_from_layers(page)?;
        self.push_repaint(page);
        Ok(index)
    }

    pub fn set_layer_visible(
        &mut self,
        page: NodeId,
        index: usize,
        visible: bool,
    ) -> Result<(), SceneError> {
        let data = self.page_data_mut(page)?;
        let len = data.layers.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        if data.layers[index].visible != visible {
            data.layers[index].visible = visible;
            self.push_repaint(page);
        }
        Ok(())
    }

    pub fn set_layer_locked(
        &mut self,
        page: NodeId,
        index: usize,
        locked: bool,
    ) -> Result<(), SceneError> {
        let data = self.page_data_mut(page)?;
        let len = data.layers.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        data.layers[index].locked = locked;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Z-order
    // ------------------------------------------------------------------

    /// Move a node to the front of its siblings. Inside a page this is
    /// per-layer: the child moves to the front of its own layer's range
    /// and cannot leave it.
    pub fn bring_to_front(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.reorder(id, true)
    }

    /// Move a node behind its siblings (within its layer, for page
    /// children).
    pub fn send_to_back(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.reorder(id, false)
    }

    fn reorder(&mut self, id: NodeId, to_front: bool) -> Result<(), SceneError> {
        let parent = self[id].parent.ok_or(SceneError::StaleNode)?;
        if let Ok(data) = self.page_data_mut(parent) {
            let Some(layer_index) = data.layer_index_of(id) else {
                return Err(SceneError::StaleNode);
            };
            let layer = &mut data.layers[layer_index];
            layer.children.retain(|&c| c != id);
            if to_front {
                layer.children.push(id);
            } else {
                layer.children.insert(0, id);
            }
            self.order_children_from_layers(parent)?;
            self.push_repaint(id);
            return Ok(());
        }
        let index = self
            .index_of(parent, id)
            .ok_or(SceneError::StaleNode)?;
        let new_index = if to_front {
            self[parent].children.len() - 1
        } else {
            0
        };
        if index != new_index {
            self[parent].children.remove(index);
            self[parent].children.insert(new_index, id);
            self.push_repaint(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::kind::RectData;

    fn page_with_shapes(n: usize) -> (Scene, NodeId, Vec<NodeId>) {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let mut shapes = Vec::new();
        for _ in 0..n {
            let id = scene.create(NodeKind::Rect(RectData::default()));
            scene.append_child(page, id).unwrap();
            shapes.push(id);
        }
        (scene, page, shapes)
    }

    fn assert_flatten_invariant(scene: &Scene, page: NodeId) {
        let data = match &scene[page].kind {
            NodeKind::Page(d) => d,
            _ => unreachable!(),
        };
        let flattened: Vec<NodeId> = data
            .layers
            .iter()
            .flat_map(|l| l.children.iter().copied())
            .collect();
        assert_eq!(scene[page].children(), flattened.as_slice());
    }

    #[test]
    fn children_concatenate_from_layers() {
        let (mut scene, page, shapes) = page_with_shapes(2);
        assert_flatten_invariant(&scene, page);

        scene.add_layer(page, "Layer 2").unwrap();
        let extra = scene.create(NodeKind::Rect(RectData::default()));
        scene.append_child(page, extra).unwrap();
        assert_flatten_invariant(&scene, page);
        assert_eq!(scene.layer_of(page, extra).unwrap(), Some(1));
        assert_eq!(scene.layer_of(page, shapes[0]).unwrap(), Some(0));

        scene.bring_to_front(shapes[0]).unwrap();
        assert_flatten_invariant(&scene, page);
        // Front of its own layer, still behind layer 2's children.
        assert_eq!(scene[page].children(), &[shapes[1], shapes[0], extra]);

        scene.send_to_back(extra).unwrap();
        assert_flatten_invariant(&scene, page);
        assert_eq!(scene[page].children(), &[shapes[1], shapes[0], extra]);
    }

    #[test]
    fn remove_layer_refuses_last_and_merges_children() {
        let (mut scene, page, shapes) = page_with_shapes(1);
        assert!(matches!(
            scene.remove_layer(page, 0),
            Err(SceneError::LastLayer)
        ));

        scene.add_layer(page, "Layer 2").unwrap();
        let extra = scene.create(NodeKind::Rect(RectData::default()));
        scene.append_child(page, extra).unwrap();
        scene.remove_layer(page, 1).unwrap();
        assert_flatten_invariant(&scene, page);
        assert_eq!(scene.layers(page).unwrap().len(), 1);
        assert_eq!(scene.layer_of(page, extra).unwrap(), Some(0));
        assert_eq!(scene[page].children(), &[shapes[0], extra]);
    }

    #[test]
    fn selected_layer_is_always_hittable() {
        let (mut scene, page, shapes) = page_with_shapes(1);
        let a = shapes[0];
        scene.add_layer(page, "Layer 2").unwrap();
        let b = scene.create(NodeKind::Rect(RectData::default()));
        scene.append_child(page, b).unwrap();

        // Lock layer 1 (not selected; layer 2 is).
        scene.set_layer_locked(page, 0, true).unwrap();
        assert!(!scene.is_hittable(a));
        assert!(scene.is_hittable(b));

        // Selecting layer 1 overrides its lock for editing.
        scene.select_layer(page, "Layer 1").unwrap();
        assert!(scene.is_hittable(a));

        // Hidden-but-selected stays hittable, but not visible.
        scene.set_layer_visible(page, 0, false).unwrap();
        assert!(scene.is_hittable(a));
        assert!(!scene.is_visible(a));
    }

    #[test]
    fn move_children_to_new_layer_keeps_invariant() {
        let (mut scene, page, shapes) = page_with_shapes(3);
        scene
            .move_children_to_new_layer(page, &[shapes[0], shapes[2]], "Extracted")
            .unwrap();
        assert_flatten_invariant(&scene, page);
        assert_eq!(scene.layer_of(page, shapes[0]).unwrap(), Some(1));
        assert_eq!(scene.layer_of(page, shapes[1]).unwrap(), Some(0));
        assert_eq!(scene[page].children(), &[shapes[1], shapes[0], shapes[2]]);
    }
}
