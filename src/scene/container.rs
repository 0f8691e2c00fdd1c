//! Child management, layout scheduling, hit testing and the divide
//! operation.
//!
//! Child list order is paint order: later children are front-most. Two
//! dirty flags drive deferred layout: "self needs layout" on the changed
//! container and "descendant needs layout" on every strict ancestor, both
//! cleared only by a successful layout pass. Re-entrancy guards keep an
//! in-progress layout from re-triggering itself.

use glam::DVec2;

use crate::errors::SceneError;
use crate::scene::kind::{GeometryHooks, NodeKind};
use crate::scene::{Change, NodeId, Scene, SceneEvent, StructureKind};
use crate::types::Rect;

impl Scene {
    /// True for kinds that arrange children (document, page, group) and
    /// for any node that currently has children.
    pub fn is_container(&self, id: NodeId) -> bool {
        self[id].kind.is_structural() || !self[id].children.is_empty()
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self[parent].children.iter().position(|&c| c == child)
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Insert `child` into `parent` at `index`.
    ///
    /// A child that already has a parent is silently detached first (this
    /// is a reparent, not an error). Inserting past the end of the child
    /// list fails with `IndexOutOfRange` before any state changes.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), SceneError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(SceneError::StaleNode);
        }
        if self.is_ancestor_or_self(parent, child) {
            return Err(SceneError::WouldCreateCycle);
        }
        let len = self[parent].children.len();
        if index > len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        if let NodeKind::Page(_) = self[parent].kind {
            return self.page_add_child(parent, child, index);
        }
        self.attach(parent, child, index);
        Ok(())
    }

    /// Append `child` as the front-most child of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), SceneError> {
        let len = self[parent].children.len();
        self.add_child(parent, child, len)
    }

    /// Raw insert: implicit detach, back-reference, notification, dirty
    /// propagation. Page-level routing happens above this.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId, mut index: usize) {
        if let Some(old_parent) = self[child].parent {
            if let Some(old_index) = self.index_of(old_parent, child) {
                if old_parent == parent && old_index < index {
                    index -= 1;
                }
                self.detach(old_parent, old_index);
            }
        }
        self[child].parent = Some(parent);
        self[parent].children.insert(index, child);
        self.push_repaint(child);
        self.push_change(Change::Structure {
            parent,
            kind: StructureKind::ChildAdded,
            index,
            child,
        });
        self.invalidate_layout(parent);
    }

    /// Raw removal by index: clears the back-reference, fires the
    /// structural notification, dirties layout. Does not touch linked-text
    /// chains (reparenting keeps chains intact).
    pub(crate) fn detach(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self[parent].children.remove(index);
        self[child].parent = None;
        self.push_repaint(parent);
        self.push_change(Change::Structure {
            parent,
            kind: StructureKind::ChildRemoved,
            index,
            child,
        });
        self.invalidate_layout(parent);
        child
    }

    /// Remove the child at `index`. The node stays allocated (and can be
    /// re-added); linked-text chains are rewired around it.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        index: usize,
    ) -> Result<NodeId, SceneError> {
        let len = self[parent].children.len();
        if index >= len {
            return Err(SceneError::IndexOutOfRange { index, len });
        }
        let child = self[parent].children[index];
        if let NodeKind::Page(_) = self[parent].kind {
            self.page_remove_child(parent, child);
        } else {
            self.detach(parent, index);
        }
        self.unlink_from_chain(child);
        Ok(child)
    }

    /// Remove a node from its parent, wherever it is.
    pub fn remove_node(&mut self, child: NodeId) -> Result<(), SceneError> {
        let parent = self[child].parent.ok_or(SceneError::StaleNode)?;
        let index = self
            .index_of(parent, child)
            .ok_or(SceneError::StaleNode)?;
        self.remove_child(parent, index)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Layout scheduling
    // ------------------------------------------------------------------

    /// Mark a container layout-dirty and every strict ancestor
    /// descendant-dirty. Suppressed during a layout pass: arrangement
    /// algorithms must not dirty their own subtree.
    pub fn invalidate_layout(&mut self, id: NodeId) {
        if self.layout_pass_depth > 0 {
            return;
        }
        self[id].needs_layout = true;
        let mut cursor = self[id].parent;
        while let Some(cur) = cursor {
            if self[cur].needs_layout_deep {
                // Already propagated from here up.
                break;
            }
            self[cur].needs_layout_deep = true;
            cursor = self[cur].parent;
        }
        self.push_event(SceneEvent::NeedsLayout);
    }

    /// Run this node's arrangement algorithm synchronously and clear its
    /// "self dirty" flag. No-ops if a layout for this node is already on
    /// the stack.
    pub fn layout(&mut self, id: NodeId) {
        if self[id].in_layout {
            return;
        }
        self[id].in_layout = true;
        self.layout_pass_depth += 1;
        self.run_arrangement(id);
        self.layout_pass_depth -= 1;
        let node = &mut self[id];
        node.needs_layout = false;
        node.in_layout = false;
    }

    /// Lay out this node if dirty, then recurse into every dirty
    /// descendant, clearing both flags. Converges in a single pass: each
    /// container is laid out at most once.
    pub fn layout_deep(&mut self, id: NodeId) {
        if self[id].in_layout {
            return;
        }
        if self[id].needs_layout {
            self.layout(id);
        }
        if self[id].needs_layout_deep {
            for child in self[id].children.clone() {
                if self[child].needs_layout || self[child].needs_layout_deep {
                    self.layout_deep(child);
                }
            }
            self[id].needs_layout_deep = false;
        }
    }

    fn run_arrangement(&mut self, id: NodeId) {
        match &self[id].kind {
            NodeKind::Document(_) => self.arrange_pages(id),
            // Pages and groups keep children where the user put them.
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Geometry over children
    // ------------------------------------------------------------------

    /// Union of the children's frames, in this node's coordinates.
    pub fn bounds_of_children(&self, id: NodeId) -> Rect {
        let mut iter = self[id].children.iter().map(|&c| self.frame(c));
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(first, |acc, f| acc.union(&f))
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Whether a point/shape query may land on this node. Locked or
    /// invisible nodes are skipped; a page child additionally defers to
    /// its layer, where the currently selected layer is always eligible
    /// even when marked invisible (it is the active editing layer).
    pub fn is_hittable(&self, id: NodeId) -> bool {
        let node = &self[id];
        if node.is_locked() {
            return false;
        }
        if let Some(parent) = node.parent {
            if let NodeKind::Page(page) = &self[parent].kind {
                if let Some(layer_index) = page.layer_index_of(id) {
                    // Selected-layer override: the active editing layer
                    // stays interactive even when locked or hidden for
                    // painting.
                    let selected = page.selected_layer == layer_index;
                    let layer = &page.layers[layer_index];
                    return node.visible && (selected || (!layer.locked && layer.visible));
                }
            }
        }
        node.visible
    }

    /// Whether a node paints. A page child defers entirely to its layer's
    /// visible flag (no selected-layer exception for painting).
    pub fn is_visible(&self, id: NodeId) -> bool {
        let node = &self[id];
        if !node.visible {
            return false;
        }
        if let Some(parent) = node.parent {
            if let NodeKind::Page(page) = &self[parent].kind {
                if let Some(layer_index) = page.layer_index_of(id) {
                    return page.layers[layer_index].visible;
                }
            }
        }
        true
    }

    /// Front-most hittable direct child containing the point (given in
    /// this node's local coordinates).
    pub fn child_at_point(&self, id: NodeId, p: DVec2) -> Option<NodeId> {
        for &child in self[id].children.iter().rev() {
            if !self.is_hittable(child) {
                continue;
            }
            let local = self.convert_from_parent(child, p);
            if self[child].bounds_local().contains(local) {
                return Some(child);
            }
        }
        None
    }

    /// Deepest hittable descendant containing the point, walking children
    /// back-to-front at every level so the front-most wins.
    pub fn deepest_at_point(&self, id: NodeId, p: DVec2) -> Option<NodeId> {
        let child = self.child_at_point(id, p)?;
        let local = self.convert_from_parent(child, p);
        Some(self.deepest_at_point(child, local).unwrap_or(child))
    }

    // ------------------------------------------------------------------
    // Divide
    // ------------------------------------------------------------------

    /// Split a container at a horizontal offset (local coordinates),
    /// producing a new sibling immediately after it.
    ///
    /// Children entirely above the split stay; children entirely below
    /// move into the sibling, translated up by the offset; containers
    /// straddling the split are divided recursively and their lower
    /// fragment moves into the sibling, which grows if needed to preserve
    /// the fragment's distance from the bottom edge.
    pub fn divide(
        &mut self,
        id: NodeId,
        offset: f64,
    ) -> Result<NodeId, SceneError> {
        let parent = self[id].parent.ok_or(SceneError::StaleNode)?;
        let old_height = self[id].height();

        // Clone trailing attributes into the new sibling. A cloned page
        // keeps its layer structure but no child memberships.
        let mut sibling = self[id].clone_detached();
        if let NodeKind::Page(page) = &mut sibling.kind {
            for layer in &mut page.layers {
                layer.children.clear();
            }
        }
        sibling.y = self[id].y + offset;
        sibling.height = (old_height - offset).max(0.0);
        let new_id = self.insert_node(sibling);

        self.set_height(id, offset);
        let at = self
            .index_of(parent, id)
            .ok_or(SceneError::StaleNode)?;
        self.add_child(parent, new_id, at + 1)?;

        for child in self[id].children.clone() {
            let frame = self.frame(child);
            if frame.max_y() <= offset {
                // Above the split: unchanged.
                continue;
            }
            if frame.y >= offset {
                // Below: move into the sibling, shifted up.
                let len = self[new_id].children.len();
                self.add_child(new_id, child, len)?;
                let y = self[child].y;
                self.set_y(child, y - offset);
                continue;
            }
            // Straddling.
            let bottom_margin = old_height - frame.max_y();
            if self.is_container(child) {
                let fragment = self.divide(child, offset - frame.y)?;
                let len = self[new_id].children.len();
                self.add_child(new_id, fragment, len)?;
                let y = self[fragment].y;
                self.set_y(fragment, y - offset);
                let needed = self.frame(fragment).max_y() + bottom_margin;
                if self[new_id].height() < needed {
                    self.set_height(new_id, needed);
                }
            } else {
                // A leaf cannot be split; it travels with the lower half.
                let len = self[new_id].children.len();
                self.add_child(new_id, child, len)?;
                let y = self[child].y;
                self.set_y(child, y - offset);
            }
        }
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SceneError;
    use crate::scene::kind::{GroupData, RectData};
    use glam::dvec2;

    fn shape(scene: &mut Scene, parent: NodeId, frame: Rect) -> NodeId {
        let id = scene.create(NodeKind::Rect(RectData::default()));
        scene.append_child(parent, id).unwrap();
        scene.set_frame(id, frame);
        id
    }

    #[test]
    fn add_child_rejects_out_of_range_index() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let id = scene.create(NodeKind::Rect(RectData::default()));
        let err = scene.add_child(page, id, 5).unwrap_err();
        assert!(matches!(err, SceneError::IndexOutOfRange { index: 5, .. }));
        // No partial mutation.
        assert_eq!(scene[id].parent(), None);
        assert!(scene[page].children().is_empty());
    }

    #[test]
    fn add_child_reparents_implicitly() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let group_a = scene.create(NodeKind::Group(GroupData));
        let group_b = scene.create(NodeKind::Group(GroupData));
        scene.append_child(page, group_a).unwrap();
        scene.append_child(page, group_b).unwrap();
        let child = scene.create(NodeKind::Rect(RectData::default()));
        scene.append_child(group_a, child).unwrap();

        scene.append_child(group_b, child).unwrap();
        assert_eq!(scene[child].parent(), Some(group_b));
        assert!(scene[group_a].children().is_empty());
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let outer = scene.create(NodeKind::Group(GroupData));
        let inner = scene.create(NodeKind::Group(GroupData));
        scene.append_child(page, outer).unwrap();
        scene.append_child(outer, inner).unwrap();
        let err = scene.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, SceneError::WouldCreateCycle));
    }

    #[test]
    fn dirty_flags_converge_after_one_deep_pass() {
        let mut scene = Scene::new_letter();
        let doc = scene.document();
        let page = scene[doc].children()[0];
        shape(&mut scene, page, Rect::new(10.0, 10.0, 50.0, 50.0));
        scene.set_width(page, 500.0);

        scene.layout_deep(doc);
        for id in scene.node_ids().collect::<Vec<_>>() {
            assert!(!scene[id].needs_layout(), "{id} still self-dirty");
            assert!(!scene[id].needs_layout_deep(), "{id} still deep-dirty");
        }
        // Immediately again: a no-op, no new events.
        scene.take_events();
        scene.layout_deep(doc);
        assert!(scene.take_events().is_empty());
    }

    #[test]
    fn hit_testing_prefers_front_most_child() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let back = shape(&mut scene, page, Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = shape(&mut scene, page, Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(scene.child_at_point(page, dvec2(75.0, 75.0)), Some(front));
        assert_eq!(scene.child_at_point(page, dvec2(25.0, 25.0)), Some(back));
        assert_eq!(scene.child_at_point(page, dvec2(300.0, 300.0)), None);
    }

    #[test]
    fn locked_nodes_are_not_hittable() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let id = shape(&mut scene, page, Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_locked(id, true);
        assert_eq!(scene.child_at_point(page, dvec2(50.0, 50.0)), None);
    }

    #[test]
    fn divide_partitions_children() {
        let mut scene = Scene::new_letter();
        let page = scene[scene.document()].children()[0];
        let group = scene.create(NodeKind::Group(GroupData));
        scene.append_child(page, group).unwrap();
        scene.set_frame(group, Rect::new(0.0, 0.0, 200.0, 400.0));
        let above = shape(&mut scene, group, Rect::new(10.0, 10.0, 50.0, 50.0));
        let below = shape(&mut scene, group, Rect::new(10.0, 300.0, 50.0, 50.0));

        let sibling = scene.divide(group, 200.0).unwrap();
        assert_eq!(scene[group].height(), 200.0);
        assert_eq!(scene[sibling].height(), 200.0);
        assert_eq!(scene[sibling].y_raw(), 200.0);
        assert_eq!(scene[above].parent(), Some(group));
        assert_eq!(scene[below].parent(), Some(sibling));
        // Translated up by the split offset.
        assert_eq!(scene[below].y_raw(), 100.0);
        // Sibling sits right after the original.
        assert_eq!(scene.index_of(page, sibling), Some(1));
    }
}
