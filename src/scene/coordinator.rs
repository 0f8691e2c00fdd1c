//! The viewer facade binding a scene to its host.
//!
//! `Viewer` owns a `Scene` and a `Host`. Every mutation goes through the
//! viewer (or through `scene_mut` followed by `flush`); after each batch
//! it drains the scene's notification queue and forwards it through the
//! host's callback surface. Hosts that do not care about descendant
//! changes skip that traffic entirely by leaving `wants_deep_changes` at
//! its default.

use crate::scene::{Change, NodeId, Scene, SceneEvent};

/// Callback surface a host (editor, viewer, exporter) exposes to the
/// scene. Everything defaults to the behavior of a non-interactive host.
pub trait Host {
    fn zoom_factor(&self) -> f64 {
        1.0
    }

    /// A layout pass should be scheduled. Fired at most once per flush.
    fn needs_relayout(&mut self) {}

    /// `node`'s region should repaint.
    fn needs_repaint(&mut self, node: NodeId) {
        let _ = node;
    }

    /// A change originated at the document root itself.
    fn property_changed(&mut self, change: &Change) {
        let _ = change;
    }

    /// Opt in to receive changes originating below the root.
    fn wants_deep_changes(&self) -> bool {
        false
    }

    fn deep_property_changed(&mut self, change: &Change) {
        let _ = change;
    }

    fn is_editing(&self) -> bool {
        false
    }

    fn is_selected(&self, node: NodeId) -> bool {
        let _ = node;
        false
    }

    fn is_super_selected(&self, node: NodeId) -> bool {
        let _ = node;
        false
    }

    fn is_super_selected_leaf(&self, node: NodeId) -> bool {
        let _ = node;
        false
    }
}

/// A scene bound to a host, tracking the viewport it is shown in.
pub struct Viewer<H: Host> {
    scene: Scene,
    host: H,
    viewport_width: f64,
    viewport_height: f64,
}

impl<H: Host> Viewer<H> {
    pub fn new(scene: Scene, host: H) -> Viewer<H> {
        Viewer {
            scene,
            host,
            viewport_width: 0.0,
            viewport_height: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene access. Call `flush` when done so notifications
    /// reach the host.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn zoom_factor(&self) -> f64 {
        self.host.zoom_factor()
    }

    /// The document's preferred size scaled by the host's zoom.
    pub fn scaled_preferred_size(&self) -> (f64, f64) {
        let doc = self.scene.document();
        let (w, h) = self.scene.preferred_size(doc);
        let zoom = self.host.zoom_factor();
        (w * zoom, h * zoom)
    }

    /// Where the document's origin lands when its preferred size is
    /// centered in the viewport (never negative).
    pub fn centered_origin(&self) -> (f64, f64) {
        let (w, h) = self.scaled_preferred_size();
        (
            ((self.viewport_width - w) / 2.0).max(0.0),
            ((self.viewport_height - h) / 2.0).max(0.0),
        )
    }

    /// Run one deep layout pass if anything is dirty, then flush.
    pub fn layout_if_needed(&mut self) {
        let doc = self.scene.document();
        if self.scene[doc].needs_layout() || self.scene[doc].needs_layout_deep() {
            self.scene.layout_deep(doc);
        }
        self.flush();
    }

    /// Drain the scene's notification queue into the host. Layout
    /// requests collapse to a single `needs_relayout`; root-originated
    /// changes always go out; descendant-originated changes only if the
    /// host opted in.
    pub fn flush(&mut self) {
        let root = self.scene.document();
        let deep = self.host.wants_deep_changes();
        let mut relayout = false;
        for event in self.scene.take_events() {
            match event {
                SceneEvent::NeedsLayout => relayout = true,
                SceneEvent::Repaint(node) => self.host.needs_repaint(node),
                SceneEvent::Changed(change) => {
                    if change.origin() == root {
                        self.host.property_changed(&change);
                    } else if deep {
                        self.host.deep_property_changed(&change);
                    }
                }
            }
        }
        if relayout {
            self.host.needs_relayout();
        }
    }
}
