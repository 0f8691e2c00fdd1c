//! Paint traversal: path building and the `Canvas` consumer interface.
//!
//! Renderers (screen, raster export, page-description writers) implement
//! `Canvas` and call `Scene::paint`. The traversal applies each node's
//! transform, opacity, clip and effect, paints the node itself, then its
//! children front-to-back in child order, then any overlay. Everything a
//! renderer needs is derivable from public geometry and style, so a PDF
//! writer walks this exactly like an on-screen view would.

use glam::{DVec2, dvec2};

use crate::scene::kind::{GeometryHooks, NodeKind};
use crate::scene::style::{Border, Effect, Fill};
use crate::scene::{NodeId, Scene};
use crate::transform::Transform;
use crate::types::Rect;

/// One path segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathEl {
    MoveTo(DVec2),
    LineTo(DVec2),
    QuadTo(DVec2, DVec2),
    CubicTo(DVec2, DVec2, DVec2),
    Close,
}

/// A vector path built from move/line/curve verbs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    els: Vec<PathEl>,
}

// Circle approximation constant: control-point distance for a quarter
// circle as a cubic Bezier.
const KAPPA: f64 = 0.552_284_749_830_793_4;

impl Path {
    pub fn new() -> Path {
        Path::default()
    }

    pub fn elements(&self) -> &[PathEl] {
        &self.els
    }

    pub fn is_empty(&self) -> bool {
        self.els.is_empty()
    }

    pub fn move_to(&mut self, p: DVec2) -> &mut Path {
        self.els.push(PathEl::MoveTo(p));
        self
    }

    pub fn line_to(&mut self, p: DVec2) -> &mut Path {
        self.els.push(PathEl::LineTo(p));
        self
    }

    pub fn quad_to(&mut self, ctrl: DVec2, p: DVec2) -> &mut Path {
        self.els.push(PathEl::QuadTo(ctrl, p));
        self
    }

    pub fn cubic_to(&mut self, c1: DVec2, c2: DVec2, p: DVec2) -> &mut Path {
        self.els.push(PathEl::CubicTo(c1, c2, p));
        self
    }

    pub fn close(&mut self) -> &mut Path {
        self.els.push(PathEl::Close);
        self
    }

    /// Closed rectangle path.
    pub fn rect(r: Rect) -> Path {
        let mut p = Path::new();
        p.move_to(dvec2(r.x, r.y))
            .line_to(dvec2(r.max_x(), r.y))
            .line_to(dvec2(r.max_x(), r.max_y()))
            .line_to(dvec2(r.x, r.max_y()))
            .close();
        p
    }

    /// Rectangle with rounded corners, radius clamped to half the shorter
    /// side.
    pub fn rounded_rect(r: Rect, radius: f64) -> Path {
        let rad = radius.min(r.w / 2.0).min(r.h / 2.0);
        if rad <= 0.0 {
            return Path::rect(r);
        }
        let k = rad * (1.0 - KAPPA);
        let mut p = Path::new();
        p.move_to(dvec2(r.x + rad, r.y))
            .line_to(dvec2(r.max_x() - rad, r.y))
            .cubic_to(
                dvec2(r.max_x() - k, r.y),
                dvec2(r.max_x(), r.y + k),
                dvec2(r.max_x(), r.y + rad),
            )
            .line_to(dvec2(r.max_x(), r.max_y() - rad))
            .cubic_to(
                dvec2(r.max_x(), r.max_y() - k),
                dvec2(r.max_x() - k, r.max_y()),
                dvec2(r.max_x() - rad, r.max_y()),
            )
            .line_to(dvec2(r.x + rad, r.max_y()))
            .cubic_to(
                dvec2(r.x + k, r.max_y()),
                dvec2(r.x, r.max_y() - k),
                dvec2(r.x, r.max_y() - rad),
            )
            .line_to(dvec2(r.x, r.y + rad))
            .cubic_to(dvec2(r.x, r.y + k), dvec2(r.x + k, r.y), dvec2(r.x + rad, r.y))
            .close();
        p
    }

    /// Ellipse inscribed in `r`, as four cubic arcs.
    pub fn oval(r: Rect) -> Path {
        let c = r.center();
        let (hw, hh) = (r.w / 2.0, r.h / 2.0);
        let (kx, ky) = (hw * KAPPA, hh * KAPPA);
        let mut p = Path::new();
        p.move_to(dvec2(c.x, r.y))
            .cubic_to(
                dvec2(c.x + kx, r.y),
                dvec2(r.max_x(), c.y - ky),
                dvec2(r.max_x(), c.y),
            )
            .cubic_to(
                dvec2(r.max_x(), c.y + ky),
                dvec2(c.x + kx, r.max_y()),
                dvec2(c.x, r.max_y()),
            )
            .cubic_to(
                dvec2(c.x - kx, r.max_y()),
                dvec2(r.x, c.y + ky),
                dvec2(r.x, c.y),
            )
            .cubic_to(dvec2(r.x, c.y - ky), dvec2(c.x - kx, r.y), dvec2(c.x, r.y))
            .close();
        p
    }

    /// Open polyline through the points; closed when `closed` is set.
    pub fn polygon(points: &[DVec2], closed: bool) -> Path {
        let mut p = Path::new();
        let Some(first) = points.first() else {
            return p;
        };
        p.move_to(*first);
        for pt in &points[1..] {
            p.line_to(*pt);
        }
        if closed {
            p.close();
        }
        p
    }

    /// Map every point through a transform.
    pub fn transformed(&self, t: &Transform) -> Path {
        let els = self
            .els
            .iter()
            .map(|el| match *el {
                PathEl::MoveTo(p) => PathEl::MoveTo(t.apply(p)),
                PathEl::LineTo(p) => PathEl::LineTo(t.apply(p)),
                PathEl::QuadTo(c, p) => PathEl::QuadTo(t.apply(c), t.apply(p)),
                PathEl::CubicTo(c1, c2, p) => {
                    PathEl::CubicTo(t.apply(c1), t.apply(c2), t.apply(p))
                }
                PathEl::Close => PathEl::Close,
            })
            .collect();
        Path { els }
    }

    /// AABB over every on-path and control point. Loose for curves, which
    /// is fine for repaint regions.
    pub fn bounds(&self) -> Rect {
        let mut pts = Vec::with_capacity(self.els.len());
        for el in &self.els {
            match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => pts.push(p),
                PathEl::QuadTo(c, p) => pts.extend([c, p]),
                PathEl::CubicTo(c1, c2, p) => pts.extend([c1, c2, p]),
                PathEl::Close => {}
            }
        }
        Rect::bounding(&pts)
    }
}

/// Drawing surface the paint traversal targets.
///
/// Only `fill_path` and `stroke_path` are required; state management and
/// the text/image/effect hooks default to no-ops so minimal consumers
/// (bounds collectors, hit testers) stay small.
pub trait Canvas {
    fn save(&mut self) {}
    fn restore(&mut self) {}

    /// Concatenate a transform onto the current coordinate system.
    fn concat(&mut self, _t: &Transform) {}

    /// Intersect the clip with a path.
    fn clip(&mut self, _path: &Path) {}

    /// Multiply the global alpha for subsequent drawing.
    fn multiply_alpha(&mut self, _alpha: f64) {}

    /// Install an effect for the node being painted (until `restore`).
    fn push_effect(&mut self, _effect: &Effect) {}

    fn fill_path(&mut self, path: &Path, fill: &Fill);
    fn stroke_path(&mut self, path: &Path, border: &Border);

    /// Draw a text run inside `bounds` (local coordinates).
    fn draw_text(&mut self, _text: &str, _bounds: Rect) {}

    /// Draw an archived resource (by name) into `bounds`.
    fn draw_image(&mut self, _resource: &str, _bounds: Rect) {}
}

impl Scene {
    /// Paint a node and its subtree: transform, opacity, effect, clip,
    /// then self → children → overlay.
    pub fn paint(&self, id: NodeId, canvas: &mut dyn Canvas) {
        if !self.is_visible(id) {
            return;
        }
        let node = &self[id];
        canvas.save();
        canvas.concat(&self.local_transform(id));
        if node.opacity < 1.0 {
            canvas.multiply_alpha(node.opacity);
        }
        if let Some(effect) = &node.effect {
            canvas.push_effect(effect);
        }
        if node.clips_children() {
            canvas.clip(&Path::rect(self.bounds(id)));
        }
        self.paint_self(id, canvas);
        self.paint_children(id, canvas);
        self.paint_overlay(id, canvas);
        canvas.restore();
    }

    /// Paint only this node's own geometry (no children).
    pub fn paint_self(&self, id: NodeId, canvas: &mut dyn Canvas) {
        let node = &self[id];
        let bounds = self.bounds(id);
        let path = node.kind.path(bounds);
        if let Some(fill) = &node.fill {
            canvas.fill_path(&path, fill);
        }
        if let Some(border) = &node.border {
            canvas.stroke_path(&path, border);
        }
        match &node.kind {
            NodeKind::Text(text) => canvas.draw_text(&text.string, bounds),
            NodeKind::Image(image) => canvas.draw_image(&image.resource, bounds),
            _ => {}
        }
    }

    /// Paint children in child order (later children in front).
    pub fn paint_children(&self, id: NodeId, canvas: &mut dyn Canvas) {
        for child in self[id].children.clone() {
            self.paint(child, canvas);
        }
    }

    /// Hook painted above the children. Pages use it for the document's
    /// margin and grid guides when those toggles are on.
    pub fn paint_overlay(&self, id: NodeId, canvas: &mut dyn Canvas) {
        let node = &self[id];
        if !matches!(node.kind, NodeKind::Page(_)) {
            return;
        }
        let Some(doc) = node.parent else {
            return;
        };
        let NodeKind::Document(doc_data) = &self[doc].kind else {
            return;
        };
        let guide = Border {
            width: 0.25,
            ..Border::default()
        };
        if doc_data.show_margin {
            let b = self.bounds(id);
            let m = &doc_data.margins;
            let inner = Rect::new(
                b.x + m.left,
                b.y + m.top,
                b.w - m.left - m.right,
                b.h - m.top - m.bottom,
            );
            canvas.stroke_path(&Path::rect(inner), &guide);
        }
        if doc_data.show_grid && doc_data.grid_spacing > 0.0 {
            let b = self.bounds(id);
            let mut grid = Path::new();
            let mut x = b.x + doc_data.grid_spacing;
            while x < b.max_x() {
                grid.move_to(dvec2(x, b.y)).line_to(dvec2(x, b.max_y()));
                x += doc_data.grid_spacing;
            }
            let mut y = b.y + doc_data.grid_spacing;
            while y < b.max_y() {
                grid.move_to(dvec2(b.x, y)).line_to(dvec2(b.max_x(), y));
                y += doc_data.grid_spacing;
            }
            canvas.stroke_path(&grid, &guide);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_path_has_four_sides() {
        let p = Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(p.elements().len(), 5);
        assert_eq!(p.elements()[4], PathEl::Close);
    }

    #[test]
    fn oval_bounds_cover_rect() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        let b = Path::oval(r).bounds();
        assert!((b.x - r.x).abs() < 1e-9);
        assert!((b.max_y() - r.max_y()).abs() < 1e-9);
    }

    #[test]
    fn transformed_path_moves_points() {
        let p = Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let t = Transform::translation(5.0, -5.0);
        let b = p.transformed(&t).bounds();
        assert_eq!(b, Rect::new(5.0, -5.0, 10.0, 10.0));
    }
}
