//! Affine transform algebra for node coordinate spaces.
//!
//! A node's local space has its origin at the top-left of its bounds box.
//! `Transform::for_node` maps local space into the parent's space by
//! composing, in order: translate to (x, y), translate to the geometric
//! center, rotate by roll, scale, skew, translate back from the center.
//!
//! The pure-translation fast path is an optimization only: for default
//! roll/scale/skew it produces bit-identical results to the general path.

use glam::{DAffine2, DMat2, DVec2, dvec2};

use crate::types::{Rect, round2};

/// Lazily allocated roll/scale/skew block.
///
/// Nodes store `Option<Box<XformParams>>`: `None` means "not rotated,
/// scaled or skewed" and is the fast-path test everywhere. Setters round
/// to 2 decimals before storing so change detection compares stable
/// values (see `round2`).
#[derive(Debug, Clone, PartialEq)]
pub struct XformParams {
    /// Rotation in degrees.
    pub roll: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Skew angles in degrees.
    pub skew_x: f64,
    pub skew_y: f64,
}

impl Default for XformParams {
    fn default() -> Self {
        XformParams {
            roll: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
        }
    }
}

impl XformParams {
    /// True when every parameter is at its default. A node holding an
    /// identity block is equivalent to a node holding none; callers drop
    /// the block when this turns true to restore the fast path.
    pub fn is_identity(&self) -> bool {
        self.roll == 0.0
            && self.scale_x == 1.0
            && self.scale_y == 1.0
            && self.skew_x == 0.0
            && self.skew_y == 0.0
    }
}

/// A 2D affine transform between a node's local space and its parent's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(DAffine2);

impl Transform {
    pub const IDENTITY: Transform = Transform(DAffine2::IDENTITY);

    pub fn from_affine(affine: DAffine2) -> Transform {
        Transform(affine)
    }

    pub fn translation(dx: f64, dy: f64) -> Transform {
        Transform(DAffine2::from_translation(dvec2(dx, dy)))
    }

    /// The local→parent transform for a node with the given raw (signed)
    /// geometry and optional roll/scale/skew block.
    pub fn for_node(x: f64, y: f64, w: f64, h: f64, params: Option<&XformParams>) -> Transform {
        match params {
            // Fast path: translation only.
            None => Transform::translation(x, y),
            Some(p) => {
                let center = dvec2(w / 2.0, h / 2.0);
                let rotate = DMat2::from_angle(p.roll.to_radians());
                let scale = DMat2::from_diagonal(dvec2(p.scale_x, p.scale_y));
                let skew = DMat2::from_cols(
                    dvec2(1.0, p.skew_y.to_radians().tan()),
                    dvec2(p.skew_x.to_radians().tan(), 1.0),
                );
                let linear = rotate * scale * skew;
                // T(x,y) * T(center) * R * S * K * T(-center)
                let affine = DAffine2::from_translation(dvec2(x, y) + center)
                    * DAffine2::from_mat2(linear)
                    * DAffine2::from_translation(-center);
                Transform(affine)
            }
        }
    }

    /// Apply to a point.
    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        self.0.transform_point2(p)
    }

    /// Apply only the linear part (no translation); maps direction vectors.
    #[inline]
    pub fn apply_vector(&self, v: DVec2) -> DVec2 {
        self.0.transform_vector2(v)
    }

    /// Exact matrix inverse, for parent→local conversion.
    pub fn invert(&self) -> Transform {
        Transform(self.0.inverse())
    }

    /// Compose with another transform applied *after* this one: the result
    /// maps through `self` first, then `outer`. Chaining a node's
    /// transforms leaf-to-root with `then` yields local→ancestor.
    pub fn then(&self, outer: &Transform) -> Transform {
        Transform(outer.0 * self.0)
    }

    /// Smallest axis-aligned rect containing the mapped corners of `r`.
    pub fn transform_rect(&self, r: &Rect) -> Rect {
        let corners = r.corners().map(|c| self.apply(c));
        Rect::bounding(&corners)
    }

    /// True if this transform is a pure translation.
    pub fn is_translation(&self) -> bool {
        self.0.matrix2 == DMat2::IDENTITY
    }

    pub fn as_affine(&self) -> DAffine2 {
        self.0
    }
}

/// Round a freshly set roll/scale/skew value the way every transform
/// setter does.
#[inline]
pub fn round_param(v: f64) -> f64 {
    round2(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn fast_path_matches_general_path() {
        let fast = Transform::for_node(10.0, 20.0, 100.0, 50.0, None);
        let general =
            Transform::for_node(10.0, 20.0, 100.0, 50.0, Some(&XformParams::default()));
        for p in [dvec2(0.0, 0.0), dvec2(100.0, 50.0), dvec2(-3.0, 7.5)] {
            assert!(close(fast.apply(p), general.apply(p)));
        }
        assert!(fast.is_translation());
    }

    #[test]
    fn rotation_spins_about_center() {
        let params = XformParams {
            roll: 180.0,
            ..XformParams::default()
        };
        let t = Transform::for_node(0.0, 0.0, 100.0, 50.0, Some(&params));
        // Center is fixed, origin maps to the far corner.
        assert!(close(t.apply(dvec2(50.0, 25.0)), dvec2(50.0, 25.0)));
        assert!(close(t.apply(dvec2(0.0, 0.0)), dvec2(100.0, 50.0)));
    }

    #[test]
    fn inverse_round_trips_points() {
        let params = XformParams {
            roll: 33.33,
            scale_x: 1.5,
            scale_y: 0.25,
            skew_x: 12.0,
            skew_y: -4.5,
        };
        let t = Transform::for_node(5.0, -17.0, 80.0, 120.0, Some(&params));
        let inv = t.invert();
        for p in [
            dvec2(0.0, 0.0),
            dvec2(80.0, 120.0),
            dvec2(40.0, 60.0),
            dvec2(-100.0, 3.0),
        ] {
            assert!(close(inv.apply(t.apply(p)), p));
        }
    }

    #[test]
    fn then_matches_nested_application() {
        let inner = Transform::for_node(
            10.0,
            10.0,
            50.0,
            50.0,
            Some(&XformParams {
                roll: 45.0,
                ..XformParams::default()
            }),
        );
        let outer = Transform::translation(100.0, 0.0);
        let chained = inner.then(&outer);
        let p = dvec2(25.0, 25.0);
        assert!(close(chained.apply(p), outer.apply(inner.apply(p))));
    }

    #[test]
    fn transform_rect_is_aabb_of_corners() {
        let params = XformParams {
            roll: 90.0,
            ..XformParams::default()
        };
        let t = Transform::for_node(0.0, 0.0, 100.0, 50.0, Some(&params));
        let frame = t.transform_rect(&Rect::new(0.0, 0.0, 100.0, 50.0));
        // A 100x50 box rotated a quarter turn about its center is 50x100.
        assert!((frame.w - 50.0).abs() < 1e-9);
        assert!((frame.h - 100.0).abs() < 1e-9);
        // Center is preserved.
        assert!(close(frame.center(), dvec2(50.0, 25.0)));
    }
}
