//! Shared geometric primitives and measurement units.
//!
//! Everything in the scene graph works in points (1/72 inch), the canonical
//! document unit. `Unit` only matters for ruler display and archive
//! round-trip.

use std::fmt;
use std::str::FromStr;

use glam::{DVec2, dvec2};

/// Round to 2 decimal places.
///
/// All roll/scale/skew setters and the frame decomposition round through
/// this before storing, so floating-point jitter never fires a spurious
/// change notification. Equality checks for change detection must compare
/// post-rounding values.
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// An axis-aligned rectangle in some coordinate space.
///
/// Width and height are normally non-negative here; the *signed* size
/// encoding for flipped shapes lives in the node fields, not in `Rect`
/// (see `Node::width_raw`). Geometry helpers canonicalize on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 0.0,
        h: 0.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, w, h }
    }

    /// Build the canonical (non-negative size) rect for possibly-signed
    /// width/height: a negative extent flips the origin along that axis.
    #[inline]
    pub fn canonical(x: f64, y: f64, w: f64, h: f64) -> Rect {
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        Rect { x, y, w, h }
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.w
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> DVec2 {
        dvec2(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    #[inline]
    pub fn origin(&self) -> DVec2 {
        dvec2(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> DVec2 {
        dvec2(self.w, self.h)
    }

    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.x && p.x <= self.max_x() && p.y >= self.y && p.y <= self.max_y()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// Smallest rect containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let mx = self.max_x().max(other.max_x());
        let my = self.max_y().max(other.max_y());
        Rect::new(x, y, mx - x, my - y)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Inset on all sides (negative values grow the rect).
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            self.w - amount * 2.0,
            self.h - amount * 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// The four corners in clockwise order starting at the origin.
    pub fn corners(&self) -> [DVec2; 4] {
        [
            dvec2(self.x, self.y),
            dvec2(self.max_x(), self.y),
            dvec2(self.max_x(), self.max_y()),
            dvec2(self.x, self.max_y()),
        ]
    }

    /// AABB of a set of points. Returns `Rect::ZERO` for an empty slice.
    pub fn bounding(points: &[DVec2]) -> Rect {
        let Some(first) = points.first() else {
            return Rect::ZERO;
        };
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

/// Measurement unit for ruler display and user-facing sizes.
///
/// The scene graph itself always stores points; units only convert at the
/// presentation edge and survive archive round-trip as a document
/// attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    Point,
    Inch,
    Centimeter,
    Millimeter,
    Pica,
}

impl Unit {
    /// How many points one of this unit spans.
    pub fn points_per_unit(self) -> f64 {
        match self {
            Unit::Point => 1.0,
            Unit::Inch => 72.0,
            Unit::Centimeter => 72.0 / 2.54,
            Unit::Millimeter => 72.0 / 25.4,
            Unit::Pica => 12.0,
        }
    }

    /// Convert a value in this unit to points.
    #[inline]
    pub fn to_points(self, v: f64) -> f64 {
        v * self.points_per_unit()
    }

    /// Convert a value in points to this unit.
    #[inline]
    pub fn from_points(self, v: f64) -> f64 {
        v / self.points_per_unit()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Point => "point",
            Unit::Inch => "inch",
            Unit::Centimeter => "cm",
            Unit::Millimeter => "mm",
            Unit::Pica => "pica",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Unit {
    type Err = ();

    /// Accepts current spellings plus the legacy long forms written by old
    /// documents ("inches", "centimeters", ...).
    fn from_str(s: &str) -> Result<Unit, ()> {
        match s {
            "point" | "points" | "pt" => Ok(Unit::Point),
            "inch" | "inches" | "in" => Ok(Unit::Inch),
            "cm" | "centimeter" | "centimeters" => Ok(Unit::Centimeter),
            "mm" | "millimeter" | "millimeters" => Ok(Unit::Millimeter),
            "pica" | "picas" => Ok(Unit::Pica),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_snaps_jitter() {
        assert_eq!(round2(45.004999), 45.0);
        assert_eq!(round2(45.005001), 45.01);
        assert_eq!(round2(12.3), 12.3);
    }

    #[test]
    fn canonical_flips_negative_extents() {
        let r = Rect::canonical(100.0, 50.0, -40.0, 20.0);
        assert_eq!(r, Rect::new(60.0, 50.0, 40.0, 20.0));
        let r = Rect::canonical(0.0, 0.0, -10.0, -10.0);
        assert_eq!(r, Rect::new(-10.0, -10.0, 10.0, 10.0));
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, -5.0, 5.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, -5.0, 25.0, 15.0));
    }

    #[test]
    fn unit_round_trips_points() {
        let v = 144.0;
        for unit in [
            Unit::Point,
            Unit::Inch,
            Unit::Centimeter,
            Unit::Millimeter,
            Unit::Pica,
        ] {
            let there = unit.from_points(v);
            assert!((unit.to_points(there) - v).abs() < 1e-9);
        }
        assert_eq!(Unit::Inch.to_points(1.0), 72.0);
    }

    #[test]
    fn unit_parses_legacy_spellings() {
        assert_eq!("inches".parse::<Unit>(), Ok(Unit::Inch));
        assert_eq!("centimeters".parse::<Unit>(), Ok(Unit::Centimeter));
        assert_eq!("pt".parse::<Unit>(), Ok(Unit::Point));
        assert!("furlongs".parse::<Unit>().is_err());
    }
}
