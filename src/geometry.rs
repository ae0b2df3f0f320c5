//! # Small-angle sky geometry
//!
//! Planar helpers used by the candidate filter and the segment detector. Every point
//! is a [`SkyPoint`] in **degrees**; results are in **radians**.
//!
//! ## Projection
//! -----------------
//! Each point is projected on its own tangent-like plane:
//!
//! ```text
//! x = ra · cos(dec),   y = dec          (ra, dec in radians)
//! ```
//!
//! Distances are Euclidean in that plane. The right ascension of each point is scaled
//! with the cosine of **its own** declination, so the projection is not a true
//! great-circle metric. It is only meant for the arcsecond-to-arcminute separations
//! between consecutive frames of a survey field.
//!
//! ## See also
//! ------------
//! * [`crate::candidates`] – transience test against the master catalog.
//! * [`crate::detection::segments`] – triplet search.
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Radian, RADEG};

/// A sky position given by its equatorial coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPoint {
    pub ra: Degree,
    pub dec: Degree,
}

impl SkyPoint {
    pub fn new(ra: Degree, dec: Degree) -> Self {
        SkyPoint { ra, dec }
    }

    /// Project the point on the `(ra·cos(dec), dec)` plane, both coordinates in radians.
    #[inline]
    pub fn projected(&self) -> Vector2<Radian> {
        let ra = self.ra * RADEG;
        let dec = self.dec * RADEG;
        Vector2::new(ra * dec.cos(), dec)
    }
}

/// Planar angular distance between two sky points.
///
/// Arguments
/// -----------------
/// * `p1`, `p2` – sky points in degrees.
///
/// Return
/// ----------
/// * The Euclidean distance between `p1.projected()` and `p2.projected()`, in radians.
pub fn angular_distance(p1: &SkyPoint, p2: &SkyPoint) -> Radian {
    (p2.projected() - p1.projected()).norm()
}

/// Whether two points are at most `max_distance` radians apart (inclusive bound).
#[inline]
pub fn is_within(p1: &SkyPoint, p2: &SkyPoint, max_distance: Radian) -> bool {
    angular_distance(p1, p2) <= max_distance
}

/// Reorder the vertices of a triangle so that the first two define its longest edge.
///
/// Equal edges are resolved in the evaluation order `d12`, then `d13`, then `d23`:
/// the first edge whose length equals the maximum wins.
///
/// Return
/// ----------
/// * `(p1, p2, p3)` when `d12` is the longest,
/// * `(p1, p3, p2)` when `d13` is the longest,
/// * `(p2, p3, p1)` otherwise.
pub fn longest_edge_order<'a>(
    p1: &'a SkyPoint,
    p2: &'a SkyPoint,
    p3: &'a SkyPoint,
) -> (&'a SkyPoint, &'a SkyPoint, &'a SkyPoint) {
    let d12 = angular_distance(p1, p2);
    let d13 = angular_distance(p1, p3);
    let d23 = angular_distance(p2, p3);

    let longest = d12.max(d13).max(d23);

    if longest == d12 {
        (p1, p2, p3)
    } else if longest == d13 {
        (p1, p3, p2)
    } else {
        (p2, p3, p1)
    }
}

/// Distance from `c` to the infinite line through `a` and `b`, in the projected plane.
///
/// Return
/// ----------
/// * The perpendicular distance in radians, or `0.0` when `a` and `b` project onto
///   the same point (degenerate line).
pub fn point_line_distance(a: &SkyPoint, b: &SkyPoint, c: &SkyPoint) -> Radian {
    let pa = a.projected();
    let pb = b.projected();
    let pc = c.projected();

    let direction = pb - pa;
    let base = direction.norm();
    if base == 0.0 {
        return 0.0;
    }

    // |(b - a) × (c - a)| / |b - a|
    let offset = pc - pa;
    (direction.x * offset.y - direction.y * offset.x).abs() / base
}
