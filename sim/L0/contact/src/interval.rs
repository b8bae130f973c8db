//! Inclusive interval and axis-aligned box overlap tests.
//!
//! All tests treat intervals as closed: touching boxes intersect.

use nalgebra::Point3;

/// Whether the closed intervals `[a, b]` and `[c, d]` overlap.
///
/// Both intervals must be ordered (`a <= b`, `c <= d`).
#[inline]
#[must_use]
pub fn is_intersect(a: f64, b: f64, c: f64, d: f64) -> bool {
    (a <= d && a >= c) || (c <= b && c >= a)
}

/// Whether two axis-aligned boxes overlap on all three axes.
#[must_use]
pub fn test_aabb_to_aabb(
    min1: &Point3<f64>,
    max1: &Point3<f64>,
    min2: &Point3<f64>,
    max2: &Point3<f64>,
) -> bool {
    (0..3).all(|i| is_intersect(min1[i], max1[i], min2[i], max2[i]))
}

/// Whether a point, inflated by `prox1`, overlaps the bounding box of
/// triangle `abc` inflated by `prox2`.
#[must_use]
pub fn test_point_to_tri_aabb(
    point: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    prox1: f64,
    prox2: f64,
) -> bool {
    (0..3).all(|i| {
        let lo = a[i].min(b[i]).min(c[i]);
        let hi = a[i].max(b[i]).max(c[i]);
        is_intersect(point[i] - prox1, point[i] + prox1, lo - prox2, hi + prox2)
    })
}

/// Whether the bounding boxes of segments `a0a1` and `b0b1`, inflated by
/// `prox1` and `prox2` respectively, overlap.
#[must_use]
pub fn test_line_to_line_aabb(
    a0: &Point3<f64>,
    a1: &Point3<f64>,
    b0: &Point3<f64>,
    b1: &Point3<f64>,
    prox1: f64,
    prox2: f64,
) -> bool {
    (0..3).all(|i| {
        let (a_lo, a_hi) = ordered(a0[i], a1[i]);
        let (b_lo, b_hi) = ordered(b0[i], b1[i]);
        is_intersect(a_lo - prox1, a_hi + prox1, b_lo - prox2, b_hi + prox2)
    })
}

#[inline]
fn ordered(x: f64, y: f64) -> (f64, f64) {
    if x <= y { (x, y) } else { (y, x) }
}
