//! Closest-point queries on segments and triangles.
//!
//! These are the building blocks for the sphere, capsule and mesh tests. All
//! of them are guarded against degenerate input: a zero-length segment
//! collapses to its first endpoint and a zero-area triangle collapses to its
//! longest edge, so no query returns NaN.

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::{GEOM_EPSILON, SEGMENT_EPSILON_SQ};

use crate::manifold::{EdgeEdgeClosest, SegmentRegion, TriangleRegion};

/// Closest point on segment `ab` to `p`, with the region it falls in.
#[must_use]
pub fn closest_point_on_segment(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> (Point3<f64>, SegmentRegion) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < SEGMENT_EPSILON_SQ {
        return (*a, SegmentRegion::Start);
    }

    let t = (p - a).dot(&ab) / len_sq;
    if t <= 0.0 {
        (*a, SegmentRegion::Start)
    } else if t >= 1.0 {
        (*b, SegmentRegion::End)
    } else {
        (a + ab * t, SegmentRegion::Interior)
    }
}

/// Distance from `p` to segment `ab`.
#[must_use]
pub fn point_segment_closest_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    (p - closest).norm()
}

/// Distance from `p` to triangle `abc`.
#[must_use]
pub fn point_triangle_closest_distance(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> f64 {
    let (closest, _) = closest_point_on_triangle(p, a, b, c);
    (p - closest).norm()
}

/// Barycentric coordinates `(u, v, w)` of `p` projected onto the plane of
/// triangle `abc`, so that `u*a + v*b + w*c` is the projection.
///
/// Returns `None` for a zero-area triangle.
#[must_use]
pub fn barycentric(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<Vector3<f64>> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < GEOM_EPSILON * (d00 * d11).max(GEOM_EPSILON) {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some(Vector3::new(1.0 - v - w, v, w))
}

/// Closest point on triangle `abc` to `p`, with the region it falls in.
///
/// Regions are tested in a fixed order and the first match wins: vertex A,
/// vertex B, vertex C, edge AB, edge BC, edge CA, then the face interior.
/// A point exactly on a region boundary is therefore reported as the
/// earliest region in that order.
#[must_use]
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> (Point3<f64>, TriangleRegion) {
    let ab = b - a;
    let ac = c - a;

    if ab.cross(&ac).norm() < GEOM_EPSILON {
        return closest_on_degenerate_triangle(p, a, b, c);
    }

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);

    // Vertex regions
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, TriangleRegion::VertexA);
    }
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, TriangleRegion::VertexB);
    }
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, TriangleRegion::VertexC);
    }

    // Edge regions
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = safe_ratio(d1, d1 - d3);
        return (a + ab * v, TriangleRegion::EdgeAB);
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = safe_ratio(d4 - d3, (d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, TriangleRegion::EdgeBC);
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = safe_ratio(d2, d2 - d6);
        return (a + ac * w, TriangleRegion::EdgeCA);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, TriangleRegion::Face)
}

/// Closest points between segments `a0a1` and `b0b1`.
///
/// Parallel segments pick the closest point to `a0`; zero-length segments
/// collapse to their first endpoint.
#[allow(clippy::many_single_char_names)]
#[must_use]
pub fn edge_to_edge_closest_points(
    a0: &Point3<f64>,
    a1: &Point3<f64>,
    b0: &Point3<f64>,
    b1: &Point3<f64>,
) -> EdgeEdgeClosest {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;

    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    let finish = |s: f64, t: f64, interior: bool| EdgeEdgeClosest {
        point_a: a0 + d1 * s,
        point_b: b0 + d2 * t,
        s,
        t,
        interior,
    };

    if a < SEGMENT_EPSILON_SQ && e < SEGMENT_EPSILON_SQ {
        return finish(0.0, 0.0, false);
    }
    if a < SEGMENT_EPSILON_SQ {
        return finish(0.0, (f / e).clamp(0.0, 1.0), false);
    }
    if e < SEGMENT_EPSILON_SQ {
        return finish((-d1.dot(&r) / a).clamp(0.0, 1.0), 0.0, false);
    }

    let b = d1.dot(&d2);
    let c = d1.dot(&r);
    #[allow(clippy::suspicious_operation_groupings)]
    let denom = a * e - b * b;
    let parallel = denom.abs() < GEOM_EPSILON * a * e;

    let mut s = if parallel {
        0.0
    } else {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    };
    let mut t = (b * s + f) / e;

    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }

    let interior = !parallel && s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0;
    finish(s, t, interior)
}

fn closest_on_degenerate_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> (Point3<f64>, TriangleRegion) {
    use TriangleRegion as R;

    let edges = [
        (a, b, R::EdgeAB, R::VertexA, R::VertexB),
        (b, c, R::EdgeBC, R::VertexB, R::VertexC),
        (c, a, R::EdgeCA, R::VertexC, R::VertexA),
    ];
    let mut longest = edges[0];
    for edge in &edges[1..] {
        if (edge.1 - edge.0).norm_squared() > (longest.1 - longest.0).norm_squared() {
            longest = *edge;
        }
    }

    let (start, end, edge_region, start_region, end_region) = longest;
    let (point, region) = closest_point_on_segment(p, start, end);
    let region = match region {
        SegmentRegion::Start => start_region,
        SegmentRegion::End => end_region,
        SegmentRegion::Interior => edge_region,
    };
    (point, region)
}

/// Some unit vector perpendicular to the unit vector `axis`.
pub(crate) fn any_perpendicular(axis: &Vector3<f64>) -> Vector3<f64> {
    let helper = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let perp = axis.cross(&helper);
    let norm = perp.norm();
    if norm > GEOM_EPSILON {
        perp / norm
    } else {
        Vector3::z()
    }
}

#[inline]
fn safe_ratio(num: f64, denom: f64) -> f64 {
    if denom.abs() > GEOM_EPSILON {
        num / denom
    } else {
        0.5
    }
}
