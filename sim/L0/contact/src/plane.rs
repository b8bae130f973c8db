//! Plane contact tests.
//!
//! A plane is given by a point on it and a unit normal. Plane tests are
//! one-sided (the half-space behind the normal is solid) except
//! [`test_bidirectional_plane_to_sphere`].

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::DOUBLE_EPS;

use crate::manifold::ContactManifold;

/// Plane A against sphere B.
///
/// A sphere whose center lies behind the plane is reported with a depth
/// greater than its radius.
#[must_use]
pub fn test_plane_to_sphere(
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    center: &Point3<f64>,
    radius: f64,
) -> Option<ContactManifold> {
    let d = (center - plane_point).dot(plane_normal);
    if d >= radius {
        return None;
    }

    Some(ContactManifold::new(
        center - plane_normal * d,
        -plane_normal,
        center - plane_normal * radius,
        radius - d,
    ))
}

/// Plane A against sphere B, treating both sides of the plane as solid.
///
/// The sphere is pushed toward whichever side its center is on.
#[must_use]
pub fn test_bidirectional_plane_to_sphere(
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    center: &Point3<f64>,
    radius: f64,
) -> Option<ContactManifold> {
    let d = (center - plane_point).dot(plane_normal);
    let depth = radius - d.abs();
    if depth <= 0.0 {
        return None;
    }

    let n = if d < 0.0 { -plane_normal } else { *plane_normal };
    Some(ContactManifold::new(
        center - n * d.abs(),
        -n,
        center - n * radius,
        depth,
    ))
}

/// Plane A against point B.
///
/// `point_a` is the projection of the point onto the plane.
#[must_use]
pub fn test_plane_to_point(
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    point: &Point3<f64>,
) -> Option<ContactManifold> {
    let d = (point - plane_point).dot(plane_normal);
    if d >= 0.0 {
        return None;
    }

    Some(ContactManifold::new(
        point - plane_normal * d,
        -plane_normal,
        *point,
        -d,
    ))
}

/// Intersection of the infinite line through `p` and `q` with a plane.
///
/// Returns `None` when the line is parallel to the plane.
#[must_use]
pub fn test_plane_line(
    p: &Point3<f64>,
    q: &Point3<f64>,
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
) -> Option<Point3<f64>> {
    let dir = q - p;
    let denom = dir.dot(plane_normal);
    if denom.abs() < DOUBLE_EPS {
        return None;
    }
    let t = (plane_point - p).dot(plane_normal) / denom;
    Some(p + dir * t)
}
