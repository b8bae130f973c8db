//! Ray casts against spheres, planes and boxes.
//!
//! Rays are `origin + t * dir` with `t >= 0`; `dir` should be unit length so
//! that `t` is a distance.

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::{DOUBLE_EPS, GEOM_EPSILON};

use crate::obb::Obb;

/// Ray parameter and hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter at the hit.
    pub t: f64,
    /// World-space hit point.
    pub point: Point3<f64>,
}

/// First intersection of a ray with a sphere.
///
/// A ray starting inside the sphere hits at `t = 0`.
#[must_use]
pub fn test_ray_to_sphere(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    center: &Point3<f64>,
    radius: f64,
) -> Option<RayHit> {
    let m = origin - center;
    let b = m.dot(dir);
    let c = m.norm_squared() - radius * radius;

    // Origin outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }

    let t = (-b - disc.sqrt()).max(0.0);
    Some(RayHit {
        t,
        point: origin + dir * t,
    })
}

/// Intersection of a ray with a plane.
///
/// Parallel rays and planes behind the origin are misses.
#[must_use]
pub fn test_ray_to_plane(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
) -> Option<RayHit> {
    let denom = plane_normal.dot(dir);
    if denom.abs() < DOUBLE_EPS {
        return None;
    }
    let t = (plane_point - origin).dot(plane_normal) / denom;
    if t <= 0.0 {
        return None;
    }
    Some(RayHit {
        t,
        point: origin + dir * t,
    })
}

/// Entry and exit parameters of a ray through an oriented box (slab test).
///
/// The entry parameter is clamped to 0 when the origin is inside the box.
#[must_use]
pub fn test_ray_to_obb(origin: &Point3<f64>, dir: &Vector3<f64>, obb: &Obb) -> Option<(f64, f64)> {
    let o = obb.to_local(origin);
    let d = obb.to_local_dir(dir);

    let mut t_min = 0.0_f64;
    let mut t_max = f64::INFINITY;
    for i in 0..3 {
        let e = obb.half_extents[i];
        if d[i].abs() < GEOM_EPSILON {
            // Parallel to this slab: must already be inside it
            if o[i] < -e || o[i] > e {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[i];
        let mut t1 = (-e - o[i]) * inv;
        let mut t2 = (e - o[i]) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some((t_min, t_max))
}
