//! Capsule and cylinder contact tests.
//!
//! Capsules and cylinders are centered at `position`, aligned with `axis` and
//! extend `length / 2` along it in both directions. The axis is normalized on
//! entry; a zero-length axis collapses the shape to a sphere of the same
//! radius around `position`. A point lying exactly on the axis is pushed out
//! along an arbitrary perpendicular.

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::GEOM_EPSILON;

use crate::closest::{any_perpendicular, closest_point_on_segment};
use crate::manifold::ContactManifold;
use crate::sphere::{test_sphere_to_point, test_sphere_to_sphere};

// ============================================================================
// Capsule
// ============================================================================

/// Capsule A against point B.
#[must_use]
pub fn test_capsule_to_point(
    position: &Point3<f64>,
    axis: &Vector3<f64>,
    radius: f64,
    length: f64,
    point: &Point3<f64>,
) -> Option<ContactManifold> {
    let half = length * 0.5;
    let axis = axis
        .try_normalize(GEOM_EPSILON)
        .unwrap_or_else(Vector3::zeros);

    // Bounding sphere early out
    if (point - position).norm() > radius + half {
        return None;
    }

    let a = position + axis * half;
    let b = position - axis * half;
    let (closest, _) = closest_point_on_segment(point, &a, &b);
    let diff = point - closest;
    let dist = diff.norm();
    if dist >= radius {
        return None;
    }

    let outward = if dist > GEOM_EPSILON {
        diff / dist
    } else {
        any_perpendicular(&axis)
    };

    Some(ContactManifold::new(
        closest + outward * radius,
        -outward,
        *point,
        radius - dist,
    ))
}

// ============================================================================
// Cylinder
// ============================================================================

/// Cylinder A against point B.
///
/// The point is pushed out through the nearest surface: the side wall or
/// one of the two caps.
#[must_use]
pub fn test_cylinder_to_point(
    position: &Point3<f64>,
    axis: &Vector3<f64>,
    radius: f64,
    length: f64,
    point: &Point3<f64>,
) -> Option<ContactManifold> {
    let Some(axis) = axis.try_normalize(GEOM_EPSILON) else {
        return test_sphere_to_point(position, radius, point);
    };
    let half = length * 0.5;
    let rel = point - position;
    let dist_n = rel.dot(&axis);
    if dist_n.abs() >= half {
        return None;
    }

    let perp = rel - axis * dist_n;
    let dist_perp = perp.norm();
    if dist_perp >= radius {
        return None;
    }

    let side_depth = radius - dist_perp;
    let cap_depth = half - dist_n.abs();

    let (outward, depth) = if side_depth <= cap_depth {
        let radial = if dist_perp > GEOM_EPSILON {
            perp / dist_perp
        } else {
            any_perpendicular(&axis)
        };
        (radial, side_depth)
    } else {
        (axis * dist_n.signum(), cap_depth)
    };

    Some(ContactManifold::new(
        point + outward * depth,
        -outward,
        *point,
        depth,
    ))
}

/// Sphere A against cylinder B.
///
/// Three regions are distinguished: the side wall, a flat cap and the rim
/// where the cap meets the wall.
#[must_use]
pub fn test_sphere_to_cylinder(
    center: &Point3<f64>,
    sphere_radius: f64,
    cyl_position: &Point3<f64>,
    cyl_axis: &Vector3<f64>,
    cyl_radius: f64,
    cyl_length: f64,
) -> Option<ContactManifold> {
    let Some(cyl_axis) = cyl_axis.try_normalize(GEOM_EPSILON) else {
        return test_sphere_to_sphere(center, sphere_radius, cyl_position, cyl_radius);
    };
    let half = cyl_length * 0.5;
    let rel = center - cyl_position;
    let dist_n = rel.dot(&cyl_axis);
    let perp = rel - cyl_axis * dist_n;
    let dist_perp = perp.norm();
    let radial = if dist_perp > GEOM_EPSILON {
        perp / dist_perp
    } else {
        any_perpendicular(&cyl_axis)
    };

    // Side wall
    if dist_n.abs() < half {
        let depth = sphere_radius + cyl_radius - dist_perp;
        if depth <= 0.0 {
            return None;
        }
        return Some(ContactManifold::new(
            center - radial * sphere_radius,
            radial,
            cyl_position + cyl_axis * dist_n + radial * cyl_radius,
            depth,
        ));
    }

    let cap_normal = cyl_axis * dist_n.signum();

    // Cap face
    if dist_perp < cyl_radius {
        let depth = sphere_radius + half - dist_n.abs();
        if depth <= 0.0 {
            return None;
        }
        return Some(ContactManifold::new(
            center - cap_normal * sphere_radius,
            cap_normal,
            center - cap_normal * (dist_n.abs() - half),
            depth,
        ));
    }

    // Rim
    if dist_perp < cyl_radius + sphere_radius {
        let rim = cyl_position + cap_normal * half + radial * cyl_radius;
        let diag = center - rim;
        let diag_dist = diag.norm();
        if diag_dist >= sphere_radius {
            return None;
        }
        let normal = if diag_dist > GEOM_EPSILON {
            diag / diag_dist
        } else {
            (cap_normal + radial).normalize()
        };
        return Some(ContactManifold::new(
            center - normal * sphere_radius,
            normal,
            rim,
            sphere_radius - diag_dist,
        ));
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_capsule_point_side_and_miss() {
        let pos = Point3::origin();
        let axis = Vector3::z();
        let m = test_capsule_to_point(&pos, &axis, 0.5, 2.0, &Point3::new(0.3, 0.0, 0.5)).unwrap();
        assert_relative_eq!(m.depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(m.point_a, Point3::new(0.5, 0.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(m.normal_b, Vector3::x(), epsilon = 1e-12);

        assert!(test_capsule_to_point(&pos, &axis, 0.5, 2.0, &Point3::new(0.6, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_capsule_point_in_hemisphere() {
        let m = test_capsule_to_point(
            &Point3::origin(),
            &Vector3::z(),
            0.5,
            2.0,
            &Point3::new(0.0, 0.0, 1.4),
        )
        .unwrap();
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.normal_b, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_point_on_axis_is_finite() {
        let m = test_capsule_to_point(
            &Point3::origin(),
            &Vector3::z(),
            0.5,
            2.0,
            &Point3::origin(),
        )
        .unwrap();
        assert_relative_eq!(m.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.normal_b.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_point_side_and_cap() {
        let pos = Point3::origin();
        let axis = Vector3::z();

        let side = test_cylinder_to_point(&pos, &axis, 1.0, 4.0, &Point3::new(0.9, 0.0, 0.0)).unwrap();
        assert_relative_eq!(side.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(side.normal_b, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(side.point_a, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        let cap = test_cylinder_to_point(&pos, &axis, 1.0, 4.0, &Point3::new(0.0, 0.0, -1.95)).unwrap();
        assert_relative_eq!(cap.depth, 0.05, epsilon = 1e-12);
        assert_relative_eq!(cap.normal_b, -Vector3::z(), epsilon = 1e-12);

        assert!(test_cylinder_to_point(&pos, &axis, 1.0, 4.0, &Point3::new(0.0, 0.0, 2.5)).is_none());
        assert!(test_cylinder_to_point(&pos, &axis, 1.0, 4.0, &Point3::new(1.5, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_sphere_cylinder_side() {
        let m = test_sphere_to_cylinder(
            &Point3::new(1.3, 0.0, 0.2),
            0.5,
            &Point3::origin(),
            &Vector3::z(),
            1.0,
            2.0,
        )
        .unwrap();
        assert_relative_eq!(m.depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(m.point_b, Point3::new(1.0, 0.0, 0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_cylinder_cap() {
        let m = test_sphere_to_cylinder(
            &Point3::new(0.2, 0.0, -1.4),
            0.5,
            &Point3::origin(),
            &Vector3::z(),
            1.0,
            2.0,
        )
        .unwrap();
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a, -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(m.point_b, Point3::new(0.2, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_cylinder_rim() {
        let s = 0.3 / 2.0_f64.sqrt();
        let center = Point3::new(1.0 + s, 0.0, 1.0 + s);
        let m = test_sphere_to_cylinder(&center, 0.4, &Point3::origin(), &Vector3::z(), 1.0, 2.0)
            .unwrap();
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(m.point_b, Point3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
        let expected = Vector3::new(1.0, 0.0, 1.0).normalize();
        assert_relative_eq!(m.normal_a, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_cylinder_miss() {
        assert!(test_sphere_to_cylinder(
            &Point3::new(2.0, 0.0, 0.0),
            0.5,
            &Point3::origin(),
            &Vector3::z(),
            1.0,
            2.0
        )
        .is_none());
        assert!(test_sphere_to_cylinder(
            &Point3::new(0.0, 0.0, 3.0),
            0.5,
            &Point3::origin(),
            &Vector3::z(),
            1.0,
            2.0
        )
        .is_none());
    }

    #[test]
    fn test_cylinder_point_zero_axis_falls_back_to_sphere() {
        let m = test_cylinder_to_point(
            &Point3::origin(),
            &Vector3::zeros(),
            2.0,
            2.0,
            &Point3::new(0.1, 0.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(m.normal_a.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.normal_b, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 1.9, epsilon = 1e-12);
        assert!(m.normal_a.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_sphere_cylinder_zero_axis_falls_back_to_sphere() {
        let m = test_sphere_to_cylinder(
            &Point3::new(1.2, 0.0, 0.0),
            0.5,
            &Point3::origin(),
            &Vector3::zeros(),
            1.0,
            2.0,
        )
        .unwrap();
        assert_relative_eq!(m.normal_a, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_non_unit_axis_is_normalized() {
        let unit = test_cylinder_to_point(
            &Point3::origin(),
            &Vector3::z(),
            1.0,
            4.0,
            &Point3::new(0.0, 0.0, -1.95),
        )
        .unwrap();
        let scaled = test_cylinder_to_point(
            &Point3::origin(),
            &(Vector3::z() * 3.0),
            1.0,
            4.0,
            &Point3::new(0.0, 0.0, -1.95),
        )
        .unwrap();
        assert_relative_eq!(scaled.depth, unit.depth, epsilon = 1e-12);
        assert_relative_eq!(scaled.normal_b, unit.normal_b, epsilon = 1e-12);

        let m = test_sphere_to_cylinder(
            &Point3::new(0.2, 0.0, -1.4),
            0.5,
            &Point3::origin(),
            &(Vector3::z() * 0.5),
            1.0,
            2.0,
        )
        .unwrap();
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a, -Vector3::z(), epsilon = 1e-12);
    }
}
