//! Sphere contact tests.

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::GEOM_EPSILON;

use crate::closest::{any_perpendicular, closest_point_on_triangle};
use crate::manifold::{ContactManifold, SphereTriangleFeature, TriangleRegion};

/// Sphere A against sphere B.
///
/// Coincident centers separate along +Z.
#[must_use]
pub fn test_sphere_to_sphere(
    center_a: &Point3<f64>,
    radius_a: f64,
    center_b: &Point3<f64>,
    radius_b: f64,
) -> Option<ContactManifold> {
    let diff = center_b - center_a;
    let dist = diff.norm();
    let depth = radius_a + radius_b - dist;
    if depth <= 0.0 {
        return None;
    }

    let dir_a_to_b = if dist > GEOM_EPSILON {
        diff / dist
    } else {
        Vector3::z()
    };

    Some(ContactManifold::new(
        center_a + dir_a_to_b * radius_a,
        -dir_a_to_b,
        center_b - dir_a_to_b * radius_b,
        depth,
    ))
}

/// Sphere A against point B.
///
/// `point_b` is the query point itself; `normal_b` pushes it out of the sphere.
#[must_use]
pub fn test_sphere_to_point(
    center: &Point3<f64>,
    radius: f64,
    point: &Point3<f64>,
) -> Option<ContactManifold> {
    let diff = point - center;
    let dist = diff.norm();
    if dist >= radius {
        return None;
    }

    let outward = if dist > GEOM_EPSILON {
        diff / dist
    } else {
        Vector3::z()
    };

    Some(ContactManifold::new(
        center + outward * radius,
        -outward,
        *point,
        radius - dist,
    ))
}

/// Sphere A against triangle B.
#[must_use]
pub fn test_sphere_to_triangle(
    center: &Point3<f64>,
    radius: f64,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<ContactManifold> {
    sphere_triangle(center, radius, a, b, c).map(|(manifold, _)| manifold)
}

/// Sphere A against a mesh triangle B, also reporting which mesh feature of
/// the triangle is closest to the sphere center.
///
/// `triangle` holds the mesh vertex ids of `verts`.
#[must_use]
pub fn test_sphere_to_triangle_feature(
    center: &Point3<f64>,
    radius: f64,
    triangle: [usize; 3],
    verts: &[Point3<f64>; 3],
) -> Option<(ContactManifold, SphereTriangleFeature)> {
    let (manifold, region) = sphere_triangle(center, radius, &verts[0], &verts[1], &verts[2])?;
    let [i0, i1, i2] = triangle;
    let feature = match region {
        TriangleRegion::VertexA => SphereTriangleFeature::Vertex(i0),
        TriangleRegion::VertexB => SphereTriangleFeature::Vertex(i1),
        TriangleRegion::VertexC => SphereTriangleFeature::Vertex(i2),
        TriangleRegion::EdgeAB => SphereTriangleFeature::Edge([i0, i1]),
        TriangleRegion::EdgeBC => SphereTriangleFeature::Edge([i1, i2]),
        TriangleRegion::EdgeCA => SphereTriangleFeature::Edge([i2, i0]),
        TriangleRegion::Face => SphereTriangleFeature::Face(triangle),
    };
    Some((manifold, feature))
}

fn sphere_triangle(
    center: &Point3<f64>,
    radius: f64,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<(ContactManifold, TriangleRegion)> {
    let (closest, region) = closest_point_on_triangle(center, a, b, c);
    let diff = center - closest;
    let dist = diff.norm();
    if dist >= radius {
        return None;
    }

    // Normal points from the triangle toward the sphere center
    let normal = if dist > GEOM_EPSILON {
        diff / dist
    } else {
        let face = (b - a).cross(&(c - a));
        let norm = face.norm();
        if norm > GEOM_EPSILON {
            face / norm
        } else {
            any_perpendicular(&(b - a).try_normalize(GEOM_EPSILON).unwrap_or_else(Vector3::x))
        }
    };

    Some((
        ContactManifold::new(center - normal * radius, normal, closest, radius - dist),
        region,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_spheres_overlap_by_half() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.5, 0.0, 0.0);
        let m = test_sphere_to_sphere(&a, 1.0, &b, 1.0).unwrap();

        assert_relative_eq!(m.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.normal_b.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a, -m.normal_b, epsilon = 1e-12);
        // A is pushed away from B
        assert_relative_eq!(m.normal_a, -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(m.point_a, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(m.point_b, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_separated_and_touching_spheres() {
        let a = Point3::origin();
        assert!(test_sphere_to_sphere(&a, 1.0, &Point3::new(3.0, 0.0, 0.0), 1.0).is_none());
        assert!(test_sphere_to_sphere(&a, 1.0, &Point3::new(2.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_coincident_spheres_stay_finite() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let m = test_sphere_to_sphere(&a, 1.0, &a, 0.5).unwrap();
        assert_relative_eq!(m.depth, 1.5, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_point() {
        let c = Point3::origin();
        let m = test_sphere_to_point(&c, 1.0, &Point3::new(0.0, 0.75, 0.0)).unwrap();
        assert_relative_eq!(m.depth, 0.25, epsilon = 1e-12);
        assert_relative_eq!(m.point_a, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(m.normal_b, Vector3::y(), epsilon = 1e-12);

        assert!(test_sphere_to_point(&c, 1.0, &Point3::new(0.0, 1.5, 0.0)).is_none());
    }

    #[test]
    fn test_sphere_triangle_face() {
        let verts = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let center = Point3::new(0.0, 0.0, 0.3);
        let m = test_sphere_to_triangle(&center, 0.5, &verts[0], &verts[1], &verts[2]).unwrap();
        assert_relative_eq!(m.depth, 0.2, epsilon = 1e-12);
        assert_relative_eq!(m.normal_a, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(m.point_b, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-12);

        let (_, feature) =
            test_sphere_to_triangle_feature(&center, 0.5, [10, 11, 12], &verts).unwrap();
        assert_eq!(feature, SphereTriangleFeature::Face([10, 11, 12]));
    }

    #[test]
    fn test_sphere_triangle_edge_and_vertex_features() {
        let verts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let (_, feature) =
            test_sphere_to_triangle_feature(&Point3::new(0.5, -0.2, 0.0), 0.3, [4, 5, 6], &verts)
                .unwrap();
        assert_eq!(feature, SphereTriangleFeature::Edge([4, 5]));

        let (_, feature) =
            test_sphere_to_triangle_feature(&Point3::new(-0.1, -0.1, 0.0), 0.3, [4, 5, 6], &verts)
                .unwrap();
        assert_eq!(feature, SphereTriangleFeature::Vertex(4));

        assert!(
            test_sphere_to_triangle_feature(&Point3::new(-1.0, -1.0, 0.0), 0.3, [4, 5, 6], &verts)
                .is_none()
        );
    }

    #[test]
    fn test_sphere_centered_on_triangle_uses_face_normal() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let m = test_sphere_to_triangle(&Point3::new(0.2, 0.2, 0.0), 0.1, &a, &b, &c).unwrap();
        assert_relative_eq!(m.normal_a, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(m.depth, 0.1, epsilon = 1e-12);
    }
}
