//! Tetrahedron containment and segment tests.

use nalgebra::{Matrix3, Point3};
use sim_types::tolerance::GEOM_EPSILON;

use crate::triangle::test_segment_triangle;

/// Local vertex triples of the four tetrahedron faces.
const FACES: [[usize; 3]; 4] = [[0, 1, 2], [1, 2, 3], [0, 2, 3], [0, 1, 3]];

/// Barycentric weights of `p` in tetrahedron `verts` when `p` is inside.
///
/// Points within `GEOM_EPSILON` of a face count as inside. Degenerate
/// (flat) tetrahedra contain nothing.
#[must_use]
pub fn test_point_to_tetrahedron(verts: &[Point3<f64>; 4], p: &Point3<f64>) -> Option<[f64; 4]> {
    let m = Matrix3::from_columns(&[
        verts[1] - verts[0],
        verts[2] - verts[0],
        verts[3] - verts[0],
    ]);
    if m.determinant().abs() < GEOM_EPSILON {
        return None;
    }
    let inv = m.try_inverse()?;
    let w = inv * (p - verts[0]);
    let weights = [1.0 - w.x - w.y - w.z, w.x, w.y, w.z];
    if weights.iter().all(|&x| x >= -GEOM_EPSILON) {
        Some(weights)
    } else {
        None
    }
}

/// Whether segment `pq` touches tetrahedron `verts`: it crosses a face or
/// has an endpoint inside.
#[must_use]
pub fn test_tet_to_segment(verts: &[Point3<f64>; 4], p: &Point3<f64>, q: &Point3<f64>) -> bool {
    let crosses_face = FACES.iter().any(|&[i, j, k]| {
        test_segment_triangle(p, q, &verts[i], &verts[j], &verts[k]).is_some()
    });
    crosses_face
        || test_point_to_tetrahedron(verts, p).is_some()
        || test_point_to_tetrahedron(verts, q).is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tet() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_point_inside_tet() {
        let w = test_point_to_tetrahedron(&unit_tet(), &Point3::new(0.1, 0.2, 0.3)).unwrap();
        assert_relative_eq!(w[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.2, epsilon = 1e-12);
        assert_relative_eq!(w[3], 0.3, epsilon = 1e-12);

        assert!(test_point_to_tetrahedron(&unit_tet(), &Point3::new(0.5, 0.5, 0.5)).is_none());
    }

    #[test]
    fn test_flat_tet_contains_nothing() {
        let flat = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        assert!(test_point_to_tetrahedron(&flat, &Point3::new(0.2, 0.2, 0.0)).is_none());
    }

    #[test]
    fn test_segment_vs_tet() {
        let tet = unit_tet();
        // Pierces the slanted face and the base
        assert!(test_tet_to_segment(
            &tet,
            &Point3::new(0.2, 0.2, -1.0),
            &Point3::new(0.2, 0.2, 2.0)
        ));
        // Fully inside
        assert!(test_tet_to_segment(
            &tet,
            &Point3::new(0.1, 0.1, 0.1),
            &Point3::new(0.2, 0.1, 0.1)
        ));
        // Outside
        assert!(!test_tet_to_segment(
            &tet,
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::new(3.0, 2.0, 2.0)
        ));
    }
}
