//! Segment/triangle and triangle/triangle intersection.

use nalgebra::{Point3, Vector3};
use sim_types::tolerance::DOUBLE_EPS;

use crate::closest::barycentric;
use crate::manifold::TriangleContact;

/// Local vertex pairs of the three triangle edges, in test order.
const EDGES: [[usize; 2]; 3] = [[0, 1], [0, 2], [1, 2]];

/// Intersection of segment `pq` with triangle `abc`.
///
/// The endpoints must lie on opposite sides of the triangle plane (an
/// endpoint exactly on the plane counts as the positive side). Returns the
/// barycentric coordinates of the crossing point when it lies inside the
/// triangle.
#[must_use]
pub fn test_segment_triangle(
    p: &Point3<f64>,
    q: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<Vector3<f64>> {
    let normal = (b - a).cross(&(c - a));
    let dir = q - p;
    let denom = dir.dot(&normal);
    if denom.abs() < DOUBLE_EPS {
        return None;
    }

    let t1 = (a - p).dot(&normal);
    let t2 = (a - q).dot(&normal);
    let opposite = (t1 < 0.0 && t2 >= 0.0) || (t1 >= 0.0 && t2 < 0.0);
    if !opposite {
        return None;
    }

    let hit = p + dir * (t1 / denom);
    let uvw = barycentric(&hit, a, b, c)?;
    if uvw.iter().all(|&x| x >= 0.0) {
        Some(uvw)
    } else {
        None
    }
}

/// Classify how triangle A (mesh ids `tri_a`, positions `verts_a`) intersects
/// triangle B.
///
/// The edges of A are tested against B first. Two crossing edges mean the
/// vertex they share pierces B; a single crossing edge is paired with the
/// first edge of B that crosses A. Otherwise the edges of B are tested
/// against A, where two crossings mean a vertex of B pierces A.
#[must_use]
pub fn triangle_to_triangle(
    tri_a: [usize; 3],
    tri_b: [usize; 3],
    verts_a: &[Point3<f64>; 3],
    verts_b: &[Point3<f64>; 3],
) -> TriangleContact {
    let a_crossed = edges_crossing(verts_a, verts_b);
    match a_crossed.iter().filter(|&&hit| hit).count() {
        2 => {
            return TriangleContact::VertexTriangle {
                vertex: tri_a[shared_vertex(a_crossed)],
                triangle: tri_b,
            };
        }
        1 => {
            let ea = a_crossed.iter().position(|&hit| hit).unwrap_or(0);
            let b_crossed = edges_crossing(verts_b, verts_a);
            return match b_crossed.iter().position(|&hit| hit) {
                Some(eb) => TriangleContact::EdgeEdge {
                    edge_a: [tri_a[EDGES[ea][0]], tri_a[EDGES[ea][1]]],
                    edge_b: [tri_b[EDGES[eb][0]], tri_b[EDGES[eb][1]]],
                },
                None => TriangleContact::None,
            };
        }
        _ => {}
    }

    let b_crossed = edges_crossing(verts_b, verts_a);
    if b_crossed.iter().filter(|&&hit| hit).count() == 2 {
        return TriangleContact::TriangleVertex {
            triangle: tri_a,
            vertex: tri_b[shared_vertex(b_crossed)],
        };
    }

    TriangleContact::None
}

/// Which edges of `edges_of` cross triangle `against`.
fn edges_crossing(edges_of: &[Point3<f64>; 3], against: &[Point3<f64>; 3]) -> [bool; 3] {
    EDGES.map(|[i, j]| {
        test_segment_triangle(
            &edges_of[i],
            &edges_of[j],
            &against[0],
            &against[1],
            &against[2],
        )
        .is_some()
    })
}

/// Local index of the vertex shared by the two crossing edges.
fn shared_vertex(crossed: [bool; 3]) -> usize {
    match crossed {
        [true, true, _] => 0,
        [true, false, _] => 1,
        _ => 2,
    }
}
