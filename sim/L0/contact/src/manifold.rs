//! Contact manifold and feature classification types.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How two shapes touch.
///
/// Shape A is the first argument of the test that produced the manifold,
/// shape B the second. `normal_a` is the direction A must move to separate,
/// so it points from B toward A; `normal_b` is its negation. `depth` is the
/// penetration depth and is never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactManifold {
    /// Deepest point of the contact on shape A.
    pub point_a: Point3<f64>,
    /// Unit separation direction for shape A.
    pub normal_a: Vector3<f64>,
    /// Deepest point of the contact on shape B.
    pub point_b: Point3<f64>,
    /// Unit separation direction for shape B.
    pub normal_b: Vector3<f64>,
    /// Penetration depth (>= 0).
    pub depth: f64,
}

impl ContactManifold {
    /// Build a manifold from shape A's point and normal.
    ///
    /// `normal_b` is set to `-normal_a`.
    #[must_use]
    pub fn new(
        point_a: Point3<f64>,
        normal_a: Vector3<f64>,
        point_b: Point3<f64>,
        depth: f64,
    ) -> Self {
        Self {
            point_a,
            normal_a,
            point_b,
            normal_b: -normal_a,
            depth: depth.max(0.0),
        }
    }

    /// The same contact seen from shape B.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            point_a: self.point_b,
            normal_a: self.normal_b,
            point_b: self.point_a,
            normal_b: self.normal_a,
            depth: self.depth,
        }
    }
}

/// Region of a triangle that contains the closest point to a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriangleRegion {
    /// Vertex A.
    VertexA,
    /// Vertex B.
    VertexB,
    /// Vertex C.
    VertexC,
    /// Interior of edge AB.
    EdgeAB,
    /// Interior of edge BC.
    EdgeBC,
    /// Interior of edge CA.
    EdgeCA,
    /// Interior of the face.
    Face,
}

impl TriangleRegion {
    /// Numeric case id: vertices 0..=2, edges AB/BC/CA 3..=5, face 6.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::VertexA => 0,
            Self::VertexB => 1,
            Self::VertexC => 2,
            Self::EdgeAB => 3,
            Self::EdgeBC => 4,
            Self::EdgeCA => 5,
            Self::Face => 6,
        }
    }

    /// Local vertex indices (0..3) spanning the region.
    #[must_use]
    pub fn local_vertices(self) -> &'static [usize] {
        match self {
            Self::VertexA => &[0],
            Self::VertexB => &[1],
            Self::VertexC => &[2],
            Self::EdgeAB => &[0, 1],
            Self::EdgeBC => &[1, 2],
            Self::EdgeCA => &[2, 0],
            Self::Face => &[0, 1, 2],
        }
    }
}

/// Region of a segment that contains the closest point to a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SegmentRegion {
    /// The first endpoint (also returned for zero-length segments).
    Start,
    /// The second endpoint.
    End,
    /// Strictly between the endpoints.
    Interior,
}

/// Classification of a triangle/triangle intersection.
///
/// Indices are the caller's mesh vertex ids, taken from the triangles passed
/// to [`triangle_to_triangle`](crate::triangle_to_triangle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriangleContact {
    /// The triangles do not intersect (or the intersection is not classifiable).
    #[default]
    None,
    /// An edge of A crosses an edge of B.
    EdgeEdge {
        /// Edge of triangle A.
        edge_a: [usize; 2],
        /// Edge of triangle B.
        edge_b: [usize; 2],
    },
    /// A vertex of A pierces triangle B.
    VertexTriangle {
        /// Vertex of triangle A.
        vertex: usize,
        /// Triangle B.
        triangle: [usize; 3],
    },
    /// A vertex of B pierces triangle A.
    TriangleVertex {
        /// Triangle A.
        triangle: [usize; 3],
        /// Vertex of triangle B.
        vertex: usize,
    },
}

impl TriangleContact {
    /// Numeric contact type: -1 none, 0 edge-edge, 1 vertex-triangle, 2 triangle-vertex.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::None => -1,
            Self::EdgeEdge { .. } => 0,
            Self::VertexTriangle { .. } => 1,
            Self::TriangleVertex { .. } => 2,
        }
    }

    /// Whether any contact was found.
    #[must_use]
    pub fn is_contact(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Mesh feature of a triangle closest to a sphere center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SphereTriangleFeature {
    /// Closest point on an edge.
    Edge([usize; 2]),
    /// Closest point in the face interior.
    Face([usize; 3]),
    /// Closest point at a vertex.
    Vertex(usize),
}

/// Closest points between two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeEdgeClosest {
    /// Closest point on the first segment.
    pub point_a: Point3<f64>,
    /// Closest point on the second segment.
    pub point_b: Point3<f64>,
    /// Parameter along the first segment, in [0, 1].
    pub s: f64,
    /// Parameter along the second segment, in [0, 1].
    pub t: f64,
    /// Both points lie strictly inside their segments and the segments are
    /// neither parallel nor degenerate.
    pub interior: bool,
}

impl EdgeEdgeClosest {
    /// Distance between the two closest points.
    #[must_use]
    pub fn distance(&self) -> f64 {
        (self.point_b - self.point_a).norm()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_manifold_clamps_depth_and_flips() {
        let m = ContactManifold::new(
            Point3::origin(),
            Vector3::z(),
            Point3::new(0.0, 0.0, 1.0),
            -0.1,
        );
        assert_eq!(m.depth, 0.0);
        assert_eq!(m.normal_b, -Vector3::z());

        let f = m.flipped();
        assert_eq!(f.point_a, m.point_b);
        assert_eq!(f.normal_a, m.normal_b);
    }

    #[test]
    fn test_triangle_contact_codes() {
        assert_eq!(TriangleContact::None.code(), -1);
        assert!(!TriangleContact::default().is_contact());
        let ee = TriangleContact::EdgeEdge {
            edge_a: [0, 1],
            edge_b: [2, 3],
        };
        assert_eq!(ee.code(), 0);
        let vt = TriangleContact::VertexTriangle {
            vertex: 0,
            triangle: [1, 2, 3],
        };
        assert_eq!(vt.code(), 1);
        let tv = TriangleContact::TriangleVertex {
            triangle: [1, 2, 3],
            vertex: 0,
        };
        assert_eq!(tv.code(), 2);
    }

    #[test]
    fn test_region_codes() {
        assert_eq!(TriangleRegion::VertexA.code(), 0);
        assert_eq!(TriangleRegion::EdgeCA.code(), 5);
        assert_eq!(TriangleRegion::Face.code(), 6);
        assert_eq!(TriangleRegion::EdgeBC.local_vertices(), &[1, 2]);
    }
}
