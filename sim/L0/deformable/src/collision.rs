//! Two-body collision constraints.
//!
//! A collision constraint couples elements of two separate particle buffers,
//! each borrowed as a [`CollisionBody`]. Every constraint measures a
//! separation `d` along a contact normal and projects when `d` falls below
//! the proximity:
//!
//! ```text
//! C = d - proximity        (active while C < 0)
//! ```
//!
//! Corrections on body A are scaled by `stiffness[0]`, those on body B by
//! `stiffness[1]`.

use std::fmt;

use nalgebra::{Point3, Vector3};
use sim_contact::{barycentric, edge_to_edge_closest_points};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constraints::EPS;

/// Mutable view of one body's particle buffers.
#[derive(Debug)]
pub struct CollisionBody<'a> {
    /// Positions, corrected in place.
    pub positions: &'a mut [Point3<f64>],
    /// Inverse masses.
    pub inv_masses: &'a [f64],
}

impl<'a> CollisionBody<'a> {
    /// Borrow a pair of buffers.
    #[must_use]
    pub fn new(positions: &'a mut [Point3<f64>], inv_masses: &'a [f64]) -> Self {
        Self {
            positions,
            inv_masses,
        }
    }

    /// Reborrow for a shorter lifetime.
    pub fn reborrow(&mut self) -> CollisionBody<'_> {
        CollisionBody {
            positions: &mut *self.positions,
            inv_masses: self.inv_masses,
        }
    }
}

/// A constraint between elements of two bodies.
pub trait PbdCollisionConstraint: Send + Sync + fmt::Debug {
    /// Project the constraint. Returns `false` when inactive or degenerate.
    fn solve_position_constraint(&self, a: &mut CollisionBody<'_>, b: &mut CollisionBody<'_>) -> bool;
}

/// Contact parameters shared by the collision constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionParams {
    /// Correction scale for body A and body B.
    pub stiffness: [f64; 2],
    /// Separation below which the constraint activates.
    pub proximity: f64,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            stiffness: [1.0, 1.0],
            proximity: 0.1,
        }
    }
}

/// Element weights on one side of a contact.
type Side = SmallVec<[(usize, f64); 3]>;

/// Apply `C = d - proximity` along `n` to weighted elements of both bodies.
///
/// Side A moves along `+n`, side B along `-n`.
fn project_separation(
    params: &CollisionParams,
    d: f64,
    n: &Vector3<f64>,
    side_a: &Side,
    side_b: &Side,
    a: &mut CollisionBody<'_>,
    b: &mut CollisionBody<'_>,
) -> bool {
    let c = d - params.proximity;
    if c >= 0.0 {
        return false;
    }
    let denom: f64 = side_a
        .iter()
        .map(|&(i, s)| a.inv_masses[i] * s * s)
        .chain(side_b.iter().map(|&(i, s)| b.inv_masses[i] * s * s))
        .sum();
    if denom < EPS * EPS {
        return false;
    }
    let lambda = -c / denom;

    for &(i, s) in side_a {
        a.positions[i] += n * (a.inv_masses[i] * s * lambda * params.stiffness[0]);
    }
    for &(i, s) in side_b {
        b.positions[i] -= n * (b.inv_masses[i] * s * lambda * params.stiffness[1]);
    }
    true
}

fn side(items: &[(usize, f64)]) -> Side {
    SmallVec::from_slice(items)
}

/// Vertex of A against triangle of B.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointTriangleConstraint {
    /// Vertex of A.
    pub vertex: usize,
    /// Triangle of B.
    pub triangle: [usize; 3],
    /// Contact parameters.
    pub params: CollisionParams,
}

impl PointTriangleConstraint {
    /// Create a vertex-triangle constraint.
    #[must_use]
    pub const fn new(vertex: usize, triangle: [usize; 3], params: CollisionParams) -> Self {
        Self {
            vertex,
            triangle,
            params,
        }
    }
}

impl PbdCollisionConstraint for PointTriangleConstraint {
    fn solve_position_constraint(&self, a: &mut CollisionBody<'_>, b: &mut CollisionBody<'_>) -> bool {
        let p = a.positions[self.vertex];
        let [x0, x1, x2] = self.triangle.map(|i| b.positions[i]);

        let Some(n) = (x1 - x0).cross(&(x2 - x0)).try_normalize(EPS) else {
            return false;
        };
        let Some(bary) = barycentric(&p, &x0, &x1, &x2) else {
            return false;
        };
        if bary.iter().any(|&w| !(0.0..=1.0).contains(&w)) {
            return false;
        }

        // Signed height above the triangle plane along its winding normal
        let d = (p - x0).dot(&n);
        let [t0, t1, t2] = self.triangle;
        project_separation(
            &self.params,
            d,
            &n,
            &side(&[(self.vertex, 1.0)]),
            &side(&[(t0, bary.x), (t1, bary.y), (t2, bary.z)]),
            a,
            b,
        )
    }
}

/// Edge of A against edge of B.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeEdgeConstraint {
    /// Edge of A.
    pub edge_a: [usize; 2],
    /// Edge of B.
    pub edge_b: [usize; 2],
    /// Contact parameters.
    pub params: CollisionParams,
}

impl EdgeEdgeConstraint {
    /// Create an edge-edge constraint.
    #[must_use]
    pub const fn new(edge_a: [usize; 2], edge_b: [usize; 2], params: CollisionParams) -> Self {
        Self {
            edge_a,
            edge_b,
            params,
        }
    }
}

impl PbdCollisionConstraint for EdgeEdgeConstraint {
    fn solve_position_constraint(&self, a: &mut CollisionBody<'_>, b: &mut CollisionBody<'_>) -> bool {
        let [a0, a1] = self.edge_a;
        let [b0, b1] = self.edge_b;
        let closest = edge_to_edge_closest_points(
            &a.positions[a0],
            &a.positions[a1],
            &b.positions[b0],
            &b.positions[b1],
        );
        if !closest.interior {
            return false;
        }

        let diff = closest.point_a - closest.point_b;
        let d = diff.norm();
        let Some(n) = diff.try_normalize(EPS) else {
            return false;
        };
        let (s, t) = (closest.s, closest.t);
        project_separation(
            &self.params,
            d,
            &n,
            &side(&[(a0, 1.0 - s), (a1, s)]),
            &side(&[(b0, 1.0 - t), (b1, t)]),
            a,
            b,
        )
    }
}

/// Vertex of A against vertex of B.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointPointConstraint {
    /// Vertex of A.
    pub vertex_a: usize,
    /// Vertex of B.
    pub vertex_b: usize,
    /// Contact parameters.
    pub params: CollisionParams,
}

impl PointPointConstraint {
    /// Create a vertex-vertex constraint.
    #[must_use]
    pub const fn new(vertex_a: usize, vertex_b: usize, params: CollisionParams) -> Self {
        Self {
            vertex_a,
            vertex_b,
            params,
        }
    }
}

impl PbdCollisionConstraint for PointPointConstraint {
    fn solve_position_constraint(&self, a: &mut CollisionBody<'_>, b: &mut CollisionBody<'_>) -> bool {
        let diff = a.positions[self.vertex_a] - b.positions[self.vertex_b];
        let d = diff.norm();
        let Some(n) = diff.try_normalize(EPS) else {
            return false;
        };
        project_separation(
            &self.params,
            d,
            &n,
            &side(&[(self.vertex_a, 1.0)]),
            &side(&[(self.vertex_b, 1.0)]),
            a,
            b,
        )
    }
}

/// Vertex of A against edge of B.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointEdgeConstraint {
    /// Vertex of A.
    pub vertex: usize,
    /// Edge of B.
    pub edge: [usize; 2],
    /// Contact parameters.
    pub params: CollisionParams,
}

impl PointEdgeConstraint {
    /// Create a vertex-edge constraint.
    #[must_use]
    pub const fn new(vertex: usize, edge: [usize; 2], params: CollisionParams) -> Self {
        Self {
            vertex,
            edge,
            params,
        }
    }
}

impl PbdCollisionConstraint for PointEdgeConstraint {
    fn solve_position_constraint(&self, a: &mut CollisionBody<'_>, b: &mut CollisionBody<'_>) -> bool {
        let p = a.positions[self.vertex];
        let [e0, e1] = self.edge;
        let origin = b.positions[e0];
        let edge = b.positions[e1] - origin;
        let len_sq = edge.norm_squared();
        if len_sq < EPS * EPS {
            return false;
        }
        let t = (p - origin).dot(&edge) / len_sq;
        if t <= 0.0 || t >= 1.0 {
            return false;
        }

        let diff = p - (origin + edge * t);
        let d = diff.norm();
        let Some(n) = diff.try_normalize(EPS) else {
            return false;
        };
        project_separation(
            &self.params,
            d,
            &n,
            &side(&[(self.vertex, 1.0)]),
            &side(&[(e0, 1.0 - t), (e1, t)]),
            a,
            b,
        )
    }
}
