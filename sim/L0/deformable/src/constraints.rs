//! Position-based constraints.
//!
//! This module provides stiffness-scaled PBD constraints:
//!
//! - [`DistanceConstraint`] - Keeps two particles at a rest length
//! - [`AreaConstraint`] - Preserves the area of a triangle
//! - [`DihedralConstraint`] - Preserves the bending angle across a shared edge
//! - [`VolumeConstraint`] - Preserves the signed volume of a tetrahedron
//!
//! # Projection
//!
//! Each constraint with value `C` and gradients `∇C_i` moves its particles by
//!
//! ```text
//! λ = k · C / Σ w_i |∇C_i|²
//! Δx_i = -w_i · λ · ∇C_i
//! ```
//!
//! where `w_i` are inverse masses and `k` in `[0, 1]` is the stiffness.
//! Deltas are computed from a read-only view of the positions and applied
//! afterwards, which lets a partition of disjoint constraints run in
//! parallel.

use std::fmt;

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Threshold below which lengths, areas and weight sums count as degenerate.
pub const EPS: f64 = 1.0e-6;

/// Position deltas in the order of [`PbdConstraint::particles`].
pub type PositionDeltas = SmallVec<[Vector3<f64>; 4]>;

/// A constraint projected directly on particle positions.
pub trait PbdConstraint: Send + Sync + fmt::Debug {
    /// Particles touched by the constraint.
    fn particles(&self) -> SmallVec<[usize; 4]>;

    /// Corrections for [`particles`](Self::particles), or `None` when the
    /// configuration is degenerate or every particle is fixed.
    fn position_deltas(&self, positions: &[Point3<f64>], inv_masses: &[f64])
        -> Option<PositionDeltas>;

    /// Project the constraint in place. Returns `false` without moving any
    /// particle when nothing could be projected.
    fn solve_position_constraint(&self, positions: &mut [Point3<f64>], inv_masses: &[f64]) -> bool {
        let Some(deltas) = self.position_deltas(positions, inv_masses) else {
            return false;
        };
        for (&i, delta) in self.particles().iter().zip(&deltas) {
            positions[i] += delta;
        }
        true
    }
}

/// Scale gradients by `-w_i * k * c / Σ w_i |∇C_i|²`.
fn project<const N: usize>(
    c: f64,
    stiffness: f64,
    gradients: [Vector3<f64>; N],
    weights: [f64; N],
) -> Option<PositionDeltas> {
    let denom: f64 = gradients
        .iter()
        .zip(&weights)
        .map(|(g, &w)| w * g.norm_squared())
        .sum();
    if denom < EPS * EPS {
        return None;
    }
    let lambda = c / denom * stiffness;
    Some(
        gradients
            .iter()
            .zip(&weights)
            .map(|(g, &w)| g * (-w * lambda))
            .collect(),
    )
}

/// Keeps two particles at a rest length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceConstraint {
    /// Particle indices.
    pub particles: [usize; 2],
    /// Target distance.
    pub rest_length: f64,
    /// Stiffness in `[0, 1]`.
    pub stiffness: f64,
}

impl DistanceConstraint {
    /// Create a distance constraint.
    #[must_use]
    pub const fn new(p0: usize, p1: usize, rest_length: f64, stiffness: f64) -> Self {
        Self {
            particles: [p0, p1],
            rest_length,
            stiffness,
        }
    }

    /// Create a distance constraint whose rest length is the current distance.
    #[must_use]
    pub fn from_positions(p0: usize, p1: usize, positions: &[Point3<f64>], stiffness: f64) -> Self {
        let rest_length = (positions[p1] - positions[p0]).norm();
        Self::new(p0, p1, rest_length, stiffness)
    }

    /// Constraint value `|x1 - x0| - rest_length`.
    #[must_use]
    pub fn evaluate(&self, positions: &[Point3<f64>]) -> f64 {
        let [p0, p1] = self.particles;
        (positions[p1] - positions[p0]).norm() - self.rest_length
    }
}

impl PbdConstraint for DistanceConstraint {
    fn particles(&self) -> SmallVec<[usize; 4]> {
        SmallVec::from_slice(&self.particles)
    }

    fn position_deltas(&self, positions: &[Point3<f64>], inv_masses: &[f64]) -> Option<PositionDeltas> {
        let [i0, i1] = self.particles;
        let (w0, w1) = (inv_masses[i0], inv_masses[i1]);
        let w_sum = w0 + w1;
        if w_sum == 0.0 {
            return None;
        }

        let diff = positions[i1] - positions[i0];
        let len = diff.norm();
        if len < EPS {
            return None;
        }
        let correction = diff / len * (self.stiffness * (len - self.rest_length) / w_sum);

        let mut deltas = PositionDeltas::new();
        deltas.push(correction * w0);
        deltas.push(-correction * w1);
        Some(deltas)
    }
}

/// Preserves the area of a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaConstraint {
    /// Triangle corners.
    pub particles: [usize; 3],
    /// Target area.
    pub rest_area: f64,
    /// Stiffness in `[0, 1]`.
    pub stiffness: f64,
}

impl AreaConstraint {
    /// Create an area constraint.
    #[must_use]
    pub const fn new(particles: [usize; 3], rest_area: f64, stiffness: f64) -> Self {
        Self {
            particles,
            rest_area,
            stiffness,
        }
    }

    /// Create an area constraint from the current triangle.
    #[must_use]
    pub fn from_positions(particles: [usize; 3], positions: &[Point3<f64>], stiffness: f64) -> Self {
        let [a, b, c] = particles.map(|i| positions[i]);
        Self::new(particles, triangle_area(&a, &b, &c), stiffness)
    }
}

fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

impl PbdConstraint for AreaConstraint {
    fn particles(&self) -> SmallVec<[usize; 4]> {
        SmallVec::from_slice(&self.particles)
    }

    fn position_deltas(&self, positions: &[Point3<f64>], inv_masses: &[f64]) -> Option<PositionDeltas> {
        let [p0, p1, p2] = self.particles.map(|i| positions[i]);
        let e1 = p0 - p1;
        let e2 = p1 - p2;
        let e3 = p2 - p0;

        let n = e1.cross(&e2);
        let area = 0.5 * n.norm();
        if area < EPS {
            return None;
        }
        let n = n / (2.0 * area);

        project(
            area - self.rest_area,
            self.stiffness,
            [e2.cross(&n), e3.cross(&n), e1.cross(&n)],
            self.particles.map(|i| inv_masses[i]),
        )
    }
}

/// Preserves the bending angle between two triangles sharing an edge.
///
/// `particles[2]` and `particles[3]` span the shared edge; `particles[0]` and
/// `particles[1]` are the opposite corners.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DihedralConstraint {
    /// `[opposite_0, opposite_1, edge_0, edge_1]`.
    pub particles: [usize; 4],
    /// Target dihedral angle in radians.
    pub rest_angle: f64,
    /// Stiffness in `[0, 1]`.
    pub stiffness: f64,
}

impl DihedralConstraint {
    /// Create a dihedral constraint.
    #[must_use]
    pub const fn new(particles: [usize; 4], rest_angle: f64, stiffness: f64) -> Self {
        Self {
            particles,
            rest_angle,
            stiffness,
        }
    }

    /// Create a dihedral constraint from the current configuration.
    ///
    /// A degenerate configuration gets rest angle 0.
    #[must_use]
    pub fn from_positions(particles: [usize; 4], positions: &[Point3<f64>], stiffness: f64) -> Self {
        let rest_angle = dihedral_angle(&particles.map(|i| positions[i])).unwrap_or(0.0);
        Self::new(particles, rest_angle, stiffness)
    }

    /// Current dihedral angle, `None` if either triangle is degenerate.
    #[must_use]
    pub fn angle(&self, positions: &[Point3<f64>]) -> Option<f64> {
        dihedral_angle(&self.particles.map(|i| positions[i]))
    }
}

fn dihedral_angle([p0, p1, p2, p3]: &[Point3<f64>; 4]) -> Option<f64> {
    let e = p3 - p2;
    let l = e.norm();
    let n1 = (p3 - p0).cross(&e).try_normalize(EPS)?;
    let n2 = e.cross(&(p3 - p1)).try_normalize(EPS)?;
    (l >= EPS).then(|| n1.cross(&n2).dot(&e).atan2(l * n1.dot(&n2)))
}

impl PbdConstraint for DihedralConstraint {
    fn particles(&self) -> SmallVec<[usize; 4]> {
        SmallVec::from_slice(&self.particles)
    }

    fn position_deltas(&self, positions: &[Point3<f64>], inv_masses: &[f64]) -> Option<PositionDeltas> {
        let weights = self.particles.map(|i| inv_masses[i]);
        if weights[0] == 0.0 && weights[1] == 0.0 {
            return None;
        }
        let [p0, p1, p2, p3] = self.particles.map(|i| positions[i]);

        let e = p3 - p2;
        let e1 = p3 - p0;
        let e2 = p0 - p2;
        let e3 = p3 - p1;
        let e4 = p1 - p2;

        let l = e.norm();
        if l < EPS {
            return None;
        }
        let n1 = e1.cross(&e);
        let n2 = e.cross(&e3);
        let a1 = n1.norm();
        let a2 = n2.norm();
        if a1 < EPS || a2 < EPS {
            return None;
        }
        let n1 = n1 / a1;
        let n2 = n2 / a2;

        let gradients = [
            n1 * (-l / a1),
            n2 * (-l / a2),
            n1 * (e.dot(&e1) / (a1 * l)) + n2 * (e.dot(&e3) / (a2 * l)),
            n1 * (e.dot(&e2) / (a1 * l)) + n2 * (e.dot(&e4) / (a2 * l)),
        ];
        let angle = n1.cross(&n2).dot(&e).atan2(l * n1.dot(&n2));

        project(angle - self.rest_angle, self.stiffness, gradients, weights)
    }
}

/// Preserves the signed volume of a tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeConstraint {
    /// Tetrahedron corners.
    pub particles: [usize; 4],
    /// Target signed volume.
    pub rest_volume: f64,
    /// Stiffness in `[0, 1]`.
    pub stiffness: f64,
}

impl VolumeConstraint {
    /// Create a volume constraint.
    #[must_use]
    pub const fn new(particles: [usize; 4], rest_volume: f64, stiffness: f64) -> Self {
        Self {
            particles,
            rest_volume,
            stiffness,
        }
    }

    /// Create a volume constraint from the current tetrahedron.
    #[must_use]
    pub fn from_positions(particles: [usize; 4], positions: &[Point3<f64>], stiffness: f64) -> Self {
        let rest_volume = signed_volume(&particles.map(|i| positions[i]));
        Self::new(particles, rest_volume, stiffness)
    }

    /// Current signed volume.
    #[must_use]
    pub fn volume(&self, positions: &[Point3<f64>]) -> f64 {
        signed_volume(&self.particles.map(|i| positions[i]))
    }
}

fn signed_volume([x1, x2, x3, x4]: &[Point3<f64>; 4]) -> f64 {
    (x2 - x1).cross(&(x3 - x1)).dot(&(x4 - x1)) / 6.0
}

impl PbdConstraint for VolumeConstraint {
    fn particles(&self) -> SmallVec<[usize; 4]> {
        SmallVec::from_slice(&self.particles)
    }

    fn position_deltas(&self, positions: &[Point3<f64>], inv_masses: &[f64]) -> Option<PositionDeltas> {
        let [x1, x2, x3, x4] = self.particles.map(|i| positions[i]);
        let sixth = 1.0 / 6.0;
        let gradients = [
            (x2 - x3).cross(&(x4 - x2)) * sixth,
            (x3 - x1).cross(&(x4 - x1)) * sixth,
            (x4 - x1).cross(&(x2 - x1)) * sixth,
            (x2 - x1).cross(&(x3 - x1)) * sixth,
        ];
        let volume = gradients[3].dot(&(x4 - x1));

        project(
            volume - self.rest_volume,
            self.stiffness,
            gradients,
            self.particles.map(|i| inv_masses[i]),
        )
    }
}
