//! Iterative position projection.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each of `iterations` sweeps:
//!   1. Project every sequential constraint in order
//!   2. For each partition in order:
//!        gather deltas of all members from the same positions (parallel)
//!        scatter the deltas back (members touch disjoint particles)
//! ```
//!
//! Sequential constraints see the corrections of the constraints before
//! them in the same sweep, so their order matters. Members of a partition
//! never share a particle, so gathering them from one snapshot gives the
//! same result as projecting them one by one.
//!
//! [`PbdCollisionSolver`] runs a fixed number of sweeps over two-body
//! collision constraints registered for the current frame and then forgets
//! them.

use nalgebra::Point3;
use rayon::prelude::*;
use sim_types::{Result, SimError};
use tracing::{debug, trace};

use crate::collision::{CollisionBody, PbdCollisionConstraint};
use crate::partition::{BoxedConstraint, PbdConstraintContainer};

/// Projects a [`PbdConstraintContainer`] onto borrowed particle buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbdSolver {
    iterations: usize,
    parallel_threshold: usize,
}

impl Default for PbdSolver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PbdSolver {
    /// Create a solver running `iterations` sweeps.
    #[must_use]
    pub const fn new(iterations: usize) -> Self {
        Self {
            iterations,
            parallel_threshold: 16,
        }
    }

    /// Partitions with fewer members than `threshold` are projected on the
    /// calling thread.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Set the number of sweeps.
    pub fn set_max_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    /// Number of sweeps.
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        self.iterations
    }

    /// Run exactly `iterations` sweeps over `container`.
    pub fn solve(
        &self,
        positions: &mut [Point3<f64>],
        inv_masses: &[f64],
        container: &PbdConstraintContainer,
    ) {
        if container.is_empty() {
            return;
        }
        for _ in 0..self.iterations {
            for constraint in container.sequential() {
                constraint.solve_position_constraint(positions, inv_masses);
            }
            for partition in container.partitions() {
                self.solve_partition(partition, positions, inv_masses);
            }
        }
        trace!(
            iterations = self.iterations,
            constraints = container.len(),
            partitions = container.partitions().len(),
            "pbd constraints projected"
        );
    }

    fn solve_partition(
        &self,
        partition: &[BoxedConstraint],
        positions: &mut [Point3<f64>],
        inv_masses: &[f64],
    ) {
        if partition.len() < self.parallel_threshold {
            for constraint in partition {
                constraint.solve_position_constraint(positions, inv_masses);
            }
            return;
        }

        let snapshot: &[Point3<f64>] = positions;
        let gathered: Vec<_> = partition
            .par_iter()
            .filter_map(|c| {
                c.position_deltas(snapshot, inv_masses)
                    .map(|deltas| (c.particles(), deltas))
            })
            .collect();

        for (particles, deltas) in gathered {
            for (&i, delta) in particles.iter().zip(&deltas) {
                positions[i] += delta;
            }
        }
    }
}

/// Constraints between two registered bodies.
#[derive(Debug)]
struct CollisionList {
    constraints: Vec<Box<dyn PbdCollisionConstraint>>,
    body_a: usize,
    body_b: usize,
}

/// Per-frame registry of two-body collision constraints.
///
/// Bodies are borrowed for `'a`, so the registry lives no longer than the
/// buffers it corrects. A body registered once with
/// [`add_body`](Self::add_body) can take part in any number of lists.
#[derive(Debug, Default)]
pub struct PbdCollisionSolver<'a> {
    collision_iterations: usize,
    bodies: Vec<CollisionBody<'a>>,
    lists: Vec<CollisionList>,
}

impl<'a> PbdCollisionSolver<'a> {
    /// Create a solver running `collision_iterations` sweeps.
    #[must_use]
    pub fn new(collision_iterations: usize) -> Self {
        Self {
            collision_iterations,
            bodies: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// Number of sweeps per solve.
    #[must_use]
    pub fn collision_iterations(&self) -> usize {
        self.collision_iterations
    }

    /// Set the number of sweeps per solve.
    pub fn set_collision_iterations(&mut self, iterations: usize) {
        self.collision_iterations = iterations;
    }

    /// Register a body and return its id.
    pub fn add_body(&mut self, body: CollisionBody<'a>) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Register `constraints` between two bodies borrowed for this frame.
    pub fn add_collision_constraints(
        &mut self,
        constraints: Vec<Box<dyn PbdCollisionConstraint>>,
        body_a: CollisionBody<'a>,
        body_b: CollisionBody<'a>,
    ) {
        let a = self.add_body(body_a);
        let b = self.add_body(body_b);
        self.lists.push(CollisionList {
            constraints,
            body_a: a,
            body_b: b,
        });
    }

    /// Register `constraints` between two bodies added with
    /// [`add_body`](Self::add_body).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTopology`] if an id is unknown or both ids
    /// name the same body.
    pub fn add_collision_constraints_between(
        &mut self,
        constraints: Vec<Box<dyn PbdCollisionConstraint>>,
        body_a: usize,
        body_b: usize,
    ) -> Result<()> {
        if body_a >= self.bodies.len() || body_b >= self.bodies.len() {
            return Err(SimError::invalid_topology("unknown collision body"));
        }
        if body_a == body_b {
            return Err(SimError::invalid_topology(
                "collision lists need two distinct bodies",
            ));
        }
        self.lists.push(CollisionList {
            constraints,
            body_a,
            body_b,
        });
        Ok(())
    }

    /// Number of registered lists.
    #[must_use]
    pub fn num_lists(&self) -> usize {
        self.lists.len()
    }

    /// Run `collision_iterations` sweeps over every list, then clear the
    /// registry. Bodies stay registered.
    pub fn solve(&mut self) {
        if self.lists.is_empty() {
            return;
        }

        let mut active = 0usize;
        for _ in 0..self.collision_iterations {
            for list in &self.lists {
                let Some((a, b)) = pair_mut(&mut self.bodies, list.body_a, list.body_b) else {
                    continue;
                };
                for constraint in &list.constraints {
                    if constraint.solve_position_constraint(a, b) {
                        active += 1;
                    }
                }
            }
        }
        debug!(
            lists = self.lists.len(),
            iterations = self.collision_iterations,
            active,
            "collision constraints solved"
        );
        self.lists.clear();
    }

    /// Release the borrowed bodies.
    pub fn clear(&mut self) {
        self.lists.clear();
        self.bodies.clear();
    }
}

/// Two distinct mutable elements of `items`.
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i >= items.len() || j >= items.len() {
        return None;
    }
    if i < j {
        let (lo, hi) = items.split_at_mut(j);
        Some((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = items.split_at_mut(i);
        Some((&mut hi[0], &mut lo[j]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::collision::{CollisionParams, PointTriangleConstraint};
    use crate::constraints::DistanceConstraint;
    use approx::assert_relative_eq;

    fn stretched_chain(n: usize) -> (Vec<Point3<f64>>, PbdConstraintContainer) {
        let positions: Vec<_> = (0..n).map(|i| Point3::new(2.0 * i as f64, 0.0, 0.0)).collect();
        let mut container = PbdConstraintContainer::new();
        for i in 0..n - 1 {
            container.add(DistanceConstraint::new(i, i + 1, 1.0, 1.0));
        }
        (positions, container)
    }

    fn max_error(positions: &[Point3<f64>]) -> f64 {
        positions
            .windows(2)
            .map(|w| ((w[1] - w[0]).norm() - 1.0).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_iterations_reduce_error() {
        let (mut x, container) = stretched_chain(8);
        let w = vec![1.0; 8];
        PbdSolver::new(1).solve(&mut x, &w, &container);
        let after_one = max_error(&x);

        let (mut y, _) = stretched_chain(8);
        PbdSolver::new(100).solve(&mut y, &w, &container);
        assert!(max_error(&y) < after_one);
        assert!(max_error(&y) < 1e-3);
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let (mut x, container) = stretched_chain(4);
        let before = x.clone();
        let mut solver = PbdSolver::default();
        solver.set_max_iterations(0);
        solver.solve(&mut x, &[1.0; 4], &container);
        assert_eq!(x, before);
    }

    #[test]
    fn test_parallel_partition_matches_sequential_projection() {
        let (mut x, mut container) = stretched_chain(64);
        let w = vec![1.0; 64];
        container.partition(1);

        let (mut y, _) = stretched_chain(64);
        let parallel = PbdSolver::new(5).with_parallel_threshold(0);
        let serial = PbdSolver::new(5).with_parallel_threshold(usize::MAX);
        parallel.solve(&mut x, &w, &container);
        serial.solve(&mut y, &w, &container);

        for (a, b) in x.iter().zip(&y) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fixed_particles_stay_put() {
        let (mut x, mut container) = stretched_chain(10);
        let mut w = vec![1.0; 10];
        w[0] = 0.0;
        container.partition(2);
        PbdSolver::new(20).with_parallel_threshold(0).solve(&mut x, &w, &container);
        assert_eq!(x[0], Point3::origin());
    }

    fn floor() -> Vec<Point3<f64>> {
        vec![
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, -1.0),
        ]
    }

    #[test]
    fn test_collision_registry_cleared_after_solve() {
        let mut cloth = vec![Point3::new(0.0, -0.05, 0.0)];
        let cloth_w = [1.0];
        let mut ground = floor();
        let ground_w = [0.0; 3];

        let mut solver = PbdCollisionSolver::new(3);
        let constraint = PointTriangleConstraint::new(0, [0, 1, 2], CollisionParams::default());
        solver.add_collision_constraints(
            vec![Box::new(constraint)],
            CollisionBody::new(&mut cloth, &cloth_w),
            CollisionBody::new(&mut ground, &ground_w),
        );
        assert_eq!(solver.num_lists(), 1);
        solver.solve();
        assert_eq!(solver.num_lists(), 0);

        // Registry empty: a second solve changes nothing
        solver.solve();
        solver.clear();
        drop(solver);
        assert_relative_eq!(cloth[0].y, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_shared_body_in_two_lists() {
        let mut cloth = vec![Point3::new(0.0, 0.02, 0.0), Point3::new(0.5, 0.03, 0.0)];
        let cloth_w = [1.0, 1.0];
        let mut left = floor();
        let mut right = floor();
        let fixed = [0.0; 3];

        let mut solver = PbdCollisionSolver::new(1);
        let c = solver.add_body(CollisionBody::new(&mut cloth, &cloth_w));
        let l = solver.add_body(CollisionBody::new(&mut left, &fixed));
        let r = solver.add_body(CollisionBody::new(&mut right, &fixed));
        let params = CollisionParams::default();
        solver
            .add_collision_constraints_between(
                vec![Box::new(PointTriangleConstraint::new(0, [0, 1, 2], params))],
                c,
                l,
            )
            .unwrap();
        solver
            .add_collision_constraints_between(
                vec![Box::new(PointTriangleConstraint::new(1, [0, 1, 2], params))],
                c,
                r,
            )
            .unwrap();
        assert!(solver.add_collision_constraints_between(Vec::new(), c, c).is_err());
        assert!(solver.add_collision_constraints_between(Vec::new(), c, 9).is_err());
        assert_eq!(solver.num_lists(), 2);
        solver.solve();
        solver.clear();
        drop(solver);

        assert_relative_eq!(cloth[0].y, 0.1, epsilon = 1e-12);
        assert_relative_eq!(cloth[1].y, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_pair_mut() {
        let mut v = [1, 2, 3];
        let (a, b) = pair_mut(&mut v, 2, 0).unwrap();
        std::mem::swap(a, b);
        assert_eq!(v, [3, 2, 1]);
        assert!(pair_mut(&mut v, 1, 1).is_none());
    }
}
