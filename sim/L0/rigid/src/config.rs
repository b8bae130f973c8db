//! Rigid body solver configuration.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the [`RigidBodyConstraintSolver`](crate::RigidBodyConstraintSolver).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyConfig {
    /// Timestep in seconds.
    pub dt: f64,

    /// Gravitational acceleration.
    pub gravity: Vector3<f64>,

    /// PGS sweeps per solve.
    pub max_num_iterations: usize,

    /// PGS convergence threshold.
    pub epsilon: f64,

    /// When set to `n`, at most `2n` constraints are solved per step.
    pub max_num_constraints: Option<usize>,

    /// Multiplicative linear velocity damping per step (1 = none).
    pub velocity_damping: f64,

    /// Multiplicative angular velocity damping per step (1 = none).
    pub angular_velocity_damping: f64,

    /// Body count above which per-body loops run in parallel.
    pub max_bodies_parallel: usize,

    /// PGS relaxation factor.
    pub relaxation: f64,
}

impl Default for RigidBodyConfig {
    fn default() -> Self {
        Self {
            dt: 0.001,
            gravity: Vector3::new(0.0, -9.81, 0.0),
            max_num_iterations: 10,
            epsilon: 1.0e-4,
            max_num_constraints: None,
            velocity_damping: 1.0,
            angular_velocity_damping: 1.0,
            max_bodies_parallel: 10,
            relaxation: 1.0,
        }
    }
}

impl RigidBodyConfig {
    /// Interactive rate with a constraint cap.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            dt: 1.0 / 60.0,
            max_num_iterations: 10,
            max_num_constraints: Some(1000),
            ..Self::default()
        }
    }

    /// Small steps and many sweeps for validation runs.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            dt: 1.0e-4,
            max_num_iterations: 200,
            epsilon: 1.0e-10,
            ..Self::default()
        }
    }

    /// Set the timestep.
    #[must_use]
    pub const fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set gravity.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set PGS sweeps per solve.
    #[must_use]
    pub const fn with_max_num_iterations(mut self, iterations: usize) -> Self {
        self.max_num_iterations = iterations;
        self
    }

    /// Set the PGS convergence threshold.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Cap the constraints solved per step at `2 * n`.
    #[must_use]
    pub const fn with_max_num_constraints(mut self, n: Option<usize>) -> Self {
        self.max_num_constraints = n;
        self
    }

    /// Set linear and angular damping.
    #[must_use]
    pub const fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.velocity_damping = linear;
        self.angular_velocity_damping = angular;
        self
    }

    /// Set the parallel threshold.
    #[must_use]
    pub const fn with_max_bodies_parallel(mut self, n: usize) -> Self {
        self.max_bodies_parallel = n;
        self
    }

    /// Set the PGS relaxation factor.
    #[must_use]
    pub const fn with_relaxation(mut self, relaxation: f64) -> Self {
        self.relaxation = relaxation;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if any configuration value is out of range.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err("dt must be positive and finite");
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err("gravity must be finite");
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err("epsilon must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.velocity_damping) {
            return Err("velocity damping must be in range [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.angular_velocity_damping) {
            return Err("angular velocity damping must be in range [0, 1]");
        }
        if self.relaxation <= 0.0 || self.relaxation >= 2.0 {
            return Err("relaxation must be in range (0, 2)");
        }
        Ok(())
    }
}
