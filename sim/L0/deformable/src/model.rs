//! PBD model stepping.
//!
//! ```text
//! For each time step:
//!   1. Integrate positions: v += (g + f/m) dt, v *= 1 - damping, x* = x + v dt
//!   2. Project constraints (PbdSolver)
//!   3. Caller projects collision constraints (PbdCollisionSolver), optional
//!   4. Update velocities: v = (x - x_prev) / dt
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use sim_types::{Result, SimError};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::CollisionBody;
use crate::constraints::PbdConstraint;
use crate::partition::PbdConstraintContainer;
use crate::particles::PbdParticles;
use crate::solver::PbdSolver;

/// Configuration for a [`PbdModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PbdModelConfig {
    /// Timestep in seconds.
    pub dt: f64,

    /// Gravitational acceleration.
    pub gravity: Vector3<f64>,

    /// Constraint sweeps per step.
    pub iterations: usize,

    /// Collision sweeps per step, for the caller's [`PbdCollisionSolver`](crate::PbdCollisionSolver).
    pub collision_iterations: usize,

    /// Fraction of velocity removed per step, in `[0, 1]`.
    pub viscous_damping: f64,

    /// Particle count above which position integration runs in parallel.
    pub parallel_threshold: usize,

    /// Minimum partition size; 0 keeps every constraint sequential.
    pub partition_threshold: usize,
}

impl Default for PbdModelConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            gravity: Vector3::new(0.0, -9.81, 0.0),
            iterations: 10,
            collision_iterations: 5,
            viscous_damping: 0.01,
            parallel_threshold: 50,
            partition_threshold: 0,
        }
    }
}

impl PbdModelConfig {
    /// Few sweeps, partitioned constraints.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            dt: 1.0 / 60.0,
            iterations: 5,
            collision_iterations: 2,
            partition_threshold: 16,
            ..Self::default()
        }
    }

    /// Small steps and many sweeps.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            dt: 1.0e-3,
            iterations: 50,
            collision_iterations: 10,
            viscous_damping: 0.0,
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

    /// Set constraint and collision sweeps.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize, collision_iterations: usize) -> Self {
        self.iterations = iterations;
        self.collision_iterations = collision_iterations;
        self
    }

    /// Set viscous damping.
    #[must_use]
    pub const fn with_damping(mut self, damping: f64) -> Self {
        self.viscous_damping = damping;
        self
    }

    /// Set the parallel integration threshold.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Set the minimum partition size.
    #[must_use]
    pub const fn with_partition_threshold(mut self, threshold: usize) -> Self {
        self.partition_threshold = threshold;
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
        if !(0.0..=1.0).contains(&self.viscous_damping) {
            return Err("viscous damping must be in range [0, 1]");
        }
        Ok(())
    }
}

struct Motion {
    gravity: Vector3<f64>,
    keep: f64,
    dt: f64,
}

fn integrate_particle(
    x: &mut Point3<f64>,
    prev: &mut Point3<f64>,
    v: &mut Vector3<f64>,
    inv_mass: f64,
    force: &Vector3<f64>,
    motion: &Motion,
) {
    *prev = *x;
    if inv_mass == 0.0 {
        *v = Vector3::zeros();
        return;
    }
    *v += (motion.gravity + force * inv_mass) * motion.dt;
    *v *= motion.keep;
    *x += *v * motion.dt;
}

/// Particles, their constraints and the solver that projects them.
#[derive(Debug)]
pub struct PbdModel {
    config: PbdModelConfig,
    particles: PbdParticles,
    constraints: PbdConstraintContainer,
    solver: PbdSolver,
    needs_partition: bool,
}

impl PbdModel {
    /// Create a model over `particles`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration is invalid.
    pub fn new(particles: PbdParticles, config: PbdModelConfig) -> Result<Self> {
        if let Err(reason) = config.validate() {
            warn!(reason, "rejected pbd configuration");
            return Err(SimError::invalid_config(reason));
        }
        Ok(Self {
            solver: PbdSolver::new(config.iterations),
            config,
            particles,
            constraints: PbdConstraintContainer::new(),
            needs_partition: false,
        })
    }

    /// Replace the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration is invalid;
    /// the previous configuration is kept.
    pub fn configure(&mut self, config: PbdModelConfig) -> Result<()> {
        if let Err(reason) = config.validate() {
            warn!(reason, "rejected pbd configuration");
            return Err(SimError::invalid_config(reason));
        }
        if config.partition_threshold != self.config.partition_threshold {
            self.needs_partition = true;
        }
        self.solver.set_max_iterations(config.iterations);
        self.config = config;
        Ok(())
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &PbdModelConfig {
        &self.config
    }

    /// Particle buffers.
    #[must_use]
    pub fn particles(&self) -> &PbdParticles {
        &self.particles
    }

    /// Particle buffers, mutably.
    pub fn particles_mut(&mut self) -> &mut PbdParticles {
        &mut self.particles
    }

    /// Constraint container.
    #[must_use]
    pub fn constraints(&self) -> &PbdConstraintContainer {
        &self.constraints
    }

    /// Add a constraint. Partitions are rebuilt before the next projection.
    pub fn add_constraint(&mut self, constraint: impl PbdConstraint + 'static) {
        self.constraints.add(constraint);
        self.needs_partition = true;
    }

    /// Positions and inverse masses as a collision body.
    pub fn collision_body(&mut self) -> CollisionBody<'_> {
        CollisionBody::new(&mut self.particles.positions, &self.particles.inv_masses)
    }

    /// Predict positions from velocities, gravity and external forces.
    ///
    /// Previous positions are stored and external forces cleared. Fixed
    /// particles keep their position and get zero velocity.
    pub fn integrate_position(&mut self, dt: f64) {
        let motion = Motion {
            gravity: self.config.gravity,
            keep: 1.0 - self.config.viscous_damping,
            dt,
        };
        let p = &mut self.particles;

        if p.len() > self.config.parallel_threshold {
            p.positions
                .par_iter_mut()
                .zip(p.previous_positions.par_iter_mut())
                .zip(p.velocities.par_iter_mut())
                .zip(p.inv_masses.par_iter().zip(p.external_forces.par_iter()))
                .for_each(|(((x, prev), v), (&w, f))| integrate_particle(x, prev, v, w, f, &motion));
        } else {
            p.positions
                .iter_mut()
                .zip(p.previous_positions.iter_mut())
                .zip(p.velocities.iter_mut())
                .zip(p.inv_masses.iter().zip(p.external_forces.iter()))
                .for_each(|(((x, prev), v), (&w, f))| integrate_particle(x, prev, v, w, f, &motion));
        }

        p.external_forces.fill(Vector3::zeros());
    }

    /// Project all constraints, repartitioning first if constraints were
    /// added since the last projection.
    pub fn solve_constraints(&mut self) {
        if self.needs_partition {
            if self.config.partition_threshold > 0 {
                self.constraints.partition(self.config.partition_threshold);
            } else {
                self.constraints.clear_partitions();
            }
            self.needs_partition = false;
        }
        self.solver.solve(
            &mut self.particles.positions,
            &self.particles.inv_masses,
            &self.constraints,
        );
    }

    /// Derive velocities from the position change over `dt`.
    pub fn update_velocity(&mut self, dt: f64) {
        let p = &mut self.particles;
        for (((v, x), prev), &w) in p
            .velocities
            .iter_mut()
            .zip(&p.positions)
            .zip(&p.previous_positions)
            .zip(&p.inv_masses)
        {
            *v = if w > 0.0 { (x - prev) / dt } else { Vector3::zeros() };
        }
    }

    /// Integrate, project and update velocities with the configured `dt`.
    pub fn step(&mut self) {
        let dt = self.config.dt;
        self.integrate_position(dt);
        self.solve_constraints();
        self.update_velocity(dt);
        debug!(
            particles = self.particles.len(),
            constraints = self.constraints.len(),
            "pbd step"
        );
    }
}
