//! Rigid body constraint solver.
//!
//! One step runs three stages in order:
//!
//! 1. [`compute_tentative_velocities`](RigidBodyConstraintSolver::compute_tentative_velocities):
//!    gravity and accumulated forces advance the tentative velocities.
//! 2. [`solve_constraints`](RigidBodyConstraintSolver::solve_constraints):
//!    the queued constraints are assembled into
//!
//!    ```text
//!    A = J M⁻¹ Jᵀ
//!    b = Vu/dt - J (V/dt + M⁻¹ Fext)
//!    ```
//!
//!    and solved by PGS with per-row bounds. The reaction `Jᵀ x` is added to
//!    the body forces and the queue is cleared.
//! 3. [`integrate`](RigidBodyConstraintSolver::integrate): symplectic Euler
//!    with damping and quaternion renormalization.
//!
//! Bodies live in a generational arena. Adding or removing a body sets the
//! `modified` flag; the next [`initialize`](RigidBodyConstraintSolver::initialize)
//! assigns dense slots, rebuilds the state arrays and the block-diagonal
//! inverse mass matrix, and clears the flag.

use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};
use rayon::prelude::*;
use sim_constraint::{
    BlockInvMass, InvMassBlock, JacobianBuilder, PgsConfig, PgsSolveResult,
    ProjectedGaussSeidelSolver,
};
use sim_types::{BodyHandle, Result, SimError};
use tracing::{debug, trace, warn};

use crate::arena::Arena;
use crate::body::RigidBody;
use crate::config::RigidBodyConfig;
use crate::constraint::{ConstraintBody, RbdConstraint};
use crate::state::RigidBodyState;

#[derive(Debug, Clone)]
struct BodyEntry {
    body: RigidBody,
    slot: Option<usize>,
}

/// Rigid body model with a global velocity-level constraint solve.
#[derive(Debug)]
pub struct RigidBodyConstraintSolver {
    config: RigidBodyConfig,
    bodies: Arena<BodyEntry>,
    /// Handle of the body in each dense slot.
    slots: Vec<BodyHandle>,
    constraints: Vec<RbdConstraint>,
    current: RigidBodyState,
    previous: RigidBodyState,
    initial: RigidBodyState,
    inv_mass: BlockInvMass,
    pgs: ProjectedGaussSeidelSolver,
    modified: bool,
    edited: bool,
    rebuild_count: usize,
}

impl Default for RigidBodyConstraintSolver {
    fn default() -> Self {
        Self::new(RigidBodyConfig::default())
    }
}

impl RigidBodyConstraintSolver {
    /// Create an empty solver.
    #[must_use]
    pub fn new(config: RigidBodyConfig) -> Self {
        Self {
            pgs: ProjectedGaussSeidelSolver::new(pgs_config(&config)),
            config,
            bodies: Arena::new(),
            slots: Vec::new(),
            constraints: Vec::new(),
            current: RigidBodyState::default(),
            previous: RigidBodyState::default(),
            initial: RigidBodyState::default(),
            inv_mass: BlockInvMass::default(),
            modified: true,
            edited: false,
            rebuild_count: 0,
        }
    }

    /// Replace the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration is invalid;
    /// the previous configuration is kept.
    pub fn configure(&mut self, config: RigidBodyConfig) -> Result<()> {
        if let Err(reason) = config.validate() {
            warn!(reason, "rejected rigid body configuration");
            return Err(SimError::invalid_config(reason));
        }
        self.pgs = ProjectedGaussSeidelSolver::new(pgs_config(&config));
        self.config = config;
        Ok(())
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &RigidBodyConfig {
        &self.config
    }

    /// Timestep.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.config.dt
    }

    // =========================================================================
    // Body Management
    // =========================================================================

    /// Add a body. Takes effect on the next [`initialize`](Self::initialize).
    pub fn add_rigid_body(&mut self, body: RigidBody) -> BodyHandle {
        self.modified = true;
        self.bodies.insert(BodyEntry { body, slot: None })
    }

    /// Remove a body, returning it with its latest state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidHandle`] if the handle is stale.
    pub fn remove_rigid_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let entry = self
            .bodies
            .remove(handle)
            .ok_or_else(|| SimError::invalid_handle(handle))?;
        self.modified = true;
        Ok(entry.body)
    }

    /// Get a body.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle).map(|e| &e.body)
    }

    /// Get a body mutably.
    ///
    /// Kinematic edits are pulled into the solver state on the next
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let entry = self.bodies.get_mut(handle)?;
        self.edited = true;
        Some(&mut entry.body)
    }

    /// Number of live bodies.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Dense slot of a body, assigned by the last rebuild.
    #[must_use]
    pub fn slot(&self, handle: BodyHandle) -> Option<usize> {
        self.bodies.get(handle).and_then(|e| e.slot)
    }

    /// Snapshot of a body for building constraints.
    #[must_use]
    pub fn constraint_body(&self, handle: BodyHandle) -> Option<ConstraintBody> {
        self.body(handle).map(|b| ConstraintBody::new(handle, b))
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Queue a constraint for the next solve.
    pub fn add_constraint(&mut self, constraint: RbdConstraint) {
        self.constraints.push(constraint);
    }

    /// Number of queued constraints.
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Queued constraints, oldest first.
    #[must_use]
    pub fn constraints(&self) -> &[RbdConstraint] {
        &self.constraints
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &RigidBodyState {
        &self.current
    }

    /// State at the start of the last step, before gravity was applied.
    #[must_use]
    pub fn previous_state(&self) -> &RigidBodyState {
        &self.previous
    }

    /// State at the last rebuild.
    #[must_use]
    pub fn initial_state(&self) -> &RigidBodyState {
        &self.initial
    }

    /// Number of rebuilds performed by [`initialize`](Self::initialize).
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Whether the next [`initialize`](Self::initialize) will rebuild.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// PGS result of the last constraint solve.
    #[must_use]
    pub fn last_solve(&self) -> &PgsSolveResult {
        self.pgs.last_result()
    }

    /// Restore the state captured at the last rebuild.
    pub fn reset_to_initial(&mut self) {
        self.current = self.initial.clone();
        self.previous = self.initial.clone();
        self.constraints.clear();
        self.write_back();
    }

    /// Restore the state captured at the start of the last step.
    ///
    /// Stepping again from the restored state reproduces that step. Queued
    /// constraints are dropped.
    pub fn rollback_to_previous(&mut self) {
        self.current = self.previous.clone();
        self.constraints.clear();
        self.write_back();
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Rebuild slots, state and inverse mass if bodies were added or removed.
    ///
    /// Without pending additions or removals this only pulls in edits made
    /// through [`body_mut`](Self::body_mut).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SingularInertia`] if a dynamic body's inertia
    /// tensor is not invertible. Nothing is rebuilt in that case.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.modified {
            self.pull_edits();
            return Ok(());
        }

        let mut state = RigidBodyState::with_capacity(self.bodies.len());
        let mut blocks = Vec::with_capacity(self.bodies.len());
        let mut slots = Vec::with_capacity(self.bodies.len());

        for (handle, entry) in self.bodies.iter() {
            let body = &entry.body;
            let Some(inv_inertia) = body.inv_inertia() else {
                warn!(%handle, "inertia tensor is not invertible");
                return Err(SimError::SingularInertia { handle });
            };
            state.push(body, inv_inertia);
            blocks.push(if body.is_static {
                InvMassBlock::static_body()
            } else {
                InvMassBlock::new(body.inv_mass(), inv_inertia)
            });
            slots.push(handle);
        }

        for (slot, &handle) in slots.iter().enumerate() {
            if let Some(entry) = self.bodies.get_mut(handle) {
                entry.slot = Some(slot);
            }
        }

        self.inv_mass = BlockInvMass::new(blocks);
        self.initial = state.clone();
        self.previous = state.clone();
        self.current = state;
        self.slots = slots;
        self.modified = false;
        self.edited = false;
        self.rebuild_count += 1;
        debug!(
            bodies = self.slots.len(),
            rebuilds = self.rebuild_count,
            "rigid body state rebuilt"
        );
        Ok(())
    }

    /// Recompute inverse masses and inertias from the bodies without
    /// reassigning slots.
    ///
    /// Singular inertia tensors are logged and keep their previous inverse.
    pub fn update_mass(&mut self) {
        let mut blocks = Vec::with_capacity(self.slots.len());
        for (slot, &handle) in self.slots.iter().enumerate() {
            let Some(entry) = self.bodies.get(handle) else {
                blocks.push(InvMassBlock::static_body());
                continue;
            };
            let body = &entry.body;
            self.current.inv_masses[slot] = body.inv_mass();
            match body.inv_inertia() {
                Some(inv) => self.current.inv_inertias[slot] = inv,
                None => warn!(%handle, "inertia tensor is not invertible"),
            }
            blocks.push(if body.is_static {
                InvMassBlock::static_body()
            } else {
                InvMassBlock::new(body.inv_mass(), self.current.inv_inertias[slot])
            });
        }
        self.inv_mass = BlockInvMass::new(blocks);
    }

    /// Advance tentative velocities by gravity and the accumulated forces.
    ///
    /// This opens a step: the untouched state is kept as the previous
    /// snapshot first.
    pub fn compute_tentative_velocities(&mut self) {
        self.previous = self.current.clone();

        let dt = self.config.dt;
        let gravity = self.config.gravity;
        let n = self.current.len();
        let state = &self.current;

        let updated: Vec<_> = if n > self.config.max_bodies_parallel {
            (0..n)
                .into_par_iter()
                .map(|i| tentative_slot(state, i, &gravity, dt))
                .collect()
        } else {
            (0..n).map(|i| tentative_slot(state, i, &gravity, dt)).collect()
        };

        for (i, (force, v, w)) in updated.into_iter().enumerate() {
            self.current.forces[i] = force;
            self.current.tentative_velocities[i] = v;
            self.current.tentative_angular_velocities[i] = w;
        }
    }

    /// Solve the queued constraints and accumulate the reaction forces.
    ///
    /// The queue is empty afterwards. Constraints that reference removed
    /// bodies, or bodies added since the last rebuild, contribute nothing for
    /// that body.
    pub fn solve_constraints(&mut self) {
        if self.constraints.is_empty() {
            return;
        }

        if let Some(cap) = self.config.max_num_constraints {
            let limit = cap.saturating_mul(2);
            if self.constraints.len() > limit {
                let dropped = self.constraints.len() - limit;
                debug!(dropped, limit, "constraint cap reached, dropping oldest");
                self.constraints.drain(..dropped);
            }
        }

        let dt = self.config.dt;
        let rows = self.constraints.len();
        let cols = self.current.len() * 6;

        let v = self.current.stacked_tentative_velocities();
        let f_ext = self.current.stacked_forces();

        let mut builder = JacobianBuilder::new(rows, cols);
        let mut vu = nalgebra::DVector::zeros(rows);
        let mut bounds = Vec::with_capacity(rows);
        for (row, constraint) in self.constraints.iter().enumerate() {
            if let Some(start) = self.dynamic_column(constraint.body_a) {
                builder.add_vec3_row(row, start, &constraint.linear_a());
                builder.add_vec3_row(row, start + 3, &constraint.angular_a());
            }
            if let Some(start) = self.dynamic_column(constraint.body_b) {
                builder.add_vec3_row(row, start, &constraint.linear_b());
                builder.add_vec3_row(row, start + 3, &constraint.angular_b());
            }
            vu[row] = constraint.vu;
            bounds.push(constraint.range);
        }
        let jacobian = builder.build();

        let a = self.inv_mass.effective_mass(&jacobian);
        let b = &vu / dt - jacobian.mul_vec(&(&v / dt + self.inv_mass.mul_vec(&f_ext)));

        self.pgs.set_a(a);
        let x = match self.pgs.solve(&b, &bounds) {
            Ok(x) => x,
            Err(err) => {
                warn!(%err, "constraint solve failed");
                self.constraints.clear();
                return;
            }
        };
        trace!(
            rows,
            iterations = self.pgs.last_result().iterations_used,
            residual = self.pgs.energy(),
            "constraints solved"
        );

        let reaction = jacobian.mul_transpose_vec(&x);
        for (i, (force, torque)) in self
            .current
            .forces
            .iter_mut()
            .zip(self.current.torques.iter_mut())
            .enumerate()
        {
            *force += reaction.fixed_rows::<3>(i * 6).into_owned();
            *torque += reaction.fixed_rows::<3>(i * 6 + 3).into_owned();
        }

        self.constraints.clear();
    }

    /// Integrate velocities and poses, then clear forces.
    pub fn integrate(&mut self) {
        let dt = self.config.dt;
        let damping = (
            self.config.velocity_damping,
            self.config.angular_velocity_damping,
        );
        let n = self.current.len();
        let state = &self.current;

        let updated: Vec<_> = if n > self.config.max_bodies_parallel {
            (0..n)
                .into_par_iter()
                .map(|i| integrate_slot(state, i, dt, damping))
                .collect()
        } else {
            (0..n).map(|i| integrate_slot(state, i, dt, damping)).collect()
        };

        let state = &mut self.current;
        for (i, slot) in updated.into_iter().enumerate() {
            state.positions[i] = slot.position;
            state.orientations[i] = slot.orientation;
            state.velocities[i] = slot.velocity;
            state.angular_velocities[i] = slot.angular_velocity;
            state.tentative_velocities[i] = slot.velocity;
            state.tentative_angular_velocities[i] = slot.angular_velocity;
            state.forces[i] = Vector3::zeros();
            state.torques[i] = Vector3::zeros();
        }

        self.write_back();
    }

    /// Run one full step: initialize, tentative velocities, constraints,
    /// integration.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`initialize`](Self::initialize); nothing is
    /// advanced in that case.
    pub fn step(&mut self) -> Result<()> {
        self.initialize()?;
        self.compute_tentative_velocities();
        self.solve_constraints();
        self.integrate();
        Ok(())
    }

    /// Jacobian column of a live, dynamic, slotted body.
    fn dynamic_column(&self, handle: Option<BodyHandle>) -> Option<usize> {
        let slot = self.bodies.get(handle?)?.slot?;
        if self.current.is_static.get(slot).copied().unwrap_or(true) {
            return None;
        }
        Some(slot * 6)
    }

    fn pull_edits(&mut self) {
        if !self.edited {
            return;
        }
        for (slot, &handle) in self.slots.iter().enumerate() {
            if let Some(entry) = self.bodies.get(handle) {
                self.current.load_kinematics(slot, &entry.body);
            }
        }
        self.edited = false;
    }

    fn write_back(&mut self) {
        for (slot, &handle) in self.slots.iter().enumerate() {
            if let Some(entry) = self.bodies.get_mut(handle) {
                self.current.store_kinematics(slot, &mut entry.body);
            }
        }
    }
}

/// Kinematics of one slot after integration.
struct IntegratedSlot {
    position: Point3<f64>,
    orientation: UnitQuaternion<f64>,
    velocity: Vector3<f64>,
    angular_velocity: Vector3<f64>,
}

/// Returns `(force, tentative velocity, tentative angular velocity)`.
fn tentative_slot(
    state: &RigidBodyState,
    i: usize,
    gravity: &Vector3<f64>,
    dt: f64,
) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let inv_mass = state.inv_masses[i];
    if state.is_static[i] || inv_mass == 0.0 {
        return (
            state.forces[i],
            state.tentative_velocities[i],
            state.tentative_angular_velocities[i],
        );
    }
    let force = state.forces[i] + gravity / inv_mass;
    let v = state.tentative_velocities[i] + force * inv_mass * dt;
    let w = state.tentative_angular_velocities[i] + state.inv_inertias[i] * state.torques[i] * dt;
    (force, v, w)
}

fn integrate_slot(state: &RigidBodyState, i: usize, dt: f64, damping: (f64, f64)) -> IntegratedSlot {
    let mut slot = IntegratedSlot {
        position: state.positions[i],
        orientation: state.orientations[i],
        velocity: state.velocities[i],
        angular_velocity: state.angular_velocities[i],
    };
    if state.is_static[i] {
        return slot;
    }

    slot.velocity += state.forces[i] * state.inv_masses[i] * dt;
    slot.velocity *= damping.0;
    slot.angular_velocity += state.inv_inertias[i] * state.torques[i] * dt;
    slot.angular_velocity *= damping.1;
    slot.position += slot.velocity * dt;

    let q = slot.orientation.into_inner();
    let spin = Quaternion::from_imag(slot.angular_velocity) * q;
    slot.orientation = UnitQuaternion::new_normalize(q + spin * dt);
    slot
}

fn pgs_config(config: &RigidBodyConfig) -> PgsConfig {
    PgsConfig::default()
        .with_max_iterations(config.max_num_iterations)
        .with_epsilon(config.epsilon)
        .with_relaxation(config.relaxation)
}
