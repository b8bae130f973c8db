//! Rigid body dynamics with velocity-level constraints.
//!
//! [`RigidBodyConstraintSolver`] owns a set of [`RigidBody`] values and a
//! queue of [`RbdConstraint`] rows. Each step advances tentative velocities,
//! solves every queued constraint at once with projected Gauss-Seidel, and
//! integrates with symplectic Euler.
//!
//! Bodies are addressed by generation-checked [`BodyHandle`]s. A handle to a
//! removed body is rejected rather than aliasing whatever body reuses its
//! slot.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use sim_rigid::{RbdConstraint, RigidBody, RigidBodyConfig, RigidBodyConstraintSolver};
//!
//! let mut solver = RigidBodyConstraintSolver::new(RigidBodyConfig::default().with_dt(0.01));
//! let ball = solver.add_rigid_body(RigidBody::sphere(1.0, 0.5, Point3::new(0.0, 0.45, 0.0)));
//! solver.initialize()?;
//!
//! // Ball sinks 0.05 into the ground plane y = 0
//! let snapshot = solver.constraint_body(ball).ok_or(sim_types::SimError::invalid_handle(ball))?;
//! let contact = RbdConstraint::contact(
//!     &snapshot,
//!     None,
//!     &Point3::origin(),
//!     &Vector3::y(),
//!     0.05,
//!     0.2,
//!     solver.dt(),
//! );
//! solver.add_constraint(contact);
//! solver.step()?;
//!
//! assert!(solver.body(ball).map_or(false, |b| b.velocity.y > 0.0));
//! # Ok::<(), sim_types::SimError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-rigid/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

mod arena;
mod body;
mod config;
mod constraint;
mod solver;
mod state;

pub use arena::Arena;
pub use body::RigidBody;
pub use config::RigidBodyConfig;
pub use constraint::{ConstraintBody, RbdConstraint};
pub use solver::RigidBodyConstraintSolver;
pub use state::RigidBodyState;

pub use sim_types::BodyHandle;
