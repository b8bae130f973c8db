//! Unified contact dynamics API for CortenForge.
//!
//! This crate wires narrow-phase contacts into the solvers and re-exports
//! the stack:
//!
//! - [`sim_types`] - Errors, body handles and tolerances
//! - [`sim_contact`] - Narrow-phase geometry tests and contact manifolds
//! - [`sim_constraint`] - Projected Gauss-Seidel, Armijo line search, Newton
//! - [`sim_rigid`] - Rigid bodies solved with a global PGS pass
//! - [`sim_deformable`] - Position-based particles and collision constraints
//! - [`assembler`] - Contacts to rigid rows and PBD collision constraints
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It can be used in:
//!
//! - Headless training environments
//! - Surgical and haptic simulation loops
//! - Analysis and planning tools
//!
//! # Quick Start
//!
//! ```
//! use sim_physics::prelude::*;
//!
//! let mut solver = RigidBodyConstraintSolver::new(RigidBodyConfig::default().with_dt(0.01));
//! let center = Point3::new(0.0, 0.45, 0.0);
//! let ball = solver.add_rigid_body(RigidBody::sphere(1.0, 0.5, center));
//!
//! // The ground is shape A, the ball takes the flipped side
//! let assembler = RigidContactAssembler::default();
//! if let Some(m) = test_plane_to_sphere(&Point3::origin(), &Vector3::y(), &center, 0.5) {
//!     assembler.handle_manifold(&mut solver, ball, None, &m.flipped());
//! }
//! solver.step()?;
//!
//! assert!(solver.body(ball).is_some_and(|b| b.velocity.y > 0.0));
//! # Ok::<(), SimError>(())
//! ```
//!
//! # Deformable Collision
//!
//! ```
//! use sim_physics::prelude::*;
//!
//! let mut cloth = vec![Point3::new(0.25, 0.25, 0.05)];
//! let cloth_mass = vec![1.0];
//! let mut floor = vec![
//!     Point3::origin(),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let floor_mass = vec![0.0; 3];
//!
//! let contacts = [FeatureContact::new(
//!     FeatureElement::Vertex(0),
//!     FeatureElement::Triangle([0, 1, 2]),
//! )];
//! let batch = PbdCollisionAssembler::default().assemble(&contacts);
//!
//! let mut solver = PbdCollisionSolver::new(5);
//! let a = solver.add_body(CollisionBody::new(&mut cloth, &cloth_mass));
//! let b = solver.add_body(CollisionBody::new(&mut floor, &floor_mass));
//! batch.submit(&mut solver, a, b)?;
//! solver.solve();
//! drop(solver);
//!
//! assert!(cloth[0].z >= 0.1 - 1e-9);
//! # Ok::<(), SimError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  sim-physics (this crate)                   │
//! │              Contact assembly / re-exports                  │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//!   ┌─────────────┐     ┌──────────────┐     ┌────────────────┐
//!   │ sim-contact │     │  sim-rigid   │     │ sim-deformable │
//!   │ Narrow phase│     │ RBD + PGS    │     │ PBD + coloring │
//!   └──────┬──────┘     └──────┬───────┘     └───────┬────────┘
//!          │                   ▼                     │
//!          │           ┌────────────────┐            │
//!          │           │ sim-constraint │            │
//!          │           │ PGS, Armijo    │            │
//!          │           └───────┬────────┘            │
//!          └───────────────────┼─────────────────────┘
//!                              ▼
//!                     ┌─────────────────┐
//!                     │    sim-types    │
//!                     │ Errors, handles │
//!                     └─────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/sim-physics/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

pub mod assembler;

// Re-export sub-crates
pub use sim_constraint;
pub use sim_contact;
pub use sim_deformable;
pub use sim_rigid;
pub use sim_types;

// Re-export nalgebra for convenience
pub use nalgebra;

pub use assembler::{
    CollisionBatch, FeatureContact, FeatureElement, PbdCollisionAssembler, PointContact,
    RigidContactAssembler,
};

/// Prelude module for convenient imports.
///
/// Import everything you need with a single line:
///
/// ```
/// use sim_physics::prelude::*;
/// ```
pub mod prelude {
    // ========================================================================
    // Core types from sim-types
    // ========================================================================

    pub use sim_types::{BodyHandle, SimError};

    // ========================================================================
    // Narrow phase from sim-contact
    // ========================================================================

    pub use sim_contact::{
        closest_point_on_segment, closest_point_on_triangle, edge_to_edge_closest_points,
        test_plane_to_sphere, test_sphere_to_sphere, test_sphere_to_triangle, ContactManifold,
        TriangleContact,
    };

    // ========================================================================
    // Solvers from sim-constraint
    // ========================================================================

    pub use sim_constraint::{
        ArmijoLineSearch, NewtonConfig, NewtonSolver, NonLinearSystem, PgsConfig,
        ProjectedGaussSeidelSolver,
    };

    // ========================================================================
    // Rigid bodies from sim-rigid
    // ========================================================================

    pub use sim_rigid::{
        RbdConstraint, RigidBody, RigidBodyConfig, RigidBodyConstraintSolver, RigidBodyState,
    };

    // ========================================================================
    // Position-based dynamics from sim-deformable
    // ========================================================================

    pub use sim_deformable::{
        CollisionBody, DistanceConstraint, PbdCollisionConstraint, PbdCollisionSolver,
        PbdConstraint, PbdConstraintContainer, PbdModel, PbdModelConfig, PbdParticles, PbdSolver,
    };

    // ========================================================================
    // Contact assembly
    // ========================================================================

    pub use crate::assembler::{
        CollisionBatch, FeatureContact, FeatureElement, PbdCollisionAssembler, PointContact,
        RigidContactAssembler,
    };

    // ========================================================================
    // Math
    // ========================================================================

    pub use nalgebra::{Point3, UnitQuaternion, Vector3};
}
