//! Position-based dynamics for deformable bodies.
//!
//! This crate projects constraints directly on particle positions:
//!
//! - [`PbdParticles`] - Position, velocity and inverse mass buffers
//! - [`PbdConstraint`] - Distance, area, dihedral and volume constraints
//! - [`PbdConstraintContainer`] - Sequential list plus graph-colored partitions
//! - [`PbdSolver`] - Fixed-sweep projection, partitions solved with rayon
//! - [`PbdCollisionSolver`] - Per-frame two-body collision constraints
//! - [`PbdModel`] - Integration, projection and velocity update
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use sim_deformable::{DistanceConstraint, PbdModel, PbdModelConfig, PbdParticles};
//!
//! let mut particles = PbdParticles::new();
//! let anchor = particles.add_particle(Point3::origin(), 0.0);
//! let bob = particles.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0);
//!
//! let mut model = PbdModel::new(particles, PbdModelConfig::default())?;
//! model.add_constraint(DistanceConstraint::new(anchor, bob, 1.0, 1.0));
//! for _ in 0..10 {
//!     model.step();
//! }
//!
//! let p = &model.particles().positions;
//! assert!(((p[bob] - p[anchor]).norm() - 1.0).abs() < 1e-6);
//! # Ok::<(), sim_types::SimError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-deformable/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

pub mod collision;
pub mod constraints;
mod model;
mod partition;
mod particles;
mod solver;

pub use collision::{
    CollisionBody, CollisionParams, EdgeEdgeConstraint, PbdCollisionConstraint,
    PointEdgeConstraint, PointPointConstraint, PointTriangleConstraint,
};
pub use constraints::{
    AreaConstraint, DihedralConstraint, DistanceConstraint, PbdConstraint, PositionDeltas,
    VolumeConstraint,
};
pub use model::{PbdModel, PbdModelConfig};
pub use partition::{BoxedConstraint, PbdConstraintContainer};
pub use particles::{ParticleFlags, PbdParticles};
pub use solver::{PbdCollisionSolver, PbdSolver};
