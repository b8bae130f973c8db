//! Numeric solvers for constraint-based dynamics.
//!
//! This crate provides the linear and nonlinear solvers the rigid-body and
//! assembler crates build on:
//!
//! - [`ProjectedGaussSeidelSolver`] - Box-constrained `A x = b` over a sparse matrix
//! - [`ArmijoLineSearch`] - Backtracking line search with a safeguarded parabolic model
//! - [`NewtonSolver`] - Damped Newton iteration driving a [`NonLinearSystem`]
//! - [`JacobianBuilder`], [`BlockInvMass`] - Sparse Jacobian and effective mass assembly
//!
//! # Solver Selection
//!
//! | Problem | Solver |
//! |---------|--------|
//! | Contact impulses with bounds | [`ProjectedGaussSeidelSolver`] |
//! | Root of a smooth residual | [`NewtonSolver`] |
//! | Step length along a given direction | [`ArmijoLineSearch`] |
//!
//! Non-convergence is never an error: every solver returns its best iterate
//! and reports the final residual alongside it.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]

pub mod line_search;
pub mod newton;
pub mod pgs;
pub mod sparse;

pub use line_search::{ArmijoLineSearch, LineSearchResult, NonLinearSystem};
pub use newton::{NewtonConfig, NewtonResult, NewtonSolver};
pub use pgs::{PgsConfig, PgsSolveResult, ProjectedGaussSeidelSolver};
pub use sparse::{BlockInvMass, InvMassBlock, JacobianBuilder, SparseJacobian};

// Re-export the sparse matrix type used at the solver boundary
pub use nalgebra_sparse::CsrMatrix;
