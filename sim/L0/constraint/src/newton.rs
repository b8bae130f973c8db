//! Damped Newton iteration for nonlinear systems.
//!
//! Each iteration solves `J(x) dx = F(x)` with a dense LU factorization and
//! takes the full step `x - dx` when it satisfies the sufficient decrease
//! condition. Otherwise the step length is chosen by an
//! [`ArmijoLineSearch`].
//!
//! The iteration stops once `‖F(x)‖ < atol + rtol ‖F(x₀)‖`.

use nalgebra::DVector;
use sim_types::{Result, SimError};
use tracing::debug;

use crate::line_search::{ArmijoLineSearch, NonLinearSystem};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the Newton solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewtonConfig {
    /// Maximum number of Newton iterations.
    pub max_iterations: usize,
    /// Relative tolerance on the residual norm.
    pub relative_tolerance: f64,
    /// Absolute tolerance on the residual norm.
    pub absolute_tolerance: f64,
    /// Fall back to the line search when the full step is rejected.
    pub use_armijo: bool,
    /// Line search parameters.
    pub line_search: ArmijoLineSearch,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            relative_tolerance: 1.0e-6,
            absolute_tolerance: 1.0e-3,
            use_armijo: true,
            line_search: ArmijoLineSearch::default(),
        }
    }
}

impl NewtonConfig {
    /// Tight tolerances for validation runs.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_iterations: 100,
            relative_tolerance: 1e-12,
            absolute_tolerance: 1e-12,
            ..Self::default()
        }
    }

    /// Set maximum iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set both tolerances.
    #[must_use]
    pub const fn with_tolerances(mut self, relative: f64, absolute: f64) -> Self {
        self.relative_tolerance = relative;
        self.absolute_tolerance = absolute;
        self
    }

    /// Enable or disable the line search.
    #[must_use]
    pub const fn with_armijo(mut self, enabled: bool) -> Self {
        self.use_armijo = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if any configuration value is out of range.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.relative_tolerance < 0.0 || self.absolute_tolerance < 0.0 {
            return Err("tolerances must be non-negative");
        }
        self.line_search.validate()
    }
}

/// Outcome of a Newton solve.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonResult {
    /// Final iterate.
    pub x: DVector<f64>,
    /// Number of Newton iterations performed.
    pub iterations: usize,
    /// `‖F(x)‖` at the final iterate.
    pub residual_norm: f64,
    /// Whether the stopping tolerance was reached.
    pub converged: bool,
}

/// Newton solver driving a [`NonLinearSystem`] to a root.
#[derive(Debug, Clone, Default)]
pub struct NewtonSolver {
    config: NewtonConfig,
}

impl NewtonSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: NewtonConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    /// Solve `F(x) = 0` starting from `x0`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SingularMatrix`] if the Jacobian cannot be
    /// factorized, and [`SimError::DimensionMismatch`] if the system's
    /// Jacobian does not match the size of `x0`.
    pub fn solve<S: NonLinearSystem + ?Sized>(
        &self,
        system: &S,
        x0: DVector<f64>,
    ) -> Result<NewtonResult> {
        let semi_implicit = self.config.line_search.semi_implicit;
        let mut x = x0;
        let mut f = system.evaluate_f(&x, semi_implicit);
        let mut norm = f.norm();
        let stop = self.config.absolute_tolerance + self.config.relative_tolerance * norm;

        for iteration in 0..self.config.max_iterations {
            if norm < stop {
                return Ok(NewtonResult {
                    x,
                    iterations: iteration,
                    residual_norm: norm,
                    converged: true,
                });
            }

            let jacobian = system.evaluate_jacobian(&x, semi_implicit);
            if jacobian.nrows() != x.len() || jacobian.ncols() != x.len() {
                return Err(SimError::dimension_mismatch(x.len(), jacobian.nrows()));
            }
            let dx = jacobian
                .lu()
                .solve(&f)
                .ok_or_else(|| SimError::singular_matrix("Newton Jacobian is not invertible"))?;

            let full = &x - &dx;
            let full_f = system.evaluate_f(&full, semi_implicit);
            let full_norm = full_f.norm();
            let alpha = self.config.line_search.alpha;

            if !self.config.use_armijo || full_norm < (1.0 - alpha) * norm {
                x = full;
                f = full_f;
                norm = full_norm;
            } else {
                let searched = self.config.line_search.search(system, &x, &dx, norm);
                debug!(
                    iteration,
                    step = searched.step,
                    accepted = searched.accepted,
                    "Newton step damped"
                );
                x = searched.x;
                f = system.evaluate_f(&x, semi_implicit);
                norm = searched.norm;
            }
        }

        let converged = norm < stop;
        Ok(NewtonResult {
            x,
            iterations: self.config.max_iterations,
            residual_norm: norm,
            converged,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    /// F(x) = (x0² - 2, x1 - 3).
    struct Quadratic;

    impl NonLinearSystem for Quadratic {
        fn evaluate_f(&self, x: &DVector<f64>, _semi_implicit: bool) -> DVector<f64> {
            DVector::from_vec(vec![x[0] * x[0] - 2.0, x[1] - 3.0])
        }

        fn evaluate_jacobian(&self, x: &DVector<f64>, _semi_implicit: bool) -> DMatrix<f64> {
            DMatrix::from_row_slice(2, 2, &[2.0 * x[0], 0.0, 0.0, 1.0])
        }
    }

    /// F(x) = atan(x); full Newton steps diverge from |x0| > 1.39.
    struct Arctan;

    impl NonLinearSystem for Arctan {
        fn evaluate_f(&self, x: &DVector<f64>, _semi_implicit: bool) -> DVector<f64> {
            x.map(f64::atan)
        }

        fn evaluate_jacobian(&self, x: &DVector<f64>, _semi_implicit: bool) -> DMatrix<f64> {
            DMatrix::from_diagonal(&x.map(|v| 1.0 / (1.0 + v * v)))
        }
    }

    #[test]
    fn test_quadratic_root() {
        let solver = NewtonSolver::new(NewtonConfig::high_accuracy());
        let result = solver
            .solve(&Quadratic, DVector::from_vec(vec![1.0, 0.0]))
            .unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.x[0], 2.0_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(result.x[1], 3.0, epsilon = 1e-10);
        assert!(result.iterations < 10);
    }

    #[test]
    fn test_line_search_globalizes_arctan() {
        let solver = NewtonSolver::new(NewtonConfig::high_accuracy());
        let result = solver.solve(&Arctan, DVector::from_vec(vec![3.0])).unwrap();
        assert!(result.converged);
        assert!(result.x[0].abs() < 1e-10);
    }

    #[test]
    fn test_already_converged() {
        let result = NewtonSolver::default()
            .solve(&Quadratic, DVector::from_vec(vec![2.0_f64.sqrt(), 3.0]))
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_singular_jacobian() {
        let err = NewtonSolver::default()
            .solve(&Quadratic, DVector::from_vec(vec![0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, SimError::SingularMatrix { .. }));
    }
}
