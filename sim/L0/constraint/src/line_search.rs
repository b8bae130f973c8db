//! Armijo backtracking line search for nonlinear residual systems.
//!
//! Given an iterate `x_prev` with residual norm `‖F(x_prev)‖` and a descent
//! direction `dx`, candidate iterates `x = x_prev - λ dx` are tried until the
//! Armijo-Goldstein sufficient decrease condition holds:
//!
//! ```text
//! ‖F(x_prev - λ dx)‖ < (1 - α λ) ‖F(x_prev)‖
//! ```
//!
//! The first candidate uses `λ = σ₀ σ₁`. Each refinement fits a parabola
//! through the squared residual norms at `0`, the current `λ` and the
//! previous `λ`. When the model has negative curvature the step is shrunk
//! by `σ₀`; otherwise the parabola's minimizer is clamped into
//! `[σ₀ λ, σ₁ λ]`.
//!
//! Running out of refinements is not an error: the last candidate is
//! returned with `accepted = false` and a warning is logged.

use nalgebra::{DMatrix, DVector};
use tracing::{trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A nonlinear system `F(x) = 0`.
pub trait NonLinearSystem {
    /// Evaluate the residual `F(x)`.
    ///
    /// `semi_implicit` selects the semi-implicit form of the residual for
    /// systems that distinguish it; others may ignore it.
    fn evaluate_f(&self, x: &DVector<f64>, semi_implicit: bool) -> DVector<f64>;

    /// Evaluate the Jacobian `∂F/∂x`.
    fn evaluate_jacobian(&self, x: &DVector<f64>, semi_implicit: bool) -> DMatrix<f64>;
}

/// Outcome of a line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchResult {
    /// The last candidate iterate.
    pub x: DVector<f64>,
    /// `‖F(x)‖` at the last candidate.
    pub norm: f64,
    /// Step length of the last candidate.
    pub step: f64,
    /// Whether the sufficient decrease condition was met.
    pub accepted: bool,
}

/// Armijo line search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArmijoLineSearch {
    /// Safeguard factors `[σ₀, σ₁]` bounding each step reduction.
    pub sigma: [f64; 2],
    /// Sufficient decrease parameter α.
    pub alpha: f64,
    /// Maximum number of step refinements.
    pub armijo_max: usize,
    /// Forwarded to [`NonLinearSystem::evaluate_f`].
    pub semi_implicit: bool,
}

impl Default for ArmijoLineSearch {
    fn default() -> Self {
        Self {
            sigma: [0.1, 0.5],
            alpha: 1.0e-4,
            armijo_max: 30,
            semi_implicit: true,
        }
    }
}

impl ArmijoLineSearch {
    /// Set the safeguard factors.
    #[must_use]
    pub const fn with_sigma(mut self, sigma: [f64; 2]) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the sufficient decrease parameter.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the maximum number of refinements.
    #[must_use]
    pub const fn with_armijo_max(mut self, armijo_max: usize) -> Self {
        self.armijo_max = armijo_max;
        self
    }

    /// Select the semi-implicit residual form.
    #[must_use]
    pub const fn with_semi_implicit(mut self, semi_implicit: bool) -> Self {
        self.semi_implicit = semi_implicit;
        self
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error string if any parameter is out of range.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        let [s0, s1] = self.sigma;
        if !(s0 > 0.0 && s0 <= s1 && s1 < 1.0) {
            return Err("sigma must satisfy 0 < sigma0 <= sigma1 < 1");
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err("alpha must be in range (0, 1)");
        }
        Ok(())
    }

    /// Search along `-dx` from `x_prev`, whose residual norm is `prev_norm`.
    pub fn search<S: NonLinearSystem + ?Sized>(
        &self,
        system: &S,
        x_prev: &DVector<f64>,
        dx: &DVector<f64>,
        prev_norm: f64,
    ) -> LineSearchResult {
        let [s0, s1] = self.sigma;
        let ff0 = prev_norm * prev_norm;

        let mut lambda_c = s0 * s1;
        let mut lambda_m = 1.0;
        let (mut x, mut norm) = self.evaluate(system, x_prev, dx, lambda_c);
        if self.sufficient(norm, lambda_c, prev_norm) {
            return LineSearchResult {
                x,
                norm,
                step: lambda_c,
                accepted: true,
            };
        }

        let mut ff_c = norm * norm;
        let mut ff_m = ff_c;

        for refinement in 0..self.armijo_max {
            let next = self.parabolic_step(lambda_c, lambda_m, ff0, ff_c, ff_m);
            lambda_m = lambda_c;
            lambda_c = next;

            (x, norm) = self.evaluate(system, x_prev, dx, lambda_c);
            trace!(refinement, step = lambda_c, norm, "armijo refinement");
            if self.sufficient(norm, lambda_c, prev_norm) {
                return LineSearchResult {
                    x,
                    norm,
                    step: lambda_c,
                    accepted: true,
                };
            }

            ff_m = ff_c;
            ff_c = norm * norm;
        }

        warn!(
            armijo_max = self.armijo_max,
            norm, "Armijo line search reached maximum number of step reductions"
        );
        LineSearchResult {
            x,
            norm,
            step: lambda_c,
            accepted: false,
        }
    }

    fn evaluate<S: NonLinearSystem + ?Sized>(
        &self,
        system: &S,
        x_prev: &DVector<f64>,
        dx: &DVector<f64>,
        lambda: f64,
    ) -> (DVector<f64>, f64) {
        let x = x_prev - dx * lambda;
        let norm = system.evaluate_f(&x, self.semi_implicit).norm();
        (x, norm)
    }

    fn sufficient(&self, norm: f64, lambda: f64, prev_norm: f64) -> bool {
        norm < (1.0 - self.alpha * lambda) * prev_norm
    }

    /// Safeguarded minimizer of the parabola through `(0, ff0)`,
    /// `(lambda_c, ff_c)` and `(lambda_m, ff_m)`.
    fn parabolic_step(&self, lambda_c: f64, lambda_m: f64, ff0: f64, ff_c: f64, ff_m: f64) -> f64 {
        let [s0, s1] = self.sigma;

        // With d = (λc - λm) λc λm < 0, c2 >= 0 means negative curvature
        let c2 = lambda_m * (ff_c - ff0) - lambda_c * (ff_m - ff0);
        if c2 >= 0.0 {
            return s0 * lambda_c;
        }

        let c1 = lambda_c * lambda_c * (ff_m - ff0) - lambda_m * lambda_m * (ff_c - ff0);
        let lambda_p = -c1 * 0.5 / c2;
        lambda_p.clamp(s0 * lambda_c, s1 * lambda_c)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// F(x) = x, component-wise.
    struct Identity;

    impl NonLinearSystem for Identity {
        fn evaluate_f(&self, x: &DVector<f64>, _semi_implicit: bool) -> DVector<f64> {
            x.clone()
        }

        fn evaluate_jacobian(&self, x: &DVector<f64>, _semi_implicit: bool) -> DMatrix<f64> {
            DMatrix::identity(x.len(), x.len())
        }
    }

    /// F(x) = x³ in one dimension, recording the flag it was called with.
    struct Cubic {
        saw_semi_implicit: Cell<Option<bool>>,
    }

    impl NonLinearSystem for Cubic {
        fn evaluate_f(&self, x: &DVector<f64>, semi_implicit: bool) -> DVector<f64> {
            self.saw_semi_implicit.set(Some(semi_implicit));
            x.map(|v| v * v * v)
        }

        fn evaluate_jacobian(&self, x: &DVector<f64>, _semi_implicit: bool) -> DMatrix<f64> {
            DMatrix::from_diagonal(&x.map(|v| 3.0 * v * v))
        }
    }

    #[test]
    fn test_defaults() {
        let ls = ArmijoLineSearch::default();
        assert_eq!(ls.sigma, [0.1, 0.5]);
        assert_eq!(ls.alpha, 1e-4);
        assert_eq!(ls.armijo_max, 30);
        assert!(ls.validate().is_ok());
        assert!(ls.with_sigma([0.6, 0.5]).validate().is_err());
        assert!(ls.with_alpha(1.0).validate().is_err());
    }

    #[test]
    fn test_first_step_accepted() {
        let x_prev = DVector::from_vec(vec![1.0, 1.0]);
        let prev_norm = x_prev.norm();
        let result = ArmijoLineSearch::default().search(&Identity, &x_prev, &x_prev, prev_norm);

        assert!(result.accepted);
        assert_relative_eq!(result.step, 0.05, epsilon = 1e-15);
        assert_relative_eq!(result.norm, 0.95 * prev_norm, epsilon = 1e-12);
        assert_relative_eq!(result.x, x_prev * 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_overshoot_is_refined() {
        let system = Cubic {
            saw_semi_implicit: Cell::new(None),
        };
        let x_prev = DVector::from_vec(vec![1.0]);
        let dx = DVector::from_vec(vec![50.0]);
        let ls = ArmijoLineSearch::default().with_semi_implicit(false);
        let result = ls.search(&system, &x_prev, &dx, 1.0);

        // λ = 0.05 lands at -1.5 (|F| = 3.375); negative curvature shrinks by σ₀
        assert!(result.accepted);
        assert_relative_eq!(result.step, 0.005, epsilon = 1e-15);
        assert_relative_eq!(result.x[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(result.norm, 0.421_875, epsilon = 1e-12);
        assert_eq!(system.saw_semi_implicit.get(), Some(false));
    }

    #[test]
    fn test_cap_out_returns_last_norm() {
        // Ascent direction: every step increases the residual
        let x_prev = DVector::from_vec(vec![1.0, -2.0]);
        let dx = -x_prev.clone();
        let ls = ArmijoLineSearch::default().with_armijo_max(4);
        let result = ls.search(&Identity, &x_prev, &dx, x_prev.norm());

        assert!(!result.accepted);
        assert!(result.norm >= x_prev.norm());
        assert_relative_eq!(result.norm, (x_prev.clone() * (1.0 + result.step)).norm(), epsilon = 1e-12);
        assert!(result.step < 0.05);
    }

    #[test]
    fn test_parabolic_step_is_clamped() {
        let ls = ArmijoLineSearch::default();
        // Positive curvature with a minimizer far below the safeguard
        let step = ls.parabolic_step(0.5, 1.0, 1.0, 100.0, 400.0);
        assert!(step >= 0.05 - 1e-15 && step <= 0.25 + 1e-15);
    }
}
