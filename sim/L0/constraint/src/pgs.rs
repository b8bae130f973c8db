//! Projected Gauss-Seidel (PGS) solver for box-constrained linear systems.
//!
//! Solves `A x = b` subject to per-row bounds `lo[r] <= x[r] <= hi[r]`,
//! where `A` is sparse with a non-zero diagonal. Diagonal dominance is
//! recommended for convergence but not enforced.
//!
//! # Algorithm
//!
//! Starting from `x = 0`, each sweep visits every row in order:
//!
//! ```text
//! delta  = (b_r - Σ_{c≠r} A_rc x_c) / A_rr
//! x_r   += ω (delta - x_r)
//! x_r    = clamp(x_r, lo_r, hi_r)
//! ```
//!
//! The clamp is applied immediately after each row update, so later rows in
//! the same sweep already see projected values. Where ω is the relaxation
//! factor:
//! - ω = 1.0: Standard Gauss-Seidel
//! - ω < 1.0: Under-relaxation (more stable, slower convergence)
//! - ω > 1.0: Over-relaxation (faster convergence if stable, up to ~1.9)
//!
//! After each sweep the change `‖x_new - x_old‖₂` is compared against
//! `epsilon`. Non-convergence is not an error: after `max_iterations` sweeps
//! the last iterate is returned and the final change stays available through
//! [`ProjectedGaussSeidelSolver::energy`].
//!
//! # Example
//!
//! ```
//! use nalgebra::DVector;
//! use nalgebra_sparse::{CooMatrix, CsrMatrix};
//! use sim_constraint::ProjectedGaussSeidelSolver;
//!
//! let mut coo = CooMatrix::new(2, 2);
//! coo.push(0, 0, 4.0);
//! coo.push(0, 1, 1.0);
//! coo.push(1, 0, 1.0);
//! coo.push(1, 1, 3.0);
//!
//! let mut pgs = ProjectedGaussSeidelSolver::default();
//! pgs.set_a(CsrMatrix::from(&coo));
//! pgs.set_max_iterations(50);
//! pgs.set_epsilon(1e-12);
//!
//! let b = DVector::from_vec(vec![1.0, 2.0]);
//! let bounds = [(f64::NEG_INFINITY, f64::INFINITY); 2];
//! let x = pgs.solve(&b, &bounds).unwrap();
//! assert!((4.0 * x[0] + x[1] - 1.0).abs() < 1e-6);
//! ```

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use sim_types::{Result, SimError};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagonal magnitude below which a row is skipped (its unknown stays 0).
const MIN_DIAGONAL: f64 = 1e-15;

/// Configuration for the PGS solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PgsConfig {
    /// Maximum number of sweeps.
    pub max_iterations: usize,

    /// Convergence threshold on `‖x_new - x_old‖₂` per sweep.
    pub epsilon: f64,

    /// Relaxation factor ω.
    /// - 1.0: Standard Gauss-Seidel
    /// - < 1.0: Under-relaxation (more stable)
    /// - > 1.0: Over-relaxation (faster convergence, typically 1.2-1.8)
    pub relaxation: f64,

    /// Record the per-sweep change in [`PgsSolveResult::history`].
    pub track_convergence: bool,
}

impl Default for PgsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            epsilon: 1.0e-4,
            relaxation: 1.0, // Standard Gauss-Seidel
            track_convergence: false,
        }
    }
}

impl PgsConfig {
    /// High-accuracy configuration for offline or validation runs.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_iterations: 500,
            epsilon: 1e-10,
            relaxation: 1.0,
            track_convergence: false,
        }
    }

    /// Fast configuration for real-time applications.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            max_iterations: 10,
            epsilon: 1e-4,
            relaxation: 1.0,
            track_convergence: false,
        }
    }

    /// Set the relaxation factor.
    #[must_use]
    pub const fn with_relaxation(mut self, relaxation: f64) -> Self {
        self.relaxation = relaxation;
        self
    }

    /// Set maximum iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set the convergence threshold.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enable convergence tracking.
    #[must_use]
    pub const fn with_convergence_tracking(mut self, enabled: bool) -> Self {
        self.track_convergence = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if any configuration value is out of range.
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.relaxation <= 0.0 || self.relaxation >= 2.0 {
            return Err("relaxation must be in range (0, 2)");
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err("epsilon must be non-negative");
        }
        Ok(())
    }
}

/// Outcome of one PGS solve.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PgsSolveResult {
    /// Number of sweeps performed.
    pub iterations_used: usize,
    /// `‖x_new - x_old‖₂` of the last sweep.
    pub residual_norm: f64,
    /// Whether the change dropped below epsilon.
    pub converged: bool,
    /// Per-sweep change, when tracking is enabled.
    pub history: Option<Vec<f64>>,
}

impl PgsSolveResult {
    /// Result for an empty system.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converged: true,
            ..Self::default()
        }
    }
}

/// Projected Gauss-Seidel solver over a sparse system matrix.
#[derive(Debug, Clone, Default)]
pub struct ProjectedGaussSeidelSolver {
    config: PgsConfig,
    a: Option<CsrMatrix<f64>>,
    last: PgsSolveResult,
}

impl ProjectedGaussSeidelSolver {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: PgsConfig) -> Self {
        Self {
            config,
            a: None,
            last: PgsSolveResult::empty(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &PgsConfig {
        &self.config
    }

    /// Set the system matrix `A`.
    pub fn set_a(&mut self, a: CsrMatrix<f64>) {
        self.a = Some(a);
    }

    /// The current system matrix, if set.
    #[must_use]
    pub fn a(&self) -> Option<&CsrMatrix<f64>> {
        self.a.as_ref()
    }

    /// Set the maximum number of sweeps.
    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.config.max_iterations = max_iterations;
    }

    /// Set the relaxation factor (clamped into (0, 2)).
    pub fn set_relaxation(&mut self, relaxation: f64) {
        self.config.relaxation = relaxation.clamp(0.01, 1.99);
    }

    /// Set the convergence threshold.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.config.epsilon = epsilon.max(0.0);
    }

    /// `‖x_new - x_old‖₂` of the last sweep of the last solve.
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.last.residual_norm
    }

    /// Details of the last solve.
    #[must_use]
    pub fn last_result(&self) -> &PgsSolveResult {
        &self.last
    }

    /// Solve `A x = b` with `bounds[r] = (lo, hi)` enforced on every row.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if no matrix has been set, and
    /// [`SimError::DimensionMismatch`] if `A` is not square or `b`/`bounds`
    /// do not match its size. Non-convergence is not an error.
    pub fn solve(&mut self, b: &DVector<f64>, bounds: &[(f64, f64)]) -> Result<DVector<f64>> {
        let Some(a) = self.a.as_ref() else {
            warn!("PGS solve called without a system matrix");
            return Err(SimError::invalid_config("PGS system matrix not set"));
        };
        let n = a.nrows();
        if a.ncols() != n {
            return Err(SimError::dimension_mismatch(n, a.ncols()));
        }
        if b.len() != n {
            return Err(SimError::dimension_mismatch(n, b.len()));
        }
        if bounds.len() != n {
            return Err(SimError::dimension_mismatch(n, bounds.len()));
        }

        let mut x = DVector::zeros(n);
        if n == 0 {
            self.last = PgsSolveResult::empty();
            return Ok(x);
        }

        let diagonal = extract_diagonal(a);
        let omega = self.config.relaxation;
        let mut history = self.config.track_convergence.then(Vec::new);
        let mut result = PgsSolveResult::default();

        for iter in 0..self.config.max_iterations {
            let change_sq = sweep(a, &diagonal, b, bounds, omega, &mut x);
            let change = change_sq.sqrt();

            result.iterations_used = iter + 1;
            result.residual_norm = change;
            if let Some(h) = history.as_mut() {
                h.push(change);
            }

            if change < self.config.epsilon {
                result.converged = true;
                break;
            }
        }

        if !result.converged {
            debug!(
                iterations = result.iterations_used,
                residual = result.residual_norm,
                "PGS reached iteration cap"
            );
        }

        result.history = history;
        self.last = result;
        Ok(x)
    }
}

/// One Gauss-Seidel sweep with per-row projection.
///
/// Returns the squared L2 norm of the change in `x`.
fn sweep(
    a: &CsrMatrix<f64>,
    diagonal: &[f64],
    b: &DVector<f64>,
    bounds: &[(f64, f64)],
    omega: f64,
    x: &mut DVector<f64>,
) -> f64 {
    let mut change_sq = 0.0;

    for (r, row) in a.row_iter().enumerate() {
        let diag = diagonal[r];
        if diag.abs() < MIN_DIAGONAL {
            continue;
        }

        let mut off_diag = 0.0;
        for (&c, &val) in row.col_indices().iter().zip(row.values()) {
            if c != r {
                off_diag += val * x[c];
            }
        }

        let old = x[r];
        let delta = (b[r] - off_diag) / diag;
        let (lo, hi) = bounds[r];
        let updated = (old + omega * (delta - old)).max(lo).min(hi);
        x[r] = updated;
        change_sq += (updated - old) * (updated - old);
    }

    change_sq
}

fn extract_diagonal(a: &CsrMatrix<f64>) -> Vec<f64> {
    a.row_iter()
        .enumerate()
        .map(|(r, row)| {
            row.col_indices()
                .iter()
                .zip(row.values())
                .filter(|(&c, _)| c == r)
                .map(|(_, &v)| v)
                .sum()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use nalgebra_sparse::CooMatrix;

    fn csr_from_dense(dense: &DMatrix<f64>) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(dense.nrows(), dense.ncols());
        for r in 0..dense.nrows() {
            for c in 0..dense.ncols() {
                if dense[(r, c)] != 0.0 {
                    coo.push(r, c, dense[(r, c)]);
                }
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Symmetric, diagonally dominant 5x5 system.
    fn fixture() -> (DMatrix<f64>, DVector<f64>) {
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(5, 5, &[
            10.0, -1.0,  2.0,  0.0,  0.0,
            -1.0, 11.0, -1.0,  3.0,  0.0,
             2.0, -1.0, 10.0, -1.0,  1.0,
             0.0,  3.0, -1.0,  8.0, -2.0,
             0.0,  0.0,  1.0, -2.0,  9.0,
        ]);
        let b = DVector::from_vec(vec![6.0, 25.0, -11.0, 15.0, 4.0]);
        (a, b)
    }

    fn open_bounds(n: usize) -> Vec<(f64, f64)> {
        vec![(f64::NEG_INFINITY, f64::INFINITY); n]
    }

    #[test]
    fn test_config_presets_validate() {
        assert!(PgsConfig::default().validate().is_ok());
        assert!(PgsConfig::realtime().validate().is_ok());
        assert!(PgsConfig::high_accuracy().validate().is_ok());
        assert!(PgsConfig::default().with_relaxation(2.0).validate().is_err());
        assert!(PgsConfig::default().with_relaxation(0.0).validate().is_err());
        assert!(PgsConfig::default().with_epsilon(-1.0).validate().is_err());
    }

    #[test]
    fn test_fixture_loose_tolerance() {
        let (a, b) = fixture();
        let mut pgs = ProjectedGaussSeidelSolver::default();
        pgs.set_a(csr_from_dense(&a));
        let x = pgs.solve(&b, &open_bounds(5)).unwrap();
        let residual = &a * &x - &b;
        assert!(residual.amax() < 10.0);
    }

    #[test]
    fn test_fixture_sharpened() {
        let (a, b) = fixture();
        let mut pgs = ProjectedGaussSeidelSolver::new(PgsConfig::high_accuracy());
        pgs.set_a(csr_from_dense(&a));
        let x = pgs.solve(&b, &open_bounds(5)).unwrap();
        let residual = &a * &x - &b;
        assert!(residual.amax() < 1e-3, "residual {residual}");
        assert!(pgs.last_result().converged);
        assert!(pgs.energy() < 1e-10);

        // Agrees with a direct solve
        let exact = a.lu().solve(&b).unwrap();
        assert_relative_eq!(x, exact, epsilon = 1e-6);
    }

    #[test]
    fn test_bounds_respected_every_row() {
        let (a, b) = fixture();
        let mut pgs = ProjectedGaussSeidelSolver::new(PgsConfig::high_accuracy());
        pgs.set_a(csr_from_dense(&a));
        let bounds = vec![(0.0, 0.5); 5];
        let x = pgs.solve(&b, &bounds).unwrap();
        for r in 0..5 {
            assert!(x[r] >= 0.0 && x[r] <= 0.5, "x[{r}] = {}", x[r]);
        }
        // Row 2 wants a negative value and sits on its lower bound
        assert_eq!(x[2], 0.0);
    }

    #[test]
    fn test_iteration_cap_returns_best_iterate() {
        let (a, b) = fixture();
        let mut pgs = ProjectedGaussSeidelSolver::new(
            PgsConfig::default()
                .with_max_iterations(2)
                .with_epsilon(0.0)
                .with_convergence_tracking(true),
        );
        pgs.set_a(csr_from_dense(&a));
        let x = pgs.solve(&b, &open_bounds(5)).unwrap();
        assert!(x.iter().all(|v| v.is_finite()));

        let result = pgs.last_result();
        assert_eq!(result.iterations_used, 2);
        assert!(!result.converged);
        let history = result.history.as_ref().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[1] < history[0]);
        assert_eq!(pgs.energy(), history[1]);
    }

    #[test]
    fn test_over_relaxation_still_converges() {
        let (a, b) = fixture();
        let mut pgs = ProjectedGaussSeidelSolver::new(PgsConfig::high_accuracy());
        pgs.set_relaxation(1.3);
        pgs.set_a(csr_from_dense(&a));
        let x = pgs.solve(&b, &open_bounds(5)).unwrap();
        assert!((&a * &x - &b).amax() < 1e-6);
    }

    #[test]
    fn test_zero_diagonal_row_is_skipped() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 2.0);
        let mut pgs = ProjectedGaussSeidelSolver::default();
        pgs.set_a(CsrMatrix::from(&coo));
        let x = pgs
            .solve(&DVector::from_vec(vec![4.0, 1.0]), &open_bounds(2))
            .unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        assert_eq!(x[1], 0.0);
    }

    #[test]
    fn test_missing_matrix_and_mismatch() {
        let mut pgs = ProjectedGaussSeidelSolver::default();
        let err = pgs.solve(&DVector::zeros(2), &open_bounds(2)).unwrap_err();
        assert!(err.is_config_error());

        let (a, _) = fixture();
        pgs.set_a(csr_from_dense(&a));
        assert!(pgs.solve(&DVector::zeros(4), &open_bounds(5)).is_err());
        assert!(pgs.solve(&DVector::zeros(5), &open_bounds(4)).is_err());
    }

    #[test]
    fn test_empty_system() {
        let mut pgs = ProjectedGaussSeidelSolver::default();
        pgs.set_a(CsrMatrix::zeros(0, 0));
        let x = pgs.solve(&DVector::zeros(0), &[]).unwrap();
        assert_eq!(x.len(), 0);
        assert!(pgs.last_result().converged);
    }
}
