//! Sparse matrix operations for constraint assembly.
//!
//! Contact Jacobians are very sparse: each constraint row touches at most two
//! bodies out of potentially thousands.
//!
//! # Sparsity Pattern
//!
//! For a system with N bodies and M constraint rows, the Jacobian has
//! dimensions:
//! - Rows: M
//! - Columns: 6 * N (3 linear + 3 angular per body)
//!
//! Each row only has non-zeros in the 12 columns of its two bodies. The
//! inverse mass matrix is block diagonal with one 6x6 [`InvMassBlock`] per
//! body, so the effective mass `A = J M⁻¹ Jᵀ` is assembled with two sparse
//! products and never densified.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use sim_types::tolerance::SPARSE_EPSILON;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sparse constraint Jacobian in CSR format.
///
/// CSR (Compressed Sparse Row) is optimal for:
/// - Row-wise iteration (iterating over constraints)
/// - Matrix-vector products J * v
#[derive(Debug, Clone)]
pub struct SparseJacobian {
    matrix: CsrMatrix<f64>,
}

impl SparseJacobian {
    /// Build a sparse Jacobian from `(row, col, value)` triplets.
    ///
    /// Near-zero values are skipped; duplicates are summed.
    #[must_use]
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Self {
        let mut coo = CooMatrix::new(num_rows, num_cols);
        for &(row, col, val) in triplets {
            if val.abs() > SPARSE_EPSILON {
                coo.push(row, col, val);
            }
        }
        Self {
            matrix: CsrMatrix::from(&coo),
        }
    }

    /// Number of constraint rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of columns (6 per body).
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Number of stored non-zeros.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// The underlying CSR matrix.
    #[must_use]
    pub fn csr(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    /// Compute `J * v`.
    #[must_use]
    pub fn mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut result = DVector::zeros(self.nrows());
        for (i, row) in self.matrix.row_iter().enumerate() {
            let mut sum = 0.0;
            for (&j, &val) in row.col_indices().iter().zip(row.values()) {
                sum += val * v[j];
            }
            result[i] = sum;
        }
        result
    }

    /// Compute `Jᵀ * v`.
    #[must_use]
    pub fn mul_transpose_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut result = DVector::zeros(self.ncols());
        for (i, row) in self.matrix.row_iter().enumerate() {
            let vi = v[i];
            for (&j, &val) in row.col_indices().iter().zip(row.values()) {
                result[j] += val * vi;
            }
        }
        result
    }

    /// Convert to a dense matrix (for debugging and tests).
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for (i, row) in self.matrix.row_iter().enumerate() {
            for (&j, &val) in row.col_indices().iter().zip(row.values()) {
                dense[(i, j)] = val;
            }
        }
        dense
    }
}

/// Inverse mass block for a single body (6x6).
///
/// ```text
/// [1/m * I_3   0      ]
/// [   0     I^-1_world]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InvMassBlock {
    /// Inverse mass (scalar, same for all 3 linear components).
    pub inv_mass: f64,
    /// Inverse inertia tensor in world frame.
    pub inv_inertia: Matrix3<f64>,
}

impl InvMassBlock {
    /// Create a new inverse mass block.
    #[must_use]
    pub const fn new(inv_mass: f64, inv_inertia: Matrix3<f64>) -> Self {
        Self {
            inv_mass,
            inv_inertia,
        }
    }

    /// Block for a static body (zero inverse mass and inertia).
    #[must_use]
    pub fn static_body() -> Self {
        Self {
            inv_mass: 0.0,
            inv_inertia: Matrix3::zeros(),
        }
    }

    /// Get element (row, col) of the 6x6 matrix.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match (row, col) {
            (r, c) if r < 3 && c < 3 => {
                if r == c {
                    self.inv_mass
                } else {
                    0.0
                }
            }
            (r, c) if r >= 3 && c >= 3 => self.inv_inertia[(r - 3, c - 3)],
            _ => 0.0,
        }
    }

    /// Apply the block to a linear/angular pair.
    #[must_use]
    pub fn apply(&self, linear: &Vector3<f64>, angular: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        (linear * self.inv_mass, self.inv_inertia * angular)
    }
}

/// Block-diagonal inverse mass matrix `M⁻¹` of a body set.
#[derive(Debug, Clone, Default)]
pub struct BlockInvMass {
    blocks: Vec<InvMassBlock>,
    matrix: CsrMatrix<f64>,
}

impl BlockInvMass {
    /// Assemble from one block per body, in slot order.
    #[must_use]
    pub fn new(blocks: Vec<InvMassBlock>) -> Self {
        let n = blocks.len() * 6;
        let mut coo = CooMatrix::new(n, n);
        for (body, block) in blocks.iter().enumerate() {
            let base = body * 6;
            for r in 0..6 {
                for c in 0..6 {
                    let val = block.get(r, c);
                    if val.abs() > SPARSE_EPSILON {
                        coo.push(base + r, base + c, val);
                    }
                }
            }
        }
        Self {
            blocks,
            matrix: CsrMatrix::from(&coo),
        }
    }

    /// Number of bodies.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.blocks.len()
    }

    /// Per-body blocks.
    #[must_use]
    pub fn blocks(&self) -> &[InvMassBlock] {
        &self.blocks
    }

    /// The assembled `6N x 6N` CSR matrix.
    #[must_use]
    pub fn csr(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    /// Compute `M⁻¹ * v` blockwise.
    #[must_use]
    pub fn mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        let mut result = DVector::zeros(v.len());
        for (body, block) in self.blocks.iter().enumerate() {
            let base = body * 6;
            let lin = v.fixed_rows::<3>(base).into_owned();
            let ang = v.fixed_rows::<3>(base + 3).into_owned();
            let (out_lin, out_ang) = block.apply(&lin, &ang);
            result.fixed_rows_mut::<3>(base).copy_from(&out_lin);
            result.fixed_rows_mut::<3>(base + 3).copy_from(&out_ang);
        }
        result
    }

    /// Effective mass `A = J M⁻¹ Jᵀ`.
    #[must_use]
    pub fn effective_mass(&self, jacobian: &SparseJacobian) -> CsrMatrix<f64> {
        let j = jacobian.csr();
        let j_minv = j * &self.matrix;
        &j_minv * &j.transpose()
    }
}

/// Builder for sparse Jacobians using triplet accumulation.
///
/// Entries may be added in any order; duplicates are summed on build.
#[derive(Debug, Clone)]
pub struct JacobianBuilder {
    triplets: Vec<(usize, usize, f64)>,
    num_rows: usize,
    num_cols: usize,
}

impl JacobianBuilder {
    /// Create a new Jacobian builder.
    #[must_use]
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        // ~12 non-zeros per contact row
        Self {
            triplets: Vec::with_capacity(num_rows * 12),
            num_rows,
            num_cols,
        }
    }

    /// Add a single entry.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.num_rows);
        debug_assert!(col < self.num_cols);
        if value.abs() > SPARSE_EPSILON {
            self.triplets.push((row, col, value));
        }
    }

    /// Add a 3-vector as a row segment starting at `col`.
    pub fn add_vec3_row(&mut self, row: usize, col: usize, vec: &Vector3<f64>) {
        for i in 0..3 {
            self.add(row, col + i, vec[i]);
        }
    }

    /// Build the sparse Jacobian.
    #[must_use]
    pub fn build(self) -> SparseJacobian {
        SparseJacobian::from_triplets(self.num_rows, self.num_cols, &self.triplets)
    }
}
