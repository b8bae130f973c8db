//! Benchmarks for the projected Gauss-Seidel solver.
//!
//! Run with: cargo bench -p sim-constraint

#![allow(missing_docs, clippy::cast_precision_loss, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use sim_constraint::{PgsConfig, ProjectedGaussSeidelSolver};

/// Diagonally dominant banded matrix, similar to a chain of contacts.
fn banded_system(n: usize) -> (CsrMatrix<f64>, DVector<f64>) {
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
        coo.push(i, i, 4.0);
        if i > 0 {
            coo.push(i, i - 1, -1.0);
        }
        if i + 1 < n {
            coo.push(i, i + 1, -1.0);
        }
    }
    let b = DVector::from_fn(n, |i, _| ((i as f64) * 0.3).sin());
    (CsrMatrix::from(&coo), b)
}

fn bench_pgs(c: &mut Criterion) {
    let mut group = c.benchmark_group("pgs_solve");
    for n in [64usize, 1024] {
        let (a, b) = banded_system(n);
        let bounds = vec![(0.0, f64::INFINITY); n];
        let mut solver = ProjectedGaussSeidelSolver::new(PgsConfig::realtime());
        solver.set_a(a);
        group.bench_with_input(BenchmarkId::from_parameter(n), &b, |bench, b| {
            bench.iter(|| black_box(solver.solve(b, &bounds).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pgs);
criterion_main!(benches);
