//! Benchmarks for narrow-phase contact tests.
//!
//! Run with: cargo bench -p sim-contact

#![allow(missing_docs, clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::Point3;

use sim_contact::{closest_point_on_triangle, test_sphere_to_triangle, triangle_to_triangle};

/// Deterministic query points scattered around the unit triangle.
fn query_points(n: usize) -> Vec<Point3<f64>> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            Point3::new((f * 0.37).sin() * 2.0, (f * 0.73).cos() * 2.0, (f * 0.11).sin())
        })
        .collect()
}

fn bench_closest_point(c: &mut Criterion) {
    let a = Point3::new(0.0, 0.0, 0.0);
    let b = Point3::new(1.0, 0.0, 0.0);
    let tri_c = Point3::new(0.0, 1.0, 0.0);

    let mut group = c.benchmark_group("closest_point_on_triangle");
    for n in [100usize, 10_000] {
        let points = query_points(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &points, |bench, points| {
            bench.iter(|| {
                for p in points {
                    black_box(closest_point_on_triangle(p, &a, &b, &tri_c));
                }
            });
        });
    }
    group.finish();
}

fn bench_sphere_triangle(c: &mut Criterion) {
    let a = Point3::new(0.0, 0.0, 0.0);
    let b = Point3::new(1.0, 0.0, 0.0);
    let tri_c = Point3::new(0.0, 1.0, 0.0);
    let points = query_points(10_000);

    c.bench_function("sphere_triangle_10k", |bench| {
        bench.iter(|| {
            for p in &points {
                black_box(test_sphere_to_triangle(p, 0.5, &a, &b, &tri_c));
            }
        });
    });
}

fn bench_triangle_triangle(c: &mut Criterion) {
    let ground = [
        Point3::new(-2.0, -2.0, 0.0),
        Point3::new(2.0, -2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
    ];
    let points = query_points(1_000);

    c.bench_function("triangle_triangle_1k", |bench| {
        bench.iter(|| {
            for p in &points {
                let spike = [
                    Point3::new(p.x, p.y, -0.5),
                    Point3::new(p.x + 0.3, p.y, 0.5),
                    Point3::new(p.x - 0.3, p.y + 0.1, 0.5),
                ];
                black_box(triangle_to_triangle([0, 1, 2], [3, 4, 5], &spike, &ground));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_closest_point,
    bench_sphere_triangle,
    bench_triangle_triangle
);
criterion_main!(benches);
