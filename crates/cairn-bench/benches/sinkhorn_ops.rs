//! Criterion micro-benchmarks for log-domain Sinkhorn.

use cairn_bench::sinkhorn_profile;
use cairn_ot::{barycentric_map, log_sinkhorn, log_sum_exp, SinkhornConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// Benchmark: a full solve at several problem sizes.
fn bench_sinkhorn_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("sinkhorn_solve");
    for n in [64, 128, 256] {
        let p = sinkhorn_profile(n).unwrap();
        let config = SinkhornConfig::new(0.05);
        group.bench_with_input(BenchmarkId::from_parameter(n), &p, |b, p| {
            b.iter(|| {
                let r = log_sinkhorn(&p.mu, &p.nu, &p.cost.matrix, n, n, &config).unwrap();
                black_box(&r.coupling);
            });
        });
    }
    group.finish();
}

/// Benchmark: a warm-started repeat of a converged solve.
fn bench_sinkhorn_warm_start(c: &mut Criterion) {
    let n = 128;
    let p = sinkhorn_profile(n).unwrap();
    let cold = SinkhornConfig::new(0.05);
    let first = log_sinkhorn(&p.mu, &p.nu, &p.cost.matrix, n, n, &cold).unwrap();
    let warm = SinkhornConfig {
        warm_start: Some(first.warm_start()),
        ..cold
    };

    c.bench_function("sinkhorn_warm_start_128", |b| {
        b.iter(|| {
            let r = log_sinkhorn(&p.mu, &p.nu, &p.cost.matrix, n, n, &warm).unwrap();
            black_box(r.iterations);
        });
    });
}

/// Benchmark: barycentric projection of a 256×256 coupling.
fn bench_barycentric_map(c: &mut Criterion) {
    let n = 256;
    let p = sinkhorn_profile(n).unwrap();
    let r = log_sinkhorn(&p.mu, &p.nu, &p.cost.matrix, n, n, &SinkhornConfig::new(0.05)).unwrap();

    c.bench_function("barycentric_map_256", |b| {
        b.iter(|| {
            let m = barycentric_map(&r.coupling, n, n, &p.targets, 2).unwrap();
            black_box(&m);
        });
    });
}

/// Benchmark: stabilized log-sum-exp over 4096 entries.
fn bench_log_sum_exp(c: &mut Criterion) {
    let xs: Vec<f64> = (0..4096).map(|i| -((i % 97) as f64) * 0.37).collect();

    c.bench_function("log_sum_exp_4096", |b| {
        b.iter(|| black_box(log_sum_exp(black_box(&xs))));
    });
}

criterion_group!(
    benches,
    bench_sinkhorn_solve,
    bench_sinkhorn_warm_start,
    bench_barycentric_map,
    bench_log_sum_exp
);
criterion_main!(benches);
