//! Criterion micro-benchmarks for the HJB solvers.

use cairn_bench::hjb_profile;
use cairn_hjb::{
    extract_policy, solve_stationary, solve_time_dependent, StationaryConfig, TimeDependentConfig,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Benchmark: 50 damped Bellman sweeps on a 33×33 grid.
fn bench_stationary_sweeps(c: &mut Criterion) {
    let problem = hjb_profile(33).unwrap();
    let config = StationaryConfig {
        max_iterations: 50,
        tolerance: 1e-12,
        ..StationaryConfig::default()
    };

    c.bench_function("hjb_stationary_33x33_50_sweeps", |b| {
        b.iter(|| {
            let r = solve_stationary(&problem, &config).unwrap();
            black_box(&r.value);
        });
    });
}

/// Benchmark: finite-horizon march over 0.5 time units.
fn bench_time_dependent(c: &mut Criterion) {
    let problem = hjb_profile(33).unwrap();
    let config = TimeDependentConfig {
        horizon: 0.5,
        time_step: Some(0.05),
    };

    c.bench_function("hjb_time_dependent_33x33", |b| {
        b.iter(|| {
            let r = solve_time_dependent(&problem, &config).unwrap();
            black_box(&r.value);
        });
    });
}

/// Benchmark: policy extraction from a converged value field.
fn bench_policy_extraction(c: &mut Criterion) {
    let problem = hjb_profile(33).unwrap();
    let value = solve_stationary(&problem, &StationaryConfig::default())
        .unwrap()
        .value;

    c.bench_function("hjb_extract_policy_33x33", |b| {
        b.iter(|| {
            let policy = extract_policy(&problem, &value).unwrap();
            black_box(&policy);
        });
    });
}

criterion_group!(
    benches,
    bench_stationary_sweeps,
    bench_time_dependent,
    bench_policy_extraction
);
criterion_main!(benches);
