//! Criterion micro-benchmarks for the particle simulator and grid densities.

use cairn_bench::sde_profile;
use cairn_sde::{density_grid, kde_density, simulate, solve_fokker_planck, FpConfig};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Benchmark: 5K particles over 100 Euler–Maruyama steps.
fn bench_simulate(c: &mut Criterion) {
    let grid = density_grid(64, 64, 2.5).unwrap();
    let config = sde_profile(5_000, 100);

    c.bench_function("sde_simulate_5k_100_steps", |b| {
        b.iter(|| {
            let r = simulate(&config, &grid).unwrap();
            black_box(&r.positions);
        });
    });
}

/// Benchmark: one 20K-particle KDE onto a 128×128 grid.
fn bench_kde(c: &mut Criterion) {
    let grid = density_grid(128, 128, 2.5).unwrap();
    let positions = simulate(&sde_profile(20_000, 1), &grid).unwrap().positions;

    c.bench_function("kde_20k_128x128", |b| {
        b.iter(|| {
            let d = kde_density(&grid, &positions, None).unwrap();
            black_box(&d);
        });
    });
}

/// Benchmark: 50 implicit Fokker–Planck steps on a 64×64 grid.
fn bench_fokker_planck(c: &mut Criterion) {
    let grid = density_grid(64, 64, 2.5).unwrap();
    let config = FpConfig {
        steps: 50,
        ..FpConfig::default()
    };

    c.bench_function("fokker_planck_64x64_50_steps", |b| {
        b.iter(|| {
            let r = solve_fokker_planck(&config, &grid).unwrap();
            black_box(&r.densities);
        });
    });
}

criterion_group!(benches, bench_simulate, bench_kde, bench_fokker_planck);
criterion_main!(benches);
