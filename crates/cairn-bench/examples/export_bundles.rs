//! Run each solver once and write its artifact bundle.
//!
//! Usage: `cargo run -p cairn-bench --example export_bundles [OUT_DIR]`
//! (defaults to `cairn-artifacts` under the system temp directory).

use cairn_bench::{hjb_profile, sde_profile, sinkhorn_profile};
use cairn_export::{
    write_fokker_planck_bundle, write_hjb_bundle, write_sde_bundle, write_sinkhorn_bundle,
};
use cairn_hjb::{extract_policy, solve_stationary, PdeOutcome, StationaryConfig};
use cairn_ot::{
    barycentric_map, interpolate_frames, log_sinkhorn, SinkhornConfig, DEFAULT_FRAME_TIMES,
};
use cairn_sde::{compare_densities, density_grid, simulate, solve_fokker_planck, FpConfig};
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<(), Box<dyn Error>> {
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("cairn-artifacts"));
    println!("=== Cairn artifact bundles → {} ===\n", out.display());

    // --- HJB ---
    let start = Instant::now();
    let problem = hjb_profile(33)?;
    let r = solve_stationary(&problem, &StationaryConfig::default())?;
    let policy = extract_policy(&problem, &r.value)?;
    let outcome = PdeOutcome {
        solver: "hjb.stationary",
        problem,
        value: r.value,
        policy,
        iterations: r.iterations,
        residual: r.residual,
        converged: r.converged,
        history: r.history,
    };
    let files = write_hjb_bundle(&out.join("hjb"), &outcome)?;
    println!(
        "HJB:      {:>4} sweeps, residual {:.2e}, {} files, {:?}",
        outcome.iterations,
        outcome.residual,
        files.len(),
        start.elapsed()
    );

    // --- Sinkhorn ---
    let start = Instant::now();
    let n = 128;
    let p = sinkhorn_profile(n)?;
    let r = log_sinkhorn(&p.mu, &p.nu, &p.cost.matrix, n, n, &SinkhornConfig::new(0.05))?;
    let mapped = barycentric_map(&r.coupling, n, n, &p.targets, 2)?;
    let frames = interpolate_frames(&p.sources, &mapped, &DEFAULT_FRAME_TIMES)?;
    let files = write_sinkhorn_bundle(&out.join("sinkhorn"), &r, &frames, 2)?;
    println!(
        "Sinkhorn: {:>4} iterations, marginal error {:.2e}, {} files, {:?}",
        r.iterations,
        r.diagnostics.marginal_error,
        files.len(),
        start.elapsed()
    );

    // --- SDE and Fokker–Planck ---
    let start = Instant::now();
    let grid = density_grid(64, 64, 2.5)?;
    let config = sde_profile(10_000, 400);
    let sde = simulate(
        &cairn_sde::SdeConfig {
            record_every: Some(100),
            ..config
        },
        &grid,
    )?;
    let files = write_sde_bundle(&out.join("sde"), &grid, &sde)?;
    println!(
        "SDE:      {:>4} snapshots, {} files, {:?}",
        sde.snapshots.len(),
        files.len(),
        start.elapsed()
    );

    let start = Instant::now();
    let fp = solve_fokker_planck(
        &FpConfig {
            steps: 400,
            dt: 0.01,
            record_every: Some(100),
            initial_sigma: 1.0,
            ..FpConfig::default()
        },
        &grid,
    )?;
    let files = write_fokker_planck_bundle(&out.join("fokker_planck"), &grid, &fp)?;
    let cmp = compare_densities(&grid, &sde.densities, &fp.densities)?;
    println!(
        "FP:       {:>4} records, {} files, {:?}",
        fp.densities.len(),
        files.len(),
        start.elapsed()
    );
    for (k, (kl, mmd)) in cmp.kl.iter().zip(&cmp.mmd).enumerate() {
        println!("  frame {k}: KL(sde ‖ fp) = {kl:.4}, MMD = {mmd:.4}");
    }
    Ok(())
}
