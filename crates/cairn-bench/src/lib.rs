//! Benchmark profiles for the Cairn solvers.
//!
//! Provides pre-built problems at a fixed size so every benchmark and
//! example measures the same work:
//!
//! - [`hjb_profile`]: planar single integrator, quadratic cost, `n × n` grid
//! - [`sinkhorn_profile`]: two shifted Gaussian clouds of `n` points each
//! - [`sde_profile`]: double-well ensemble of `particles` over `steps`

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cairn_core::{Boundary, Grid};
use cairn_hjb::{Cost, Dynamics, HjbError, HjbProblem, QuadraticCost};
use cairn_ot::{cost_matrix, CostMatrix, Metric, SinkhornError};
use cairn_sde::SdeConfig;

/// Build the reference HJB problem on an `n × n` grid over `[-1, 1]²`.
///
/// Controls are sampled at resolution 0.5 within `[-1, 1]`, giving 25
/// candidates per cell.
pub fn hjb_profile(n: usize) -> Result<HjbProblem, HjbError> {
    let h = 2.0 / n.saturating_sub(1).max(1) as f64;
    let grid = Grid::new(&[n, n], &[h, h], &[-1.0, -1.0])?;
    let dynamics = Dynamics::single_integrator(2, 1.0, 0.5)?;
    let cost = Cost::quadratic(QuadraticCost::new(
        vec![1.0, 1.0],
        vec![0.1, 0.1],
        vec![0.0, 0.0],
    ));
    HjbProblem::new(grid, dynamics, cost, Boundary::Clamp)
}

/// Marginals and cost for a transport problem between two point clouds.
pub struct SinkhornProfile {
    /// Source weights, uniform.
    pub mu: Vec<f64>,
    /// Target weights, uniform.
    pub nu: Vec<f64>,
    /// Normalized squared-Euclidean cost.
    pub cost: CostMatrix,
    /// Target cloud, flattened `n × 2`.
    pub targets: Vec<f64>,
    /// Source cloud, flattened `n × 2`.
    pub sources: Vec<f64>,
}

/// Deterministic planar cloud: a sunflower spiral of `n` points around `center`.
fn spiral(n: usize, center: [f64; 2], radius: f64) -> Vec<f64> {
    let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    let mut out = Vec::with_capacity(2 * n);
    for i in 0..n {
        let r = radius * ((i as f64 + 0.5) / n as f64).sqrt();
        let a = i as f64 * golden;
        out.push(center[0] + r * a.cos());
        out.push(center[1] + r * a.sin());
    }
    out
}

/// Build the reference transport problem with `n` points per side.
pub fn sinkhorn_profile(n: usize) -> Result<SinkhornProfile, SinkhornError> {
    let sources = spiral(n, [-1.0, 0.0], 1.0);
    let targets = spiral(n, [1.0, 0.5], 0.6);
    let cost = cost_matrix(&sources, &targets, 2, Metric::SquaredEuclidean, true)?;
    let w = 1.0 / n.max(1) as f64;
    Ok(SinkhornProfile {
        mu: vec![w; n],
        nu: vec![w; n],
        cost,
        targets,
        sources,
    })
}

/// Build the reference particle run.
pub fn sde_profile(particles: usize, steps: usize) -> SdeConfig {
    SdeConfig {
        particles,
        steps,
        dt: 0.01,
        seed: 42,
        record_every: Some(steps.max(1)),
        ..SdeConfig::default()
    }
}
