//! Seeded Euler–Maruyama integration of a planar particle ensemble.
//!
//! Each step advances every particle by
//!
//! ```text
//! x ← x + drift(x, t)·dt + sqrt(2·beta(t)·dt)·ξ,   ξ ~ N(0, I)
//! ```
//!
//! where the drift is the annealed score when one is configured and
//! `−∇U` otherwise.
//!
//! # Determinism
//!
//! A single `ChaCha8Rng` seeded from `seed` supplies every draw in a fixed
//! order: the initial `x` then `y` of each particle, then per step and per
//! particle the `x` and `y` noise. Identical `(seed, config)` therefore
//! reproduce bit-identical trajectories, and a longer run repeats a
//! shorter one exactly up to the shorter run's last step.

use crate::error::SdeError;
use crate::kde::{check_planar, kde_density};
use crate::potential::Potential;
use crate::schedule::BetaSchedule;
use crate::score::AnnealedScore;
use cairn_core::{Grid, IterationEvent, IterationObserver, NoopObserver};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SOLVER: &str = "sde.euler_maruyama";

/// Simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SdeConfig {
    /// Ensemble size.
    pub particles: usize,
    /// Number of Euler–Maruyama steps.
    pub steps: usize,
    /// Step length.
    pub dt: f64,
    /// Generator seed.
    pub seed: u64,
    /// Potential whose negative gradient is the drift.
    pub potential: Potential,
    /// Annealed score; replaces the potential drift when set.
    pub score: Option<AnnealedScore>,
    /// Noise temperature.
    #[serde(alias = "beta")]
    pub beta_schedule: BetaSchedule,
    /// Snapshot cadence in steps; `max(1, steps / 100)` when absent.
    pub record_every: Option<usize>,
    /// KDE bandwidth; Silverman's rule when absent.
    pub bandwidth: Option<f64>,
}

impl Default for SdeConfig {
    fn default() -> Self {
        Self {
            particles: 20_000,
            steps: 2_000,
            dt: 0.01,
            seed: 7,
            potential: Potential::DoubleWell,
            score: None,
            beta_schedule: BetaSchedule::default(),
            record_every: None,
            bandwidth: None,
        }
    }
}

impl SdeConfig {
    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SdeError::Config`] on malformed JSON or an unparseable
    /// potential, score or schedule string.
    pub fn from_json(json: &str) -> Result<Self, SdeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `particles` or `steps` is zero
    /// - `dt` is not finite and positive
    /// - `record_every` is `Some(0)`
    /// - `bandwidth` is negative or non-finite
    pub fn validate(&self) -> Result<(), SdeError> {
        if self.particles == 0 {
            return Err(SdeError::invalid("particles", "must be >= 1"));
        }
        if self.steps == 0 {
            return Err(SdeError::invalid("steps", "must be >= 1"));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SdeError::invalid(
                "dt",
                format!("must be finite and > 0, got {}", self.dt),
            ));
        }
        if self.record_every == Some(0) {
            return Err(SdeError::invalid("record_every", "must be >= 1"));
        }
        if let Some(h) = self.bandwidth {
            if !h.is_finite() || h < 0.0 {
                return Err(SdeError::invalid(
                    "bandwidth",
                    format!("must be finite and >= 0, got {h}"),
                ));
            }
        }
        Ok(())
    }

    /// Snapshot cadence actually used.
    pub fn effective_record_every(&self) -> usize {
        self.record_every.unwrap_or((self.steps / 100).max(1))
    }
}

/// Particle positions captured after a step.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Steps completed when captured.
    pub step: usize,
    /// Simulated time, `step·dt`.
    pub time: f64,
    /// Flattened `x, y` pairs.
    pub positions: Vec<f32>,
}

/// Output of [`simulate`].
#[derive(Clone, Debug, PartialEq)]
pub struct SdeResult {
    /// Final positions, flattened `x, y` pairs.
    pub positions: Vec<f32>,
    /// Snapshots in time order.
    pub snapshots: Vec<Snapshot>,
    /// One KDE density per snapshot.
    pub densities: Vec<Vec<f64>>,
    /// Snapshot cadence used.
    pub record_every: usize,
}

impl SdeResult {
    /// Ensemble size.
    pub fn particles(&self) -> usize {
        self.positions.len() / 2
    }
}

/// Standard normal draw by Box–Muller (cosine branch only).
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

enum Drift<'a> {
    Potential(&'a Potential),
    Score(&'a AnnealedScore),
}

impl Drift<'_> {
    fn at(&self, x: f64, y: f64, t: f64) -> [f64; 2] {
        match self {
            Self::Potential(p) => {
                let g = p.gradient(x, y);
                [-g[0], -g[1]]
            }
            Self::Score(s) => s.score(x, y, t),
        }
    }
}

/// Run the simulation, estimating densities on `grid`.
///
/// # Errors
///
/// Returns `Err` if the config is invalid or `grid` is not 2-D.
pub fn simulate(config: &SdeConfig, grid: &Grid) -> Result<SdeResult, SdeError> {
    simulate_observed(config, grid, &mut NoopObserver)
}

/// [`simulate`] reporting each snapshot to `observer`.
///
/// Events carry `time`, `beta` and `mean_sq_radius` (mean of `x² + y²`
/// over the ensemble).
pub fn simulate_observed(
    config: &SdeConfig,
    grid: &Grid,
    observer: &mut impl IterationObserver,
) -> Result<SdeResult, SdeError> {
    config.validate()?;
    check_planar(grid)?;
    let record_every = config.effective_record_every();
    let drift = match &config.score {
        Some(score) => Drift::Score(score),
        None => Drift::Potential(&config.potential),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut positions: Vec<f32> = (0..2 * config.particles)
        .map(|_| standard_normal(&mut rng) as f32)
        .collect();
    let expected = config.steps / record_every + 1;
    let mut snapshots = Vec::with_capacity(expected);
    let mut densities = Vec::with_capacity(expected);
    let dt = config.dt;

    observer.on_start(SOLVER);
    for step in 0..config.steps {
        let t = step as f64 * dt;
        let beta = config.beta_schedule.at(t);
        let sigma = (2.0 * beta * dt).sqrt();
        for p in positions.chunks_exact_mut(2) {
            let (x, y) = (f64::from(p[0]), f64::from(p[1]));
            let f = drift.at(x, y, t);
            let nx = standard_normal(&mut rng);
            let ny = standard_normal(&mut rng);
            p[0] = (x + f[0] * dt + sigma * nx) as f32;
            p[1] = (y + f[1] * dt + sigma * ny) as f32;
        }

        let done = step + 1;
        if done % record_every == 0 || done == config.steps {
            let time = done as f64 * dt;
            let density = kde_density(grid, &positions, config.bandwidth)?;
            let spread = mean_sq_radius(&positions);
            if !spread.is_finite() {
                warn!(step = done, "particle ensemble diverged; reduce dt");
            }
            debug!(step = done, time, beta, spread, "sde snapshot");
            observer.on_iteration(&IterationEvent {
                solver: SOLVER,
                iteration: snapshots.len(),
                metrics: &[("time", time), ("beta", beta), ("mean_sq_radius", spread)],
            });
            snapshots.push(Snapshot {
                step: done,
                time,
                positions: positions.clone(),
            });
            densities.push(density);
        }
    }
    observer.on_finish(SOLVER, config.steps);
    info!(
        particles = config.particles,
        steps = config.steps,
        snapshots = snapshots.len(),
        "sde simulation complete"
    );

    Ok(SdeResult {
        positions,
        snapshots,
        densities,
        record_every,
    })
}

fn mean_sq_radius(positions: &[f32]) -> f64 {
    let n = positions.len() / 2;
    if n == 0 {
        return 0.0;
    }
    positions
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        / n as f64
}
