//! Grid solver for the Fokker–Planck equation of the particle SDE.
//!
//! Evolves a density `ρ` on a 2-D grid under
//!
//! ```text
//! ∂ρ/∂t = ∇·(ρ ∇U) + beta(t)·Δρ
//! ```
//!
//! with an explicit central-difference drift term and an implicit
//! diffusion step: each step solves `(I − dt·beta·Δ) ρ' = ρ + dt·∇·(ρ∇U)`
//! by conjugate gradients. Negative values are clipped and the density
//! renormalized after every step, so `Σ ρ·cell_volume` stays at 1.

use crate::error::SdeError;
use crate::kde::check_planar;
use crate::potential::Potential;
use crate::schedule::BetaSchedule;
use cairn_core::{Boundary, Grid, IterationEvent, IterationObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SOLVER: &str = "sde.fokker_planck";

/// Edge treatment for the finite-difference stencils.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FpBoundary {
    /// Zero-flux: neighbours beyond the edge repeat the edge value.
    #[default]
    Neumann,
    /// Opposite edges are adjacent.
    Periodic,
}

impl FpBoundary {
    fn stencil(self) -> Boundary {
        match self {
            Self::Neumann => Boundary::Clamp,
            Self::Periodic => Boundary::Wrap,
        }
    }
}

/// Fokker–Planck settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FpConfig {
    /// Number of time steps.
    pub steps: usize,
    /// Step length.
    pub dt: f64,
    /// Confining potential.
    pub potential: Potential,
    /// Diffusion coefficient over time.
    #[serde(alias = "beta")]
    pub beta_schedule: BetaSchedule,
    /// Edge treatment.
    pub boundary: FpBoundary,
    /// Width of the isotropic Gaussian initial density.
    pub initial_sigma: f64,
    /// Recording cadence; `max(1, steps / 100)` when absent.
    pub record_every: Option<usize>,
    /// Conjugate-gradient iteration cap per step.
    pub cg_max_iterations: usize,
    /// Conjugate-gradient residual norm target.
    pub cg_tolerance: f64,
}

impl Default for FpConfig {
    fn default() -> Self {
        Self {
            steps: 400,
            dt: 0.005,
            potential: Potential::DoubleWell,
            beta_schedule: BetaSchedule::default(),
            boundary: FpBoundary::Neumann,
            initial_sigma: 1.2,
            record_every: None,
            cg_max_iterations: 150,
            cg_tolerance: 1e-6,
        }
    }
}

impl FpConfig {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, SdeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), SdeError> {
        if self.steps == 0 {
            return Err(SdeError::invalid("steps", "must be >= 1"));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SdeError::invalid(
                "dt",
                format!("must be finite and > 0, got {}", self.dt),
            ));
        }
        if !self.initial_sigma.is_finite() || self.initial_sigma <= 0.0 {
            return Err(SdeError::invalid(
                "initial_sigma",
                format!("must be finite and > 0, got {}", self.initial_sigma),
            ));
        }
        if self.record_every == Some(0) {
            return Err(SdeError::invalid("record_every", "must be >= 1"));
        }
        if self.cg_max_iterations == 0 {
            return Err(SdeError::invalid("cg_max_iterations", "must be >= 1"));
        }
        if !self.cg_tolerance.is_finite() || self.cg_tolerance <= 0.0 {
            return Err(SdeError::invalid(
                "cg_tolerance",
                format!("must be finite and > 0, got {}", self.cg_tolerance),
            ));
        }
        Ok(())
    }

    /// Recording cadence actually used.
    pub fn effective_record_every(&self) -> usize {
        self.record_every.unwrap_or((self.steps / 100).max(1))
    }
}

/// Output of [`solve_fokker_planck`].
#[derive(Clone, Debug, PartialEq)]
pub struct FpResult {
    /// Recorded densities in time order.
    pub densities: Vec<Vec<f64>>,
    /// Time of each recorded density.
    pub times: Vec<f64>,
    /// `Σ ρ·cell_volume` after every step.
    pub mass_history: Vec<f64>,
    /// Recording cadence used.
    pub record_every: usize,
}

/// Five-point stencil helper over a planar grid.
struct Stencil {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
    edge: Boundary,
}

impl Stencil {
    fn new(grid: &Grid, boundary: FpBoundary) -> Self {
        Self {
            nx: grid.shape()[0],
            ny: grid.shape()[1],
            dx: grid.spacing()[0],
            dy: grid.spacing()[1],
            edge: boundary.stencil(),
        }
    }

    /// `(left, right, down, up)` neighbour indices of `(i, j)`.
    fn neighbours(&self, i: usize, j: usize) -> (usize, usize, usize, usize) {
        let (i, j) = (i as i64, j as i64);
        let l = self.edge.resolve(i - 1, self.nx);
        let r = self.edge.resolve(i + 1, self.nx);
        let d = self.edge.resolve(j - 1, self.ny);
        let u = self.edge.resolve(j + 1, self.ny);
        (
            l * self.ny + j as usize,
            r * self.ny + j as usize,
            i as usize * self.ny + d,
            i as usize * self.ny + u,
        )
    }

    fn laplacian(&self, field: &[f64], out: &mut [f64]) {
        let (ix2, iy2) = (1.0 / (self.dx * self.dx), 1.0 / (self.dy * self.dy));
        for i in 0..self.nx {
            for j in 0..self.ny {
                let c = i * self.ny + j;
                let (l, r, d, u) = self.neighbours(i, j);
                out[c] = (field[l] - 2.0 * field[c] + field[r]) * ix2
                    + (field[d] - 2.0 * field[c] + field[u]) * iy2;
            }
        }
    }

    fn divergence(&self, fx: &[f64], fy: &[f64], out: &mut [f64]) {
        for i in 0..self.nx {
            for j in 0..self.ny {
                let (l, r, d, u) = self.neighbours(i, j);
                out[i * self.ny + j] =
                    (fx[r] - fx[l]) / (2.0 * self.dx) + (fy[u] - fy[d]) / (2.0 * self.dy);
            }
        }
    }

    /// `out = field − alpha·Δfield`.
    fn helmholtz(&self, field: &[f64], alpha: f64, out: &mut [f64], scratch: &mut [f64]) {
        self.laplacian(field, scratch);
        for ((o, f), l) in out.iter_mut().zip(field).zip(scratch.iter()) {
            *o = f - alpha * l;
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `(I − alpha·Δ) x = rhs` starting from `x`; returns iterations used.
fn conjugate_gradient(
    stencil: &Stencil,
    alpha: f64,
    rhs: &[f64],
    x: &mut [f64],
    max_iterations: usize,
    tolerance: f64,
) -> usize {
    let n = rhs.len();
    let mut scratch = vec![0.0; n];
    let mut ap = vec![0.0; n];
    stencil.helmholtz(x, alpha, &mut ap, &mut scratch);
    let mut r: Vec<f64> = rhs.iter().zip(&ap).map(|(b, a)| b - a).collect();
    let mut p = r.clone();
    let mut rs_old = dot(&r, &r);
    if rs_old.sqrt() < tolerance {
        return 0;
    }
    for k in 0..max_iterations {
        stencil.helmholtz(&p, alpha, &mut ap, &mut scratch);
        let step = rs_old / dot(&p, &ap).max(1e-12);
        for i in 0..n {
            x[i] += step * p[i];
            r[i] -= step * ap[i];
        }
        let rs_new = dot(&r, &r);
        if rs_new.sqrt() < tolerance {
            return k + 1;
        }
        let beta = rs_new / rs_old.max(1e-12);
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
        rs_old = rs_new;
    }
    max_iterations
}

/// Scale so `Σ ρ·cell_volume = 1`; leaves an all-zero field alone.
fn normalize(density: &mut [f64], cell_volume: f64) -> f64 {
    let sum: f64 = density.iter().sum();
    if sum > 0.0 {
        let scale = 1.0 / (sum * cell_volume);
        for d in density.iter_mut() {
            *d *= scale;
        }
    }
    density.iter().sum::<f64>() * cell_volume
}

/// Normalized isotropic Gaussian centred at the origin.
pub fn initial_density(grid: &Grid, sigma: f64) -> Result<Vec<f64>, SdeError> {
    check_planar(grid)?;
    let two_var = 2.0 * sigma * sigma;
    let mut density = Vec::with_capacity(grid.size());
    for cell in grid.cells() {
        let (x, y) = (cell.position[0], cell.position[1]);
        density.push((-(x * x + y * y) / two_var).exp());
    }
    normalize(&mut density, grid.cell_volume());
    Ok(density)
}

/// Evolve the initial density on `grid`.
///
/// # Errors
///
/// Returns `Err` if the config is invalid or `grid` is not 2-D.
pub fn solve_fokker_planck(config: &FpConfig, grid: &Grid) -> Result<FpResult, SdeError> {
    solve_fokker_planck_observed(config, grid, &mut NoopObserver)
}

/// [`solve_fokker_planck`] reporting each recorded step to `observer`.
///
/// Events carry `time`, `mass` and `cg_iterations`.
pub fn solve_fokker_planck_observed(
    config: &FpConfig,
    grid: &Grid,
    observer: &mut impl IterationObserver,
) -> Result<FpResult, SdeError> {
    config.validate()?;
    let mut density = initial_density(grid, config.initial_sigma)?;
    let stencil = Stencil::new(grid, config.boundary);
    let record_every = config.effective_record_every();
    let n = grid.size();
    let dt = config.dt;

    // ∇U is time independent.
    let mut grad_x = Vec::with_capacity(n);
    let mut grad_y = Vec::with_capacity(n);
    for cell in grid.cells() {
        let g = config.potential.gradient(cell.position[0], cell.position[1]);
        grad_x.push(g[0]);
        grad_y.push(g[1]);
    }

    let mut flux_x = vec![0.0; n];
    let mut flux_y = vec![0.0; n];
    let mut div = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    let mut densities = Vec::new();
    let mut times = Vec::new();
    let mut mass_history = Vec::with_capacity(config.steps);
    let mut stalled = 0usize;

    observer.on_start(SOLVER);
    for step in 0..config.steps {
        for k in 0..n {
            flux_x[k] = density[k] * grad_x[k];
            flux_y[k] = density[k] * grad_y[k];
        }
        stencil.divergence(&flux_x, &flux_y, &mut div);
        for k in 0..n {
            rhs[k] = density[k] + dt * div[k];
        }

        let beta = config.beta_schedule.at(step as f64 * dt);
        let cg = conjugate_gradient(
            &stencil,
            dt * beta,
            &rhs,
            &mut density,
            config.cg_max_iterations,
            config.cg_tolerance,
        );
        if cg == config.cg_max_iterations {
            stalled += 1;
        }
        for d in density.iter_mut() {
            if !d.is_finite() || *d < 0.0 {
                *d = 0.0;
            }
        }
        let mass = normalize(&mut density, grid.cell_volume());
        mass_history.push(mass);

        let done = step + 1;
        if done % record_every == 0 || done == config.steps {
            let time = done as f64 * dt;
            debug!(step = done, time, mass, cg, "fokker-planck record");
            observer.on_iteration(&IterationEvent {
                solver: SOLVER,
                iteration: densities.len(),
                metrics: &[("time", time), ("mass", mass), ("cg_iterations", cg as f64)],
            });
            densities.push(density.clone());
            times.push(time);
        }
    }
    observer.on_finish(SOLVER, config.steps);
    if stalled > 0 {
        warn!(
            steps = stalled,
            cap = config.cg_max_iterations,
            "conjugate gradient hit its iteration cap"
        );
    }
    info!(steps = config.steps, records = densities.len(), "fokker-planck complete");

    Ok(FpResult {
        densities,
        times,
        mass_history,
        record_every,
    })
}
