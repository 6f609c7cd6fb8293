//! Damped fixed-point iteration for the stationary HJB equation.
//!
//! Each sweep is a Jacobi-style Bellman backup over the whole grid with a
//! CFL-bounded step, blended with the previous iterate:
//!
//! ```text
//! V_new = (1 − damping)·V_old + damping·min_u [stage(x,u)·dt + V_old(x + f(x,u)·dt)]
//! ```
//!
//! clamped to `[0, VALUE_CEILING]`. The residual is the largest absolute
//! per-cell change of the sweep.

use crate::backup::Backup;
use crate::error::HjbError;
use crate::problem::HjbProblem;
use crate::VALUE_CEILING;
use cairn_core::{IterationEvent, IterationObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub(crate) const SOLVER: &str = "hjb.stationary";

/// Sweeps between `debug!` progress events.
const LOG_EVERY: usize = 100;

/// Stationary solver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StationaryConfig {
    /// Stop once a sweep changes no cell by this much or more.
    pub tolerance: f64,
    /// Hard cap on sweeps.
    pub max_iterations: usize,
    /// Blend weight of the new backup, in `(0, 1]`.
    pub damping: f64,
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 2500,
            damping: 0.3,
        }
    }
}

impl StationaryConfig {
    /// Check every setting is in range.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `tolerance` is not positive and finite,
    /// `max_iterations` is zero, or `damping` is outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), HjbError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(HjbError::invalid(
                "tolerance",
                format!("must be finite and > 0, got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(HjbError::invalid("maxIterations", "must be at least 1"));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(HjbError::invalid(
                "damping",
                format!("must be in (0, 1], got {}", self.damping),
            ));
        }
        Ok(())
    }
}

/// One entry of the residual history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    /// Zero-based sweep (or step) number.
    pub iteration: usize,
    /// Max absolute per-cell change in that sweep.
    pub residual: f64,
}

/// Output of [`solve_stationary`].
#[derive(Clone, Debug, PartialEq)]
pub struct StationaryResult {
    /// Cost-to-go per cell, row-major.
    pub value: Vec<f64>,
    /// Sweeps performed.
    pub iterations: usize,
    /// Residual of the last sweep.
    pub residual: f64,
    /// True if the residual fell below the tolerance.
    pub converged: bool,
    /// Step used for every sweep.
    pub dt: f64,
    /// Residual after every sweep.
    pub history: Vec<ResidualRecord>,
}

/// Solve the stationary HJB problem to a damped fixed point.
///
/// # Errors
///
/// Returns `Err` if `config` fails validation. The problem itself was
/// validated on construction.
///
/// # Examples
///
/// ```
/// use cairn_core::{Boundary, Grid};
/// use cairn_hjb::{solve_stationary, Cost, Dynamics, HjbProblem, QuadraticCost, StationaryConfig};
///
/// let grid = Grid::unit(&[1, 1]).unwrap();
/// let dynamics = Dynamics::single_integrator(2, 1.0, 0.5).unwrap();
/// let cost = Cost::quadratic(QuadraticCost::new(vec![1.0, 1.0], vec![1.0, 1.0], vec![0.0, 0.0]));
/// let problem = HjbProblem::new(grid, dynamics, cost, Boundary::Clamp).unwrap();
///
/// let result = solve_stationary(&problem, &StationaryConfig::default()).unwrap();
/// assert!(result.converged);
/// assert_eq!(result.iterations, 1);
/// assert_eq!(result.residual, 0.0);
/// ```
pub fn solve_stationary(
    problem: &HjbProblem,
    config: &StationaryConfig,
) -> Result<StationaryResult, HjbError> {
    solve_stationary_observed(problem, config, &mut NoopObserver)
}

/// [`solve_stationary`] reporting each sweep to `observer`.
pub fn solve_stationary_observed(
    problem: &HjbProblem,
    config: &StationaryConfig,
    observer: &mut impl IterationObserver,
) -> Result<StationaryResult, HjbError> {
    config.validate()?;

    let backup = Backup::new(problem, problem.controls());
    let dt = problem.cfl_time_step(backup.lattice()).dt;
    let size = problem.grid().size();

    let mut value = problem.initial_value();
    for v in value.iter_mut() {
        *v = v.clamp(0.0, VALUE_CEILING);
    }
    let mut best = vec![0.0; size];
    let mut history = Vec::new();
    let mut residual = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;

    debug!(
        cells = size,
        controls = backup.lattice().len(),
        dt,
        "stationary HJB solve starting"
    );
    observer.on_start(SOLVER);

    for iteration in 0..config.max_iterations {
        backup.apply(&value, dt, &mut best)?;

        residual = 0.0;
        for (v, &b) in value.iter_mut().zip(&best) {
            let blended = ((1.0 - config.damping) * *v + config.damping * b).clamp(0.0, VALUE_CEILING);
            residual = f64::max(residual, (blended - *v).abs());
            *v = blended;
        }
        iterations = iteration + 1;
        history.push(ResidualRecord {
            iteration,
            residual,
        });
        observer.on_iteration(&IterationEvent {
            solver: SOLVER,
            iteration,
            metrics: &[("residual", residual), ("dt", dt)],
        });
        if iteration % LOG_EVERY == 0 {
            debug!(iteration, residual, "stationary HJB sweep");
        }

        if residual < config.tolerance {
            converged = true;
            break;
        }
    }

    observer.on_finish(SOLVER, iterations);
    if converged {
        info!(iterations, residual, "stationary HJB converged");
    } else {
        warn!(
            iterations,
            residual,
            tolerance = config.tolerance,
            "stationary HJB hit max iterations before converging"
        );
    }

    Ok(StationaryResult {
        value,
        iterations,
        residual,
        converged,
        dt,
        history,
    })
}
