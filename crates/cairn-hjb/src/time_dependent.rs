//! Finite-horizon HJB by explicit backward stepping.
//!
//! Starting from `V(T, x) = terminal(x) ?? stage(x, 0)`, each step applies
//! an undamped Bellman backup with the step length as `dt`. The number of
//! steps is `ceil(horizon / time_step)`, with a ratio within `1e-9`
//! (relative) of an integer counted as that integer. The final step is
//! shortened so the steps sum to the horizon exactly and is never
//! non-positive. There is no early stopping.

use crate::backup::Backup;
use crate::error::HjbError;
use crate::problem::HjbProblem;
use crate::stationary::ResidualRecord;
use crate::VALUE_CEILING;
use cairn_core::{IterationEvent, IterationObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub(crate) const SOLVER: &str = "hjb.time_dependent";

/// Finite-horizon settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDependentConfig {
    /// Total time to step back over.
    pub horizon: f64,
    /// Explicit step; the CFL step is used when absent.
    #[serde(default)]
    pub time_step: Option<f64>,
}

impl TimeDependentConfig {
    /// Horizon with the CFL step.
    pub fn new(horizon: f64) -> Self {
        Self {
            horizon,
            time_step: None,
        }
    }

    /// Use an explicit step.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = Some(time_step);
        self
    }

    /// Check the horizon and step are positive and finite.
    pub fn validate(&self) -> Result<(), HjbError> {
        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return Err(HjbError::invalid(
                "horizon",
                format!("must be finite and > 0, got {}", self.horizon),
            ));
        }
        if let Some(step) = self.time_step {
            if !step.is_finite() || step <= 0.0 {
                return Err(HjbError::invalid(
                    "timeStep",
                    format!("must be finite and > 0, got {step}"),
                ));
            }
        }
        Ok(())
    }
}

/// Output of [`solve_time_dependent`].
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDependentResult {
    /// Cost-to-go at `t = 0`, row-major.
    pub value: Vec<f64>,
    /// Backward steps taken.
    pub steps: usize,
    /// Max absolute per-cell change of the last step.
    pub residual: f64,
    /// Nominal step length (the last step may be shorter).
    pub time_step: f64,
    /// Change per step.
    pub history: Vec<ResidualRecord>,
}

/// Step the value function back from the horizon to `t = 0`.
///
/// # Errors
///
/// Returns `Err` if `config` fails validation.
pub fn solve_time_dependent(
    problem: &HjbProblem,
    config: &TimeDependentConfig,
) -> Result<TimeDependentResult, HjbError> {
    solve_time_dependent_observed(problem, config, &mut NoopObserver)
}

/// [`solve_time_dependent`] reporting each step to `observer`.
pub fn solve_time_dependent_observed(
    problem: &HjbProblem,
    config: &TimeDependentConfig,
    observer: &mut impl IterationObserver,
) -> Result<TimeDependentResult, HjbError> {
    config.validate()?;

    let backup = Backup::new(problem, problem.controls());
    let cfl = problem.cfl_time_step(backup.lattice());
    let time_step = match config.time_step {
        Some(step) => {
            if step > cfl.dt {
                warn!(
                    time_step = step,
                    cfl = cfl.dt,
                    "time step exceeds the CFL bound; scheme may be unstable"
                );
            }
            step
        }
        None => cfl.dt,
    };
    let steps = step_count(config.horizon, time_step);

    let mut value = problem.initial_value();
    for v in value.iter_mut() {
        *v = v.clamp(0.0, VALUE_CEILING);
    }
    let mut next = vec![0.0; value.len()];
    let mut history = Vec::with_capacity(steps);
    let mut residual = 0.0;
    let mut elapsed = 0.0;

    debug!(steps, time_step, horizon = config.horizon, "time-dependent HJB starting");
    observer.on_start(SOLVER);

    for step in 0..steps {
        let dt = if step + 1 == steps {
            let rest = config.horizon - elapsed;
            if rest > 0.0 {
                rest
            } else {
                time_step
            }
        } else {
            time_step
        };
        backup.apply(&value, dt, &mut next)?;

        residual = 0.0;
        for (v, &n) in value.iter_mut().zip(&next) {
            let n = n.clamp(0.0, VALUE_CEILING);
            residual = f64::max(residual, (n - *v).abs());
            *v = n;
        }
        elapsed += dt;
        history.push(ResidualRecord {
            iteration: step,
            residual,
        });
        observer.on_iteration(&IterationEvent {
            solver: SOLVER,
            iteration: step,
            metrics: &[("residual", residual), ("dt", dt), ("time", config.horizon - elapsed)],
        });
    }

    observer.on_finish(SOLVER, steps);
    info!(steps, residual, "time-dependent HJB finished");

    Ok(TimeDependentResult {
        value,
        steps,
        residual,
        time_step,
        history,
    })
}

/// Number of steps covering `horizon`, treating a ratio within rounding
/// of an integer as exact.
fn step_count(horizon: f64, time_step: f64) -> usize {
    let n = horizon / time_step;
    let whole = n.round();
    let steps = if (n - whole).abs() <= 1e-9 * n { whole } else { n.ceil() };
    (steps as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{Cost, QuadraticCost};
    use crate::dynamics::Dynamics;
    use cairn_core::{Boundary, Grid};

    fn line_problem(terminal: Option<Vec<f64>>) -> HjbProblem {
        let grid = Grid::new(&[11], &[0.2], &[-1.0]).unwrap();
        let dynamics = Dynamics::single_integrator(1, 1.0, 0.5).unwrap();
        let mut base = QuadraticCost::new(vec![1.0], vec![0.0], vec![0.0]);
        if let Some(w) = terminal {
            base = base.with_terminal_weights(w);
        }
        HjbProblem::new(grid, dynamics, Cost::quadratic(base), Boundary::Clamp).unwrap()
    }

    #[test]
    fn rejects_bad_horizon_and_step() {
        let p = line_problem(None);
        assert!(solve_time_dependent(&p, &TimeDependentConfig::new(0.0)).is_err());
        assert!(solve_time_dependent(&p, &TimeDependentConfig::new(f64::NAN)).is_err());
        let c = TimeDependentConfig::new(1.0).with_time_step(-0.1);
        assert!(solve_time_dependent(&p, &c).is_err());
    }

    #[test]
    fn step_count_absorbs_rounding() {
        // 0.9 / 0.03 evaluates to 30.000000000000004.
        assert_eq!(step_count(0.9, 0.03), 30);
        assert_eq!(step_count(0.3, 0.1), 3);
        assert_eq!(step_count(1.0, 0.15), 7);
        assert_eq!(step_count(1e-3, 1.0), 1);

        let p = line_problem(None);
        let c = TimeDependentConfig::new(0.9).with_time_step(0.03);
        let r = solve_time_dependent(&p, &c).unwrap();
        assert_eq!(r.steps, 30);
        assert_eq!(r.history.len(), 30);
        assert!(r.value.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn step_count_rounds_up() {
        let p = line_problem(None);
        let c = TimeDependentConfig::new(1.0).with_time_step(0.15);
        let r = solve_time_dependent(&p, &c).unwrap();
        assert_eq!(r.steps, 7);
        assert_eq!(r.history.len(), 7);
        assert_eq!(r.time_step, 0.15);
    }

    #[test]
    fn defaults_to_cfl_step() {
        let p = line_problem(None);
        let r = solve_time_dependent(&p, &TimeDependentConfig::new(0.5)).unwrap();
        // 0.8 / (1 / 0.2)
        assert!((r.time_step - 0.16).abs() < 1e-12);
        assert_eq!(r.steps, 4);
    }

    #[test]
    fn zero_terminal_accumulates_running_cost() {
        // Terminal weight 0 everywhere: V(T) = 0 and the value grows with
        // the remaining horizon except at the goal.
        let p = line_problem(Some(vec![0.0]));
        let short = solve_time_dependent(&p, &TimeDependentConfig::new(0.4)).unwrap();
        let long = solve_time_dependent(&p, &TimeDependentConfig::new(1.6)).unwrap();
        let goal = 5;
        assert_eq!(short.value[goal], 0.0);
        assert_eq!(long.value[goal], 0.0);
        for i in [0, 2, 8, 10] {
            assert!(long.value[i] > short.value[i], "cell {i}");
        }
    }

    #[test]
    fn terminal_cost_sets_initial_condition() {
        let p = line_problem(Some(vec![100.0]));
        let r = solve_time_dependent(&p, &TimeDependentConfig::new(0.01)).unwrap();
        assert_eq!(r.steps, 1);
        // Far cells still dominated by the terminal penalty.
        assert!(r.value[0] > 50.0);
        assert_eq!(r.value[5], 0.0);
    }
}
