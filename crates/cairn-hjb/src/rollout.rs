//! Closed-loop simulation under a tabulated policy.

use crate::error::HjbError;
use crate::policy::PolicyField;
use crate::problem::HjbProblem;
use cairn_core::Point;
use serde::{Deserialize, Serialize};

/// Rollout settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Initial state.
    pub start: Vec<f64>,
    /// Number of Euler steps.
    pub steps: usize,
    /// Step length.
    pub dt: f64,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            start: Vec::new(),
            steps: 200,
            dt: 0.05,
        }
    }
}

/// A simulated trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Rollout {
    /// `steps + 1` states, starting with the initial state.
    pub states: Vec<Point>,
    /// The control applied at each step.
    pub controls: Vec<Point>,
    /// Accumulated `Σ stage(x, u)·dt`.
    pub cost: f64,
}

/// Integrate the dynamics from `config.start`, applying at each step the
/// policy of the grid cell nearest the current state.
///
/// # Errors
///
/// Returns `Err` if the start state has the wrong dimension, the policy
/// does not cover the grid, or `dt` is not positive.
pub fn simulate_rollout(
    problem: &HjbProblem,
    policy: &PolicyField,
    config: &RolloutConfig,
) -> Result<Rollout, HjbError> {
    let grid = problem.grid();
    let dynamics = problem.dynamics();
    if config.start.len() != dynamics.state_dim() {
        return Err(HjbError::DimensionMismatch {
            what: "rollout start state",
            expected: dynamics.state_dim(),
            found: config.start.len(),
        });
    }
    if policy.len() != grid.size() || policy.control_dim() != dynamics.control_dim() {
        return Err(HjbError::DimensionMismatch {
            what: "policy cells",
            expected: grid.size(),
            found: policy.len(),
        });
    }
    if !config.dt.is_finite() || config.dt <= 0.0 {
        return Err(HjbError::invalid(
            "dt",
            format!("must be finite and > 0, got {}", config.dt),
        ));
    }

    let mut x = Point::from_slice(&config.start);
    let mut f = vec![0.0; x.len()];
    let mut states = Vec::with_capacity(config.steps + 1);
    let mut controls = Vec::with_capacity(config.steps);
    let mut cost = 0.0;
    states.push(x.clone());

    for _ in 0..config.steps {
        let cell = grid.nearest_index(&x, problem.boundary())?;
        let u = policy.control(cell);
        dynamics.evaluate(&x, u, &mut f);
        cost += problem.cost().stage(&x, u) * config.dt;
        for (xi, fi) in x.iter_mut().zip(&f) {
            *xi += fi * config.dt;
        }
        controls.push(Point::from_slice(u));
        states.push(x.clone());
    }

    Ok(Rollout {
        states,
        controls,
        cost,
    })
}
