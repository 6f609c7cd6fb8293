//! Job-level configuration resolved from JSON.
//!
//! A [`PdeConfig`] carries everything needed to build an [`HjbProblem`]
//! and run either the stationary solver or, when `horizon` is set, the
//! time-dependent one. Dynamics and cost are tagged variants, so an
//! unsupported `"type"` fails while parsing.

use crate::cost::Cost;
use crate::dynamics::Dynamics;
use crate::error::HjbError;
use crate::mdp::{solve_mdp, MdpConfig, MdpSolution};
use crate::policy::{extract_policy, PolicyField};
use crate::problem::HjbProblem;
use crate::stationary::{self, solve_stationary, ResidualRecord, StationaryConfig};
use crate::time_dependent::{self, solve_time_dependent, TimeDependentConfig};
use cairn_core::{Boundary, Grid};
use serde::{Deserialize, Serialize};

/// Continuous-time HJB job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdeConfig {
    /// Discretization.
    pub grid: Grid,
    /// State-transition model.
    pub dynamics: Dynamics,
    /// Running and terminal cost.
    pub cost: Cost,
    /// Edge policy for interpolation and neighbours.
    #[serde(default)]
    pub boundary: Boundary,
    /// Stationary solver settings (`tolerance`, `maxIterations`, `damping`).
    #[serde(flatten)]
    pub solver: StationaryConfig,
    /// Switch to the finite-horizon solver over this horizon.
    #[serde(default)]
    pub horizon: Option<f64>,
    /// Finite-horizon step; CFL when absent.
    #[serde(default)]
    pub time_step: Option<f64>,
}

/// Result of [`PdeConfig::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct PdeOutcome {
    /// Label of the solver that ran, as reported to observers.
    pub solver: &'static str,
    /// The resolved problem.
    pub problem: HjbProblem,
    /// Value field.
    pub value: Vec<f64>,
    /// Policy derived from `value`.
    pub policy: PolicyField,
    /// Sweeps (stationary) or backward steps (finite horizon).
    pub iterations: usize,
    /// Final residual.
    pub residual: f64,
    /// False only when a stationary solve ran out of iterations.
    pub converged: bool,
    /// Residual history.
    pub history: Vec<ResidualRecord>,
}

impl PdeConfig {
    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HjbError::Config`] on malformed JSON, unknown tags or an
    /// invalid grid.
    pub fn from_json(json: &str) -> Result<Self, HjbError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and assemble the problem.
    pub fn problem(&self) -> Result<HjbProblem, HjbError> {
        HjbProblem::new(
            self.grid.clone(),
            self.dynamics.clone(),
            self.cost.clone(),
            self.boundary,
        )
    }

    /// Solve and extract a policy.
    pub fn run(&self) -> Result<PdeOutcome, HjbError> {
        let problem = self.problem()?;
        let (solver, value, iterations, residual, converged, history) = match self.horizon {
            Some(horizon) => {
                let config = TimeDependentConfig {
                    horizon,
                    time_step: self.time_step,
                };
                let r = solve_time_dependent(&problem, &config)?;
                (
                    time_dependent::SOLVER,
                    r.value,
                    r.steps,
                    r.residual,
                    true,
                    r.history,
                )
            }
            None => {
                let r = solve_stationary(&problem, &self.solver)?;
                (
                    stationary::SOLVER,
                    r.value,
                    r.iterations,
                    r.residual,
                    r.converged,
                    r.history,
                )
            }
        };
        let policy = extract_policy(&problem, &value)?;
        Ok(PdeOutcome {
            solver,
            problem,
            value,
            policy,
            iterations,
            residual,
            converged,
            history,
        })
    }
}

/// Discrete MDP job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdpJobConfig {
    /// Discretization; cell centres are the MDP states.
    pub grid: Grid,
    /// State-transition model.
    pub dynamics: Dynamics,
    /// Running cost.
    pub cost: Cost,
    /// Edge policy for nearest-cell transitions.
    #[serde(default)]
    pub boundary: Boundary,
    /// Discount, step, resolution and stopping settings.
    #[serde(flatten)]
    pub mdp: MdpConfig,
}

impl MdpJobConfig {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, HjbError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and assemble the problem.
    pub fn problem(&self) -> Result<HjbProblem, HjbError> {
        HjbProblem::new(
            self.grid.clone(),
            self.dynamics.clone(),
            self.cost.clone(),
            self.boundary,
        )
    }

    /// Build and solve the MDP.
    pub fn run(&self) -> Result<MdpSolution, HjbError> {
        solve_mdp(&self.problem()?, &self.mdp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDE: &str = r#"{
        "grid": {"shape": [9, 9], "spacing": [0.25, 0.25], "origin": [-1.0, -1.0]},
        "dynamics": {"type": "single_integrator", "controlLimit": 1.0},
        "cost": {"type": "quadratic", "controlWeights": [0.1, 0.1]},
        "maxIterations": 1500
    }"#;

    #[test]
    fn parses_with_defaults() {
        let c = PdeConfig::from_json(PDE).unwrap();
        assert_eq!(c.boundary, Boundary::Clamp);
        assert_eq!(c.solver.max_iterations, 1500);
        assert_eq!(c.solver.damping, 0.3);
        assert_eq!(c.horizon, None);
        assert_eq!(c.grid.size(), 81);
    }

    #[test]
    fn stationary_run_produces_policy() {
        let out = PdeConfig::from_json(PDE).unwrap().run().unwrap();
        assert!(out.converged);
        assert_eq!(out.solver, "hjb.stationary");
        assert_eq!(out.value.len(), 81);
        assert_eq!(out.policy.len(), 81);
        assert_eq!(out.history.len(), out.iterations);
    }

    #[test]
    fn horizon_switches_solver() {
        let mut c = PdeConfig::from_json(PDE).unwrap();
        c.horizon = Some(0.5);
        c.time_step = Some(0.125);
        let out = c.run().unwrap();
        assert_eq!(out.iterations, 4);
        assert_eq!(out.solver, "hjb.time_dependent");
    }

    #[test]
    fn unknown_dynamics_is_config_error() {
        let json = PDE.replace("single_integrator", "rocket");
        assert!(matches!(PdeConfig::from_json(&json), Err(HjbError::Config { .. })));
    }

    #[test]
    fn invalid_grid_is_config_error() {
        let json = PDE.replace("[9, 9]", "[0, 9]");
        assert!(matches!(PdeConfig::from_json(&json), Err(HjbError::Config { .. })));
    }

    #[test]
    fn mdp_job_runs() {
        let json = r#"{
            "grid": {"shape": [9], "spacing": [0.25], "origin": [-1.0]},
            "dynamics": {"type": "single_integrator", "dimension": 1, "controlLimit": 2.5},
            "cost": {"type": "quadratic", "stateWeights": [1.0], "controlWeights": [0.0]},
            "controlResolution": 2.5,
            "discount": 0.9
        }"#;
        let job = MdpJobConfig::from_json(json).unwrap();
        assert_eq!(job.mdp.discount, 0.9);
        assert_eq!(job.mdp.dt, 0.1);
        let s = job.run().unwrap();
        assert!(s.converged);
        assert_eq!(s.control(0), &[2.5]);
    }
}
