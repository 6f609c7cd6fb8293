//! Discrete-time, discounted MDP approximation of an HJB problem.
//!
//! States are the grid cell centres and actions the control lattice.
//! Each (state, action) pair moves deterministically to the cell nearest
//! `x + f(x, u)·dt` and costs `stage(x, u)·dt`. Values are cost-to-go, so
//! the Bellman operator minimizes.

use crate::controls::ControlLattice;
use crate::error::HjbError;
use crate::problem::HjbProblem;
use cairn_core::{IterationEvent, IterationObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SOLVER: &str = "hjb.mdp";

/// Two action values closer than this count as a tie.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// MDP construction and value-iteration settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MdpConfig {
    /// Discount factor, in `[0, 1)`.
    pub discount: f64,
    /// Time step of one transition.
    pub dt: f64,
    /// Override of the dynamics' control resolution.
    pub control_resolution: Option<f64>,
    /// Stop once no value changes by this much or more.
    pub tolerance: f64,
    /// Hard cap on sweeps.
    pub max_iterations: usize,
}

impl Default for MdpConfig {
    fn default() -> Self {
        Self {
            discount: 0.95,
            dt: 0.1,
            control_resolution: None,
            tolerance: 1e-6,
            max_iterations: 2000,
        }
    }
}

impl MdpConfig {
    /// Check every setting is in range.
    pub fn validate(&self) -> Result<(), HjbError> {
        if !(0.0..1.0).contains(&self.discount) {
            return Err(HjbError::invalid(
                "discount",
                format!("must be in [0, 1), got {}", self.discount),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(HjbError::invalid(
                "dt",
                format!("must be finite and > 0, got {}", self.dt),
            ));
        }
        if let Some(res) = self.control_resolution {
            if !res.is_finite() || res <= 0.0 {
                return Err(HjbError::invalid(
                    "controlResolution",
                    format!("must be finite and > 0, got {res}"),
                ));
            }
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(HjbError::invalid(
                "tolerance",
                format!("must be finite and > 0, got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(HjbError::invalid("maxIterations", "must be at least 1"));
        }
        Ok(())
    }
}

/// A tabulated deterministic MDP.
#[derive(Clone, Debug, PartialEq)]
pub struct MdpModel {
    /// Number of states (grid cells).
    pub states: usize,
    /// Action set.
    pub lattice: ControlLattice,
    /// Successor state per `(state, action)`, `states × actions`.
    pub transitions: Vec<usize>,
    /// Cost per `(state, action)`, `states × actions`.
    pub rewards: Vec<f64>,
}

impl MdpModel {
    /// Number of actions per state.
    pub fn actions(&self) -> usize {
        self.lattice.len()
    }

    fn q(&self, values: &[f64], discount: f64, state: usize, action: usize) -> f64 {
        let k = state * self.actions() + action;
        self.rewards[k] + discount * values[self.transitions[k]]
    }
}

/// Tabulate transitions and costs for `problem`.
///
/// # Errors
///
/// Returns `Err` if `config` fails validation.
pub fn build_mdp(problem: &HjbProblem, config: &MdpConfig) -> Result<MdpModel, HjbError> {
    config.validate()?;
    let lattice = match config.control_resolution {
        Some(res) => ControlLattice::with_resolution(problem.dynamics(), res),
        None => problem.controls(),
    };
    let grid = problem.grid();
    let ndim = grid.ndim();
    let states = grid.size();
    let mut transitions = Vec::with_capacity(states * lattice.len());
    let mut rewards = Vec::with_capacity(states * lattice.len());

    let mut f = vec![0.0; ndim];
    let mut next = vec![0.0; ndim];
    for cell in grid.cells() {
        let x = &cell.position;
        for u in lattice.iter() {
            problem.dynamics().evaluate(x, u, &mut f);
            for d in 0..ndim {
                next[d] = x[d] + f[d] * config.dt;
            }
            transitions.push(grid.nearest_index(&next, problem.boundary())?);
            rewards.push(problem.cost().stage(x, u) * config.dt);
        }
    }
    debug!(states, actions = lattice.len(), "MDP tabulated");
    Ok(MdpModel {
        states,
        lattice,
        transitions,
        rewards,
    })
}

/// Output of [`value_iteration`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValueIterationResult {
    /// Cost-to-go per state.
    pub values: Vec<f64>,
    /// Sweeps performed.
    pub iterations: usize,
    /// Max change in the last sweep.
    pub residual: f64,
    /// True if the residual fell below the tolerance.
    pub converged: bool,
}

/// Jacobi value iteration from `V = 0`.
pub fn value_iteration(
    model: &MdpModel,
    discount: f64,
    tolerance: f64,
    max_iterations: usize,
) -> ValueIterationResult {
    value_iteration_observed(model, discount, tolerance, max_iterations, &mut NoopObserver)
}

fn value_iteration_observed(
    model: &MdpModel,
    discount: f64,
    tolerance: f64,
    max_iterations: usize,
    observer: &mut impl IterationObserver,
) -> ValueIterationResult {
    let mut values = vec![0.0; model.states];
    let mut next = vec![0.0; model.states];
    let mut residual = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;

    observer.on_start(SOLVER);
    for iteration in 0..max_iterations {
        residual = 0.0;
        for (s, slot) in next.iter_mut().enumerate() {
            let best = (0..model.actions())
                .map(|a| model.q(&values, discount, s, a))
                .fold(f64::INFINITY, f64::min);
            residual = f64::max(residual, (best - values[s]).abs());
            *slot = best;
        }
        std::mem::swap(&mut values, &mut next);
        iterations = iteration + 1;
        observer.on_iteration(&IterationEvent {
            solver: SOLVER,
            iteration,
            metrics: &[("residual", residual)],
        });
        if residual < tolerance {
            converged = true;
            break;
        }
    }
    observer.on_finish(SOLVER, iterations);

    ValueIterationResult {
        values,
        iterations,
        residual,
        converged,
    }
}

/// Greedy action per state.
#[derive(Clone, Debug, PartialEq)]
pub struct GreedyPolicy {
    /// Lattice index of the chosen action; the first minimizer on ties.
    pub actions: Vec<usize>,
    /// States where more than one action is within [`TIE_TOLERANCE`] of the
    /// best.
    pub ties: usize,
}

/// One-step greedy policy with respect to `values`.
///
/// # Errors
///
/// Returns `Err` if `values` does not hold one entry per state.
pub fn extract_greedy_policy(
    model: &MdpModel,
    values: &[f64],
    discount: f64,
) -> Result<GreedyPolicy, HjbError> {
    if values.len() != model.states {
        return Err(HjbError::DimensionMismatch {
            what: "MDP value vector",
            expected: model.states,
            found: values.len(),
        });
    }
    let mut actions = Vec::with_capacity(model.states);
    let mut ties = 0;
    let mut q = vec![0.0; model.actions()];
    for s in 0..model.states {
        for (a, slot) in q.iter_mut().enumerate() {
            *slot = model.q(values, discount, s, a);
        }
        let mut best = 0;
        for a in 1..q.len() {
            if q[a] < q[best] {
                best = a;
            }
        }
        let near = q.iter().filter(|&&v| (v - q[best]).abs() <= TIE_TOLERANCE).count();
        if near > 1 {
            ties += 1;
        }
        actions.push(best);
    }
    Ok(GreedyPolicy { actions, ties })
}

/// Everything [`solve_mdp`] produces.
#[derive(Clone, Debug, PartialEq)]
pub struct MdpSolution {
    /// Cost-to-go per cell.
    pub values: Vec<f64>,
    /// Greedy policy over `lattice`.
    pub policy: GreedyPolicy,
    /// The action set `policy` indexes into.
    pub lattice: ControlLattice,
    /// Sweeps performed.
    pub iterations: usize,
    /// Max change in the last sweep.
    pub residual: f64,
    /// True if the residual fell below the tolerance.
    pub converged: bool,
}

impl MdpSolution {
    /// Control chosen at cell `index`.
    pub fn control(&self, index: usize) -> &[f64] {
        self.lattice.get(self.policy.actions[index])
    }
}

/// Build, solve and extract a greedy policy in one call.
pub fn solve_mdp(problem: &HjbProblem, config: &MdpConfig) -> Result<MdpSolution, HjbError> {
    solve_mdp_observed(problem, config, &mut NoopObserver)
}

/// [`solve_mdp`] reporting each sweep to `observer`.
pub fn solve_mdp_observed(
    problem: &HjbProblem,
    config: &MdpConfig,
    observer: &mut impl IterationObserver,
) -> Result<MdpSolution, HjbError> {
    let model = build_mdp(problem, config)?;
    let vi = value_iteration_observed(
        &model,
        config.discount,
        config.tolerance,
        config.max_iterations,
        observer,
    );
    if vi.converged {
        info!(iterations = vi.iterations, residual = vi.residual, "MDP value iteration converged");
    } else {
        warn!(
            iterations = vi.iterations,
            residual = vi.residual,
            "MDP value iteration hit max iterations"
        );
    }
    let policy = extract_greedy_policy(&model, &vi.values, config.discount)?;
    Ok(MdpSolution {
        values: vi.values,
        policy,
        lattice: model.lattice,
        iterations: vi.iterations,
        residual: vi.residual,
        converged: vi.converged,
    })
}
