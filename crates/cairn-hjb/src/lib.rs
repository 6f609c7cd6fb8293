//! Hamilton–Jacobi–Bellman optimal-control solvers on rectangular grids.
//!
//! A [`HjbProblem`] couples a [`Grid`](cairn_core::Grid) with a
//! [`Dynamics`] model and a [`Cost`]. The stationary solver runs damped
//! Bellman value iteration to a fixed point; the time-dependent solver
//! marches backward over a finite horizon. Both minimize cost-to-go over
//! a finite, resolution-bounded [`ControlLattice`], so the result
//! approximates the optimal control rather than solving for it exactly.
//!
//! # Pipeline
//!
//! 1. [`solve_stationary`] or [`solve_time_dependent`] → value field
//! 2. [`extract_policy`] → per-cell control via the Godunov upwind gradient
//!    and Hamiltonian minimization
//! 3. optionally [`simulate_rollout`] → closed-loop trajectory
//!
//! A discrete Markov-decision variant ([`solve_mdp`]) treats grid cells as
//! states and lattice controls as actions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod backup;
pub mod config;
pub mod controls;
pub mod cost;
pub mod dynamics;
pub mod error;
pub mod gradient;
pub mod hamiltonian;
pub mod mdp;
pub mod policy;
pub mod problem;
pub mod rollout;
pub mod stationary;
pub mod time_dependent;

pub use config::{MdpJobConfig, PdeConfig, PdeOutcome};
pub use controls::ControlLattice;
pub use cost::{Cost, Obstacle, ObstacleCost, QuadraticCost};
pub use dynamics::{DoubleIntegrator, DubinsCar, Dynamics, SingleIntegrator};
pub use error::HjbError;
pub use gradient::godunov_gradient;
pub use hamiltonian::{Hamiltonian, HamiltonianMin};
pub use mdp::{
    build_mdp, extract_greedy_policy, solve_mdp, solve_mdp_observed, value_iteration,
    GreedyPolicy, MdpConfig, MdpModel, MdpSolution, ValueIterationResult,
};
pub use policy::{extract_policy, PolicyField};
pub use problem::{CflStep, HjbProblem};
pub use rollout::{simulate_rollout, Rollout, RolloutConfig};
pub use stationary::{
    solve_stationary, solve_stationary_observed, ResidualRecord, StationaryConfig,
    StationaryResult,
};
pub use time_dependent::{
    solve_time_dependent, solve_time_dependent_observed, TimeDependentConfig,
    TimeDependentResult,
};

/// Upper bound applied to every value-field entry.
pub const VALUE_CEILING: f64 = 1e6;
