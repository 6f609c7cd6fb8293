//! Cairn: grid-based numerical solvers for control, transport and diffusion.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Cairn sub-crates. For most users, adding `cairn` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cairn::prelude::*;
//!
//! // Transport two equal masses across a symmetric cost.
//! let mu = [0.5, 0.5];
//! let nu = [0.5, 0.5];
//! let cost = [0.0, 1.0, 1.0, 0.0];
//! let r = log_sinkhorn(&mu, &nu, &cost, 2, 2, &SinkhornConfig::new(0.5)).unwrap();
//! assert!(r.converged);
//! let row0 = r.coupling[0] + r.coupling[1];
//! assert!((row0 - 0.5).abs() < 1e-3);
//!
//! // A single cell sitting on the goal is already at its fixed point.
//! let grid = Grid::unit(&[1, 1]).unwrap();
//! let dynamics = Dynamics::single_integrator(2, 3.0, 0.5).unwrap();
//! let cost = Cost::quadratic(QuadraticCost::new(
//!     vec![1.0, 1.0],
//!     vec![1.0, 1.0],
//!     vec![0.0, 0.0],
//! ));
//! let problem = HjbProblem::new(grid, dynamics, cost, Boundary::Clamp).unwrap();
//! let v = solve_stationary(&problem, &StationaryConfig::default()).unwrap();
//! assert_eq!(v.residual, 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`grid`] | `cairn-core` | Grid, boundary policy, interpolation, observer hooks |
//! | [`hjb`] | `cairn-hjb` | Dynamics, costs, HJB and MDP solvers, policies, rollouts |
//! | [`ot`] | `cairn-ot` | Log-domain Sinkhorn, cost matrices, transport maps |
//! | [`sde`] | `cairn-sde` | Potentials, Euler–Maruyama, KDE, Fokker–Planck, metrics |
//! | [`export`] | `cairn-export` | NPY arrays, rasters, diagnostics, frames, bundles |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Grid, boundary policy and observer hooks (`cairn-core`).
///
/// Every solver discretizes onto a [`grid::Grid`]; loops report progress
/// through [`grid::IterationObserver`].
pub use cairn_core as grid;

/// Hamilton–Jacobi–Bellman solvers (`cairn-hjb`).
///
/// [`hjb::solve_stationary`] and [`hjb::solve_time_dependent`] produce a
/// value field; [`hjb::extract_policy`] turns it into a feedback policy.
pub use cairn_hjb as hjb;

/// Entropic optimal transport (`cairn-ot`).
///
/// [`ot::log_sinkhorn`] computes the coupling; [`ot::barycentric_map`]
/// and [`ot::interpolate_frames`] turn it into a displacement.
pub use cairn_ot as ot;

/// Particle SDEs and grid densities (`cairn-sde`).
///
/// [`sde::simulate`] runs the particle ensemble and
/// [`sde::solve_fokker_planck`] evolves the matching density.
pub use cairn_sde as sde;

/// Artifact encoding (`cairn-export`).
///
/// The `write_*_bundle` functions write every artifact of one solve into
/// a directory.
pub use cairn_export as export;

/// Common imports for typical Cairn usage.
///
/// ```rust
/// use cairn::prelude::*;
/// ```
///
/// This imports the grid, the solver entry points with their configs and
/// results, the error types, and the artifact bundle writers.
pub mod prelude {
    // Grid and hooks
    pub use cairn_core::{Boundary, Grid, IterationObserver, NoopObserver};

    // HJB
    pub use cairn_hjb::{
        extract_policy, solve_mdp, solve_stationary, solve_time_dependent, Cost, Dynamics,
        HjbProblem, MdpConfig, PdeConfig, QuadraticCost, StationaryConfig,
        TimeDependentConfig,
    };

    // Optimal transport
    pub use cairn_ot::{
        barycentric_map, cost_matrix, interpolate_frames, log_sinkhorn, Metric, SinkhornConfig,
        SinkhornResult,
    };

    // SDE
    pub use cairn_sde::{
        density_grid, simulate, solve_fokker_planck, FpConfig, Potential, SdeConfig, SdeResult,
    };

    // Errors
    pub use cairn_core::GridError;
    pub use cairn_export::ExportError;
    pub use cairn_hjb::HjbError;
    pub use cairn_ot::SinkhornError;
    pub use cairn_sde::SdeError;

    // Export
    pub use cairn_export::{
        write_hjb_bundle, write_sde_bundle, write_sinkhorn_bundle, DiagnosticsDoc, FramesDoc,
    };
}
