//! Stochastic particle simulation and density evolution on the plane.
//!
//! [`simulate`] integrates an ensemble of particles under
//! `dX = drift(X, t)·dt + sqrt(2·beta(t))·dW` with Euler–Maruyama, where
//! the drift comes from a [`Potential`] or an [`AnnealedScore`]. Every
//! draw comes from one seeded generator, so a run is a pure function of
//! its config. Periodic snapshots are turned into grid densities by
//! [`kde_density`].
//!
//! [`solve_fokker_planck`] evolves the matching density directly on the
//! grid, and [`compare_densities`] measures how far the two series drift
//! apart.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod fokker_planck;
pub mod kde;
pub mod metrics;
pub mod potential;
pub mod schedule;
pub mod score;
pub mod simulate;

pub use error::SdeError;
pub use fokker_planck::{
    initial_density, solve_fokker_planck, solve_fokker_planck_observed, FpBoundary, FpConfig,
    FpResult,
};
pub use kde::{density_grid, kde_density, silverman_bandwidth};
pub use metrics::{
    compare_densities, entropy, kl_divergence, mmd_rbf, DensityComparison, DEFAULT_MMD_BANDWIDTH,
};
pub use potential::{GaussianComponent, GaussianMixture, Potential};
pub use schedule::BetaSchedule;
pub use score::AnnealedScore;
pub use simulate::{simulate, simulate_observed, SdeConfig, SdeResult, Snapshot};
