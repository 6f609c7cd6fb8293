//! Entropic optimal transport between discrete distributions.
//!
//! [`log_sinkhorn`] alternates row and column normalizations of the Gibbs
//! kernel `exp(−C/ε)` entirely in log space, so small `ε` does not
//! overflow. Every `check_interval` iterations the coupling is
//! materialized and its marginal error and primal/dual gap are recorded.
//!
//! Around the solver sit the pieces needed to go from point clouds to a
//! transport map: [`cost_matrix`] builds `C` from two clouds,
//! [`barycentric_map`] projects each source point onto the target cloud,
//! and [`interpolate_frames`] produces displacement-interpolation frames.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cost_matrix;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod logsumexp;
pub mod sinkhorn;
pub mod transport;

pub use cost_matrix::{cost_matrix, CostMatrix, Metric};
pub use diagnostics::{compute_diagnostics, Diagnostics};
pub use distribution::Distribution;
pub use error::SinkhornError;
pub use logsumexp::{log_sum_exp, log_sum_exp_col, log_sum_exp_row};
pub use sinkhorn::{
    log_sinkhorn, log_sinkhorn_observed, SinkhornConfig, SinkhornIterate, SinkhornResult,
    WarmStart,
};
pub use transport::{barycentric_map, interpolate_frames, PointFrame, DEFAULT_FRAME_TIMES};
