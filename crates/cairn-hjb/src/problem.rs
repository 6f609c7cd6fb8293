//! A validated grid + dynamics + cost triple.

use crate::controls::ControlLattice;
use crate::cost::Cost;
use crate::dynamics::Dynamics;
use crate::error::HjbError;
use cairn_core::{Boundary, Grid};
use tracing::warn;

/// CFL safety factor applied to the estimated stable step.
pub const CFL_SAFETY: f64 = 0.8;

/// Step used when the CFL estimate is zero, negative, or non-finite.
pub const FALLBACK_DT: f64 = 0.1;

/// Result of the CFL step estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CflStep {
    /// The step to use.
    pub dt: f64,
    /// True if the estimate was degenerate and [`FALLBACK_DT`] was used.
    pub fallback: bool,
}

/// An HJB problem: where (grid), how the state moves (dynamics), what it
/// costs (cost), and what happens at the grid edge (boundary).
#[derive(Clone, Debug, PartialEq)]
pub struct HjbProblem {
    grid: Grid,
    dynamics: Dynamics,
    cost: Cost,
    boundary: Boundary,
}

impl HjbProblem {
    /// Validate and assemble a problem.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the grid dimensionality differs from the dynamics
    /// state dimension, or the dynamics or cost fail validation.
    pub fn new(
        grid: Grid,
        dynamics: Dynamics,
        cost: Cost,
        boundary: Boundary,
    ) -> Result<Self, HjbError> {
        dynamics.validate()?;
        cost.validate()?;
        if grid.ndim() != dynamics.state_dim() {
            return Err(HjbError::DimensionMismatch {
                what: "grid axes vs dynamics state dimension",
                expected: dynamics.state_dim(),
                found: grid.ndim(),
            });
        }
        Ok(Self {
            grid,
            dynamics,
            cost,
            boundary,
        })
    }

    /// The grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The dynamics model.
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// The cost model.
    pub fn cost(&self) -> &Cost {
        &self.cost
    }

    /// The boundary policy.
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Candidate controls at the dynamics' resolution.
    pub fn controls(&self) -> ControlLattice {
        ControlLattice::for_dynamics(&self.dynamics)
    }

    /// Flattened cell positions, `size × ndim`, in row-major cell order.
    pub(crate) fn positions(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.grid.size() * self.grid.ndim());
        for cell in self.grid.cells() {
            out.extend_from_slice(&cell.position);
        }
        out
    }

    /// Initial value field: `terminal(x)` if defined, else `stage(x, 0)`.
    pub fn initial_value(&self) -> Vec<f64> {
        let zero = vec![0.0; self.dynamics.control_dim()];
        self.grid
            .cells()
            .map(|c| {
                self.cost
                    .terminal(&c.position)
                    .unwrap_or_else(|| self.cost.stage(&c.position, &zero))
            })
            .collect()
    }

    /// CFL-bounded explicit step.
    ///
    /// `dt = 0.8 / Σ_d (max|f_d| / h_d)`, with `max|f_d|` taken over every
    /// cell and lattice control. Falls back to [`FALLBACK_DT`] when the
    /// estimate is not a positive finite number (e.g. zero dynamics).
    pub fn cfl_time_step(&self, controls: &ControlLattice) -> CflStep {
        let ndim = self.grid.ndim();
        let mut max_rate = vec![0.0f64; ndim];
        let mut f = vec![0.0; ndim];
        for cell in self.grid.cells() {
            for u in controls.iter() {
                self.dynamics.evaluate(&cell.position, u, &mut f);
                for d in 0..ndim {
                    max_rate[d] = max_rate[d].max(f[d].abs());
                }
            }
        }
        let denom: f64 = max_rate
            .iter()
            .zip(self.grid.spacing())
            .map(|(&r, &h)| r / h)
            .sum();
        let dt = CFL_SAFETY / denom;
        if dt.is_finite() && dt > 0.0 {
            CflStep { dt, fallback: false }
        } else {
            warn!(
                dynamics = self.dynamics.name(),
                estimate = dt,
                fallback = FALLBACK_DT,
                "degenerate CFL step, using fallback dt"
            );
            CflStep {
                dt: FALLBACK_DT,
                fallback: true,
            }
        }
    }
}
