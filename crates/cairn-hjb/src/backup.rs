//! Shared Bellman backup used by the stationary and time-dependent solvers.

use crate::controls::ControlLattice;
use crate::error::HjbError;
use crate::problem::HjbProblem;
use cairn_core::FieldView;

/// Precomputed per-solve state for repeated backups.
///
/// Holds cell positions and the running-cost table `stage(x, u)` for every
/// (cell, control) pair, both of which are fixed for the whole solve.
pub(crate) struct Backup<'p> {
    problem: &'p HjbProblem,
    lattice: ControlLattice,
    positions: Vec<f64>,
    stage: Vec<f64>,
}

impl<'p> Backup<'p> {
    pub(crate) fn new(problem: &'p HjbProblem, lattice: ControlLattice) -> Self {
        let positions = problem.positions();
        let ndim = problem.grid().ndim();
        let mut stage = Vec::with_capacity(problem.grid().size() * lattice.len());
        for x in positions.chunks_exact(ndim) {
            for u in lattice.iter() {
                stage.push(problem.cost().stage(x, u));
            }
        }
        Self {
            problem,
            lattice,
            positions,
            stage,
        }
    }

    pub(crate) fn lattice(&self) -> &ControlLattice {
        &self.lattice
    }

    /// Write `min_u stage(x,u)·dt + V(x + f(x,u)·dt)` for every cell into
    /// `out`, reading continuation values from `old`.
    pub(crate) fn apply(&self, old: &[f64], dt: f64, out: &mut [f64]) -> Result<(), HjbError> {
        let grid = self.problem.grid();
        let dynamics = self.problem.dynamics();
        let boundary = self.problem.boundary();
        let field = FieldView::new(grid, old)?;
        let ndim = grid.ndim();
        let ncontrols = self.lattice.len();

        let mut f = vec![0.0; ndim];
        let mut next = vec![0.0; ndim];
        for (cell, x) in self.positions.chunks_exact(ndim).enumerate() {
            let stages = &self.stage[cell * ncontrols..(cell + 1) * ncontrols];
            let mut best = f64::INFINITY;
            for (u, &running) in self.lattice.iter().zip(stages) {
                dynamics.evaluate(x, u, &mut f);
                for d in 0..ndim {
                    next[d] = x[d] + f[d] * dt;
                }
                let candidate = running * dt + field.sample(&next, boundary)?;
                if candidate < best {
                    best = candidate;
                }
            }
            out[cell] = best;
        }
        Ok(())
    }
}
