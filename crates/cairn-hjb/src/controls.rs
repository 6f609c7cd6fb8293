//! Finite candidate-control sets.
//!
//! The HJB solvers minimize over a tensor-product lattice of controls
//! rather than solving the inner minimization exactly. The lattice size is
//! bounded by the control resolution, so results are approximate by
//! construction: a finer resolution tightens the approximation at a
//! proportional cost per sweep.

use crate::dynamics::Dynamics;

/// Smallest lattice step accepted; coarser requests are honoured, finer
/// ones are rounded up to this.
pub const MIN_CONTROL_STEP: f64 = 0.1;

/// A row-major tensor-product lattice of control vectors.
///
/// # Examples
///
/// ```
/// use cairn_hjb::{ControlLattice, Dynamics};
///
/// let d = Dynamics::single_integrator(1, 1.0, 0.5).unwrap();
/// let lattice = ControlLattice::for_dynamics(&d);
/// let xs: Vec<f64> = lattice.iter().map(|u| u[0]).collect();
/// assert_eq!(xs, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ControlLattice {
    dim: usize,
    values: Vec<f64>,
}

impl ControlLattice {
    /// Lattice at the dynamics' own control resolution.
    pub fn for_dynamics(dynamics: &Dynamics) -> Self {
        Self::with_resolution(dynamics, dynamics.control_resolution())
    }

    /// Lattice at an explicit resolution.
    pub fn with_resolution(dynamics: &Dynamics, resolution: f64) -> Self {
        let step = if resolution.is_finite() {
            resolution.max(MIN_CONTROL_STEP)
        } else {
            MIN_CONTROL_STEP
        };

        let axes: Vec<Vec<f64>> = dynamics
            .control_bounds()
            .into_iter()
            .map(|(lo, hi)| {
                let span = hi - lo;
                if span <= 0.0 {
                    return vec![lo];
                }
                let n = ((span / step).ceil() as usize).max(1);
                (0..=n).map(|k| lo + span * k as f64 / n as f64).collect()
            })
            .collect();

        let dim = axes.len();
        let count: usize = axes.iter().map(Vec::len).product();
        let mut values = Vec::with_capacity(count * dim);
        let mut odometer = vec![0usize; dim];
        for _ in 0..count {
            for (d, &k) in odometer.iter().enumerate() {
                values.push(axes[d][k]);
            }
            for d in (0..dim).rev() {
                odometer[d] += 1;
                if odometer[d] < axes[d].len() {
                    break;
                }
                odometer[d] = 0;
            }
        }

        Self { dim, values }
    }

    /// Entries per control vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of control vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.values.len() / self.dim
        }
    }

    /// True if the lattice holds no controls.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k`-th control vector.
    pub fn get(&self, k: usize) -> &[f64] {
        &self.values[k * self.dim..(k + 1) * self.dim]
    }

    /// Controls in lattice order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.dim.max(1))
    }
}
