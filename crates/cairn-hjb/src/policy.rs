//! Feedback policy extraction from a value field.

use crate::error::HjbError;
use crate::gradient::godunov_gradient;
use crate::hamiltonian::Hamiltonian;
use crate::problem::HjbProblem;

/// One control vector per grid cell, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyField {
    control_dim: usize,
    controls: Vec<f64>,
}

impl PolicyField {
    /// Entries per control vector.
    pub fn control_dim(&self) -> usize {
        self.control_dim
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        if self.control_dim == 0 {
            0
        } else {
            self.controls.len() / self.control_dim
        }
    }

    /// True if the field covers no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Control for cell `index`.
    pub fn control(&self, index: usize) -> &[f64] {
        &self.controls[index * self.control_dim..(index + 1) * self.control_dim]
    }

    /// Flattened `cells × control_dim` buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.controls
    }
}

/// Per-cell minimizer of the Hamiltonian at the Godunov gradient of `value`.
///
/// The minimization runs over the problem's control lattice, so the
/// result is only as fine as the dynamics' control resolution.
///
/// # Errors
///
/// Returns `Err` if `value` does not have one entry per grid cell.
pub fn extract_policy(problem: &HjbProblem, value: &[f64]) -> Result<PolicyField, HjbError> {
    let grid = problem.grid();
    grid.check_field_len(value.len())?;
    let lattice = problem.controls();
    let hamiltonian = Hamiltonian::new(problem.dynamics(), problem.cost(), &lattice);
    let control_dim = problem.dynamics().control_dim();

    let mut controls = Vec::with_capacity(grid.size() * control_dim);
    for cell in grid.cells() {
        let p = godunov_gradient(grid, value, &cell.coords, problem.boundary())?;
        let best = hamiltonian.minimize(&cell.position, &p);
        controls.extend_from_slice(&best.control);
    }
    Ok(PolicyField {
        control_dim,
        controls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{Cost, QuadraticCost};
    use crate::dynamics::Dynamics;
    use crate::stationary::{solve_stationary, StationaryConfig};
    use cairn_core::{Boundary, Grid};

    #[test]
    fn policy_points_toward_goal() {
        let grid = Grid::new(&[11], &[0.2], &[-1.0]).unwrap();
        let d = Dynamics::single_integrator(1, 1.0, 0.5).unwrap();
        let c = Cost::quadratic(QuadraticCost::new(vec![1.0], vec![0.1], vec![0.0]));
        let p = HjbProblem::new(grid, d, c, Boundary::Clamp).unwrap();
        let v = solve_stationary(&p, &StationaryConfig::default()).unwrap();
        let policy = extract_policy(&p, &v.value).unwrap();
        assert_eq!(policy.len(), 11);
        assert_eq!(policy.control_dim(), 1);
        assert!(policy.control(1)[0] > 0.0);
        assert!(policy.control(9)[0] < 0.0);
        assert_eq!(policy.control(5)[0], 0.0);
    }

    #[test]
    fn rejects_wrong_length() {
        let grid = Grid::unit(&[3, 3]).unwrap();
        let d = Dynamics::single_integrator(2, 1.0, 0.5).unwrap();
        let c = Cost::quadratic(QuadraticCost::default());
        let p = HjbProblem::new(grid, d, c, Boundary::Clamp).unwrap();
        assert!(extract_policy(&p, &[0.0; 4]).is_err());
    }
}
