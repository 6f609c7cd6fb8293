//! Lattice minimization of the control Hamiltonian.

use crate::controls::ControlLattice;
use crate::cost::Cost;
use crate::dynamics::Dynamics;
use cairn_core::Point;

/// The minimum of `H(x, p, u) = stage(x, u) + p · f(x, u)` over a lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct HamiltonianMin {
    /// Minimal Hamiltonian value.
    pub value: f64,
    /// Minimizing control; the first in lattice order on ties.
    pub control: Point,
    /// Lattice index of `control`.
    pub index: usize,
}

/// `H(x, p) = min_u stage(x, u) + p · f(x, u)` over a fixed control lattice.
#[derive(Clone, Copy, Debug)]
pub struct Hamiltonian<'a> {
    dynamics: &'a Dynamics,
    cost: &'a Cost,
    controls: &'a ControlLattice,
}

impl<'a> Hamiltonian<'a> {
    /// Bind a dynamics model, a cost and a candidate-control set.
    pub fn new(dynamics: &'a Dynamics, cost: &'a Cost, controls: &'a ControlLattice) -> Self {
        Self {
            dynamics,
            cost,
            controls,
        }
    }

    /// Minimize over the lattice at state `position` with costate `gradient`.
    ///
    /// Returns `value = +∞` and an empty control for an empty lattice.
    pub fn minimize(&self, position: &[f64], gradient: &[f64]) -> HamiltonianMin {
        let mut f = vec![0.0; self.dynamics.state_dim()];
        let mut best = HamiltonianMin {
            value: f64::INFINITY,
            control: Point::new(),
            index: 0,
        };
        for (k, u) in self.controls.iter().enumerate() {
            self.dynamics.evaluate(position, u, &mut f);
            let advection: f64 = gradient.iter().zip(&f).map(|(p, fi)| p * fi).sum();
            let h = self.cost.stage(position, u) + advection;
            if h < best.value {
                best.value = h;
                best.control = Point::from_slice(u);
                best.index = k;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::QuadraticCost;

    #[test]
    fn steers_against_gradient() {
        let d = Dynamics::single_integrator(2, 1.0, 0.5).unwrap();
        let c = Cost::quadratic(QuadraticCost::new(vec![0.0, 0.0], vec![0.0, 0.0], vec![]));
        let lattice = ControlLattice::for_dynamics(&d);
        let h = Hamiltonian::new(&d, &c, &lattice);
        let m = h.minimize(&[0.0, 0.0], &[2.0, -1.0]);
        assert_eq!(m.control.as_slice(), &[-1.0, 1.0]);
        assert_eq!(m.value, -3.0);
    }

    #[test]
    fn effort_cost_balances_gradient() {
        // min_u u² + p·u over [-1, 1] at step 0.5 with p = 1 → u = -0.5.
        let d = Dynamics::single_integrator(1, 1.0, 0.5).unwrap();
        let c = Cost::quadratic(QuadraticCost::new(vec![0.0], vec![1.0], vec![]));
        let lattice = ControlLattice::for_dynamics(&d);
        let m = Hamiltonian::new(&d, &c, &lattice).minimize(&[0.0], &[1.0]);
        assert_eq!(m.control.as_slice(), &[-0.5]);
        assert_eq!(m.value, -0.25);
    }

    #[test]
    fn ties_take_first_control() {
        let d = Dynamics::single_integrator(1, 1.0, 0.5).unwrap();
        let c = Cost::quadratic(QuadraticCost::new(vec![1.0], vec![0.0], vec![]));
        let lattice = ControlLattice::for_dynamics(&d);
        let m = Hamiltonian::new(&d, &c, &lattice).minimize(&[0.3], &[0.0]);
        assert_eq!(m.index, 0);
        assert_eq!(m.control.as_slice(), &[-1.0]);
    }
}
