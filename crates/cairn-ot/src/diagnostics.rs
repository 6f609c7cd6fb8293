//! Primal/dual diagnostics for an entropic coupling.

use serde::{Deserialize, Serialize};

/// Scalar summary of a coupling `π` against its cost and marginals.
///
/// With dual potentials `f = ε·log u`, `g = ε·log v`:
///
/// - `transport_cost = ⟨C, π⟩`
/// - `entropy = −Σ π (log π − 1)`
/// - `primal = transport_cost − ε·entropy`
/// - `dual = ⟨f, μ⟩ + ⟨g, ν⟩ − ε·Σπ`
///
/// At the entropic optimum `primal = dual`, so `dual_gap` shrinks as the
/// iteration converges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// `⟨C, π⟩`.
    pub transport_cost: f64,
    /// Entropy of `π`.
    pub entropy: f64,
    /// Regularized primal objective.
    pub primal: f64,
    /// Dual objective.
    pub dual: f64,
    /// `|primal − dual|`.
    pub dual_gap: f64,
    /// `‖π1 − μ‖₁`.
    pub row_error: f64,
    /// `‖πᵀ1 − ν‖₁`.
    pub col_error: f64,
    /// `max(row_error, col_error)`.
    pub marginal_error: f64,
    /// `Σπ`.
    pub mass: f64,
}

/// Inputs to [`compute_diagnostics`], borrowed from a solve in progress.
pub(crate) struct DiagnosticInputs<'a> {
    pub coupling: &'a [f64],
    pub cost: &'a [f64],
    pub mu: &'a [f64],
    pub nu: &'a [f64],
    pub log_u: &'a [f64],
    pub log_v: &'a [f64],
    pub epsilon: f64,
}

/// Compute [`Diagnostics`] for a `mu.len() × nu.len()` row-major coupling.
///
/// All slices must be consistently sized; this is checked by the solver
/// before the first iteration.
pub fn compute_diagnostics(
    coupling: &[f64],
    cost: &[f64],
    mu: &[f64],
    nu: &[f64],
    log_u: &[f64],
    log_v: &[f64],
    epsilon: f64,
) -> Diagnostics {
    diagnostics_of(&DiagnosticInputs {
        coupling,
        cost,
        mu,
        nu,
        log_u,
        log_v,
        epsilon,
    })
}

pub(crate) fn diagnostics_of(input: &DiagnosticInputs<'_>) -> Diagnostics {
    let rows = input.mu.len();
    let cols = input.nu.len();
    let eps = input.epsilon;

    let mut transport_cost = 0.0;
    let mut entropy = 0.0;
    let mut mass = 0.0;
    let mut row_sums = vec![0.0; rows];
    let mut col_sums = vec![0.0; cols];
    for i in 0..rows {
        for j in 0..cols {
            let k = i * cols + j;
            let p = input.coupling[k];
            transport_cost += input.cost[k] * p;
            if p > 0.0 {
                entropy -= p * (p.ln() - 1.0);
            }
            mass += p;
            row_sums[i] += p;
            col_sums[j] += p;
        }
    }

    let l1 = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f64>();
    let row_error = l1(&row_sums, input.mu);
    let col_error = l1(&col_sums, input.nu);

    let f_mu: f64 = input.log_u.iter().zip(input.mu).map(|(lu, m)| eps * lu * m).sum();
    let g_nu: f64 = input.log_v.iter().zip(input.nu).map(|(lv, n)| eps * lv * n).sum();

    let primal = transport_cost - eps * entropy;
    let dual = f_mu + g_nu - eps * mass;

    Diagnostics {
        transport_cost,
        entropy,
        primal,
        dual,
        dual_gap: (primal - dual).abs(),
        row_error,
        col_error,
        marginal_error: row_error.max(col_error),
        mass,
    }
}
