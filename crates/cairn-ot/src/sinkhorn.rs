//! Log-domain Sinkhorn iteration.

use crate::diagnostics::{diagnostics_of, DiagnosticInputs, Diagnostics};
use crate::error::SinkhornError;
use crate::logsumexp::{log_sum_exp_col, log_sum_exp_row};
use cairn_core::{IterationEvent, IterationObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SOLVER: &str = "ot.sinkhorn";

/// Exponent bound applied when materializing the coupling.
pub const COUPLING_EXPONENT_LIMIT: f64 = 700.0;

/// Dual potentials from an earlier solve, used as the starting point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmStart {
    /// Row potentials `log u`, one per row.
    pub log_u: Vec<f64>,
    /// Column potentials `log v`, one per column.
    pub log_v: Vec<f64>,
}

/// Sinkhorn settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SinkhornConfig {
    /// Entropic regularization `ε > 0`.
    pub epsilon: f64,
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Stop once the marginal error at a check falls below this.
    pub tolerance: f64,
    /// Bound on shifted exponents inside log-sum-exp.
    pub clamp: f64,
    /// Iterations between convergence checks; `0` is treated as `1`.
    pub check_interval: usize,
    /// Optional starting potentials.
    pub warm_start: Option<WarmStart>,
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            max_iterations: 500,
            tolerance: 1e-3,
            clamp: 80.0,
            check_interval: 10,
            warm_start: None,
        }
    }
}

impl SinkhornConfig {
    /// Default settings with the given `epsilon`.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, SinkhornError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the scalar settings.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `epsilon`, `tolerance` or `clamp` is not positive
    /// and finite, or `max_iterations` is zero.
    pub fn validate(&self) -> Result<(), SinkhornError> {
        let positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SinkhornError::invalid(
                    name,
                    format!("must be finite and > 0, got {v}"),
                ))
            }
        };
        positive("epsilon", self.epsilon)?;
        positive("tolerance", self.tolerance)?;
        positive("clamp", self.clamp)?;
        if self.max_iterations == 0 {
            return Err(SinkhornError::invalid("maxIterations", "must be at least 1"));
        }
        Ok(())
    }
}

/// One convergence check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkhornIterate {
    /// Zero-based iteration at which the check ran.
    pub iteration: usize,
    /// `max(‖π1 − μ‖₁, ‖πᵀ1 − ν‖₁)`.
    pub marginal_error: f64,
    /// `|primal − dual|`.
    pub dual_gap: f64,
}

/// Output of [`log_sinkhorn`].
#[derive(Clone, Debug, PartialEq)]
pub struct SinkhornResult {
    /// Number of rows (source atoms).
    pub rows: usize,
    /// Number of columns (target atoms).
    pub cols: usize,
    /// `exp(log_u)`.
    pub u: Vec<f64>,
    /// `exp(log_v)`.
    pub v: Vec<f64>,
    /// Row potentials.
    pub log_u: Vec<f64>,
    /// Column potentials.
    pub log_v: Vec<f64>,
    /// Row-major `rows × cols` coupling.
    pub coupling: Vec<f64>,
    /// Iterations performed: the last checked iteration plus one.
    pub iterations: usize,
    /// True if a check saw the marginal error below the tolerance.
    pub converged: bool,
    /// Every convergence check, in order.
    pub history: Vec<SinkhornIterate>,
    /// Diagnostics of the returned coupling.
    pub diagnostics: Diagnostics,
}

impl SinkhornResult {
    /// Potentials for warm-starting a follow-up solve.
    pub fn warm_start(&self) -> WarmStart {
        WarmStart {
            log_u: self.log_u.clone(),
            log_v: self.log_v.clone(),
        }
    }
}

fn safe_log(x: f64) -> f64 {
    x.max(f64::EPSILON).ln()
}

fn materialize(log_kernel: &[f64], log_u: &[f64], log_v: &[f64], out: &mut [f64]) {
    let cols = log_v.len();
    for (i, lu) in log_u.iter().enumerate() {
        for (j, lv) in log_v.iter().enumerate() {
            let e = (log_kernel[i * cols + j] + lu + lv)
                .clamp(-COUPLING_EXPONENT_LIMIT, COUPLING_EXPONENT_LIMIT);
            out[i * cols + j] = e.exp();
        }
    }
}

fn validate_inputs(
    mu: &[f64],
    nu: &[f64],
    cost: &[f64],
    rows: usize,
    cols: usize,
    config: &SinkhornConfig,
) -> Result<(), SinkhornError> {
    if mu.len() != rows {
        return Err(SinkhornError::DimensionMismatch {
            what: "mu length vs rows",
            expected: rows,
            found: mu.len(),
        });
    }
    if nu.len() != cols {
        return Err(SinkhornError::DimensionMismatch {
            what: "nu length vs cols",
            expected: cols,
            found: nu.len(),
        });
    }
    config.validate()?;
    if rows == 0 {
        return Err(SinkhornError::Empty { what: "mu" });
    }
    if cols == 0 {
        return Err(SinkhornError::Empty { what: "nu" });
    }
    if cost.len() != rows * cols {
        return Err(SinkhornError::DimensionMismatch {
            what: "cost matrix length vs rows × cols",
            expected: rows * cols,
            found: cost.len(),
        });
    }
    if let Some(index) = cost.iter().position(|c| !c.is_finite()) {
        return Err(SinkhornError::NonFiniteCost { index });
    }
    if let Some(warm) = &config.warm_start {
        if warm.log_u.len() != rows {
            return Err(SinkhornError::DimensionMismatch {
                what: "warm-start log_u length vs rows",
                expected: rows,
                found: warm.log_u.len(),
            });
        }
        if warm.log_v.len() != cols {
            return Err(SinkhornError::DimensionMismatch {
                what: "warm-start log_v length vs cols",
                expected: cols,
                found: warm.log_v.len(),
            });
        }
    }
    Ok(())
}

/// Solve the entropic OT problem between `mu` (length `rows`) and `nu`
/// (length `cols`) under a row-major `rows × cols` cost.
///
/// # Errors
///
/// Returns `Err`, before any iteration, if:
/// - `mu.len() != rows` or `nu.len() != cols`
/// - `epsilon`, `tolerance` or `clamp` is not positive and finite
/// - `max_iterations` is zero
/// - either marginal is empty
/// - `cost.len() != rows * cols` or any cost is non-finite
/// - a warm start has the wrong lengths
///
/// # Examples
///
/// ```
/// use cairn_ot::{log_sinkhorn, SinkhornConfig};
///
/// let mu = [0.5, 0.5];
/// let nu = [0.5, 0.5];
/// let cost = [0.0, 1.0, 1.0, 0.0];
/// let r = log_sinkhorn(&mu, &nu, &cost, 2, 2, &SinkhornConfig::new(0.5)).unwrap();
/// assert!(r.converged);
/// let row0 = r.coupling[0] + r.coupling[1];
/// assert!((row0 - 0.5).abs() < 1e-3);
/// ```
pub fn log_sinkhorn(
    mu: &[f64],
    nu: &[f64],
    cost: &[f64],
    rows: usize,
    cols: usize,
    config: &SinkhornConfig,
) -> Result<SinkhornResult, SinkhornError> {
    log_sinkhorn_observed(mu, nu, cost, rows, cols, config, &mut NoopObserver)
}

/// [`log_sinkhorn`] reporting each convergence check to `observer`.
pub fn log_sinkhorn_observed(
    mu: &[f64],
    nu: &[f64],
    cost: &[f64],
    rows: usize,
    cols: usize,
    config: &SinkhornConfig,
    observer: &mut impl IterationObserver,
) -> Result<SinkhornResult, SinkhornError> {
    validate_inputs(mu, nu, cost, rows, cols, config)?;

    let eps = config.epsilon;
    let clamp = config.clamp;
    let check_interval = config.check_interval.max(1);
    let log_kernel: Vec<f64> = cost.iter().map(|c| -c / eps).collect();
    let (mut log_u, mut log_v) = match &config.warm_start {
        Some(w) => (w.log_u.clone(), w.log_v.clone()),
        None => (vec![0.0; rows], vec![0.0; cols]),
    };
    let log_mu: Vec<f64> = mu.iter().copied().map(safe_log).collect();
    let log_nu: Vec<f64> = nu.iter().copied().map(safe_log).collect();

    let mut coupling = vec![0.0; rows * cols];
    let mut diagnostics = Diagnostics::default();
    let mut history = Vec::new();
    let mut converged = false;

    debug!(rows, cols, epsilon = eps, warm = config.warm_start.is_some(), "sinkhorn starting");
    observer.on_start(SOLVER);

    for iter in 0..config.max_iterations {
        for i in 0..rows {
            log_u[i] = log_mu[i] - log_sum_exp_row(&log_kernel, &log_v, i, cols, clamp);
        }
        for j in 0..cols {
            log_v[j] = log_nu[j] - log_sum_exp_col(&log_kernel, &log_u, j, rows, cols, clamp);
        }

        if iter % check_interval != 0 && iter + 1 != config.max_iterations {
            continue;
        }

        materialize(&log_kernel, &log_u, &log_v, &mut coupling);
        diagnostics = diagnostics_of(&DiagnosticInputs {
            coupling: &coupling,
            cost,
            mu,
            nu,
            log_u: &log_u,
            log_v: &log_v,
            epsilon: eps,
        });
        let check = SinkhornIterate {
            iteration: iter,
            marginal_error: diagnostics.marginal_error,
            dual_gap: diagnostics.dual_gap,
        };
        history.push(check);
        observer.on_iteration(&IterationEvent {
            solver: SOLVER,
            iteration: iter,
            metrics: &[
                ("marginal_error", check.marginal_error),
                ("dual_gap", check.dual_gap),
            ],
        });
        debug!(
            iteration = iter,
            marginal_error = check.marginal_error,
            dual_gap = check.dual_gap,
            "sinkhorn check"
        );

        if check.marginal_error < config.tolerance {
            converged = true;
            break;
        }
    }

    // The final iteration is always checked, so `history` is non-empty and
    // `coupling` matches the returned potentials.
    let iterations = history.last().map_or(0, |h| h.iteration + 1);
    observer.on_finish(SOLVER, iterations);
    if converged {
        info!(iterations, marginal_error = diagnostics.marginal_error, "sinkhorn converged");
    } else {
        warn!(
            iterations,
            marginal_error = diagnostics.marginal_error,
            tolerance = config.tolerance,
            "sinkhorn did not converge"
        );
    }

    Ok(SinkhornResult {
        rows,
        cols,
        u: log_u.iter().map(|l| l.exp()).collect(),
        v: log_v.iter().map(|l| l.exp()).collect(),
        log_u,
        log_v,
        coupling,
        iterations,
        converged,
        history,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (vec![0.5, 0.5], vec![0.5, 0.5], vec![0.0, 1.0, 1.0, 0.0])
    }

    // ── Validation ──────────────────────────────────────────────

    #[test]
    fn rejects_non_positive_epsilon() {
        let (mu, nu, c) = two_by_two();
        for eps in [0.0, -1.0, f64::NAN] {
            let err = log_sinkhorn(&mu, &nu, &c, 2, 2, &SinkhornConfig::new(eps)).unwrap_err();
            assert!(matches!(err, SinkhornError::InvalidParameter { name: "epsilon", .. }));
        }
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let (mu, nu, c) = two_by_two();
        let config = SinkhornConfig::new(0.5);
        assert!(matches!(
            log_sinkhorn(&mu, &nu, &c, 3, 2, &config),
            Err(SinkhornError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            log_sinkhorn(&mu, &nu, &c, 2, 1, &config),
            Err(SinkhornError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            log_sinkhorn(&mu, &nu, &c[..3], 2, 2, &config),
            Err(SinkhornError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_cost_and_empty_input() {
        let (mu, nu, _) = two_by_two();
        let config = SinkhornConfig::new(0.5);
        let bad = [0.0, f64::INFINITY, 1.0, 0.0];
        assert_eq!(
            log_sinkhorn(&mu, &nu, &bad, 2, 2, &config),
            Err(SinkhornError::NonFiniteCost { index: 1 })
        );
        assert_eq!(
            log_sinkhorn(&[], &nu, &[], 0, 2, &config),
            Err(SinkhornError::Empty { what: "mu" })
        );
    }

    #[test]
    fn rejects_bad_warm_start() {
        let (mu, nu, c) = two_by_two();
        let config = SinkhornConfig {
            warm_start: Some(WarmStart {
                log_u: vec![0.0],
                log_v: vec![0.0, 0.0],
            }),
            ..SinkhornConfig::new(0.5)
        };
        assert!(log_sinkhorn(&mu, &nu, &c, 2, 2, &config).is_err());
    }

    // ── Convergence ─────────────────────────────────────────────

    #[test]
    fn two_by_two_example() {
        let (mu, nu, c) = two_by_two();
        let r = log_sinkhorn(&mu, &nu, &c, 2, 2, &SinkhornConfig::new(0.5)).unwrap();
        assert!(r.converged);
        for i in 0..2 {
            let row = r.coupling[i * 2] + r.coupling[i * 2 + 1];
            let col = r.coupling[i] + r.coupling[2 + i];
            assert!((row - 0.5).abs() < 1e-3);
            assert!((col - 0.5).abs() < 1e-3);
        }
        // Cheaper diagonal carries more mass.
        assert!(r.coupling[0] > r.coupling[1]);
    }

    #[test]
    fn check_schedule_and_iteration_count() {
        // Unequal masses never balance, so every scheduled check runs.
        let mu = [0.5, 0.5];
        let nu = [1.0, 1.0];
        let c = [0.0, 1.0, 1.0, 0.0];
        let config = SinkhornConfig {
            max_iterations: 25,
            check_interval: 10,
            ..SinkhornConfig::new(0.5)
        };
        let r = log_sinkhorn(&mu, &nu, &c, 2, 2, &config).unwrap();
        let checked: Vec<usize> = r.history.iter().map(|h| h.iteration).collect();
        assert_eq!(checked, vec![0, 10, 20, 24]);
        assert_eq!(r.iterations, 25);
        assert!(!r.converged);
    }

    #[test]
    fn converging_on_first_check_counts_one_iteration() {
        // Balanced marginals on a constant cost are solved after one sweep.
        let mu = [0.25, 0.75];
        let nu = [0.5, 0.5];
        let c = [1.0; 4];
        let r = log_sinkhorn(&mu, &nu, &c, 2, 2, &SinkhornConfig::new(1.0)).unwrap();
        assert!(r.converged);
        assert_eq!(r.iterations, 1);
        assert_eq!(r.history.len(), 1);
    }

    #[test]
    fn potentials_and_scalings_agree() {
        let (mu, nu, c) = two_by_two();
        let r = log_sinkhorn(&mu, &nu, &c, 2, 2, &SinkhornConfig::new(0.5)).unwrap();
        for (u, lu) in r.u.iter().zip(&r.log_u) {
            assert!((u - lu.exp()).abs() < 1e-15);
        }
        assert_eq!(r.warm_start().log_v, r.log_v);
    }

    #[test]
    fn tiny_epsilon_stays_finite() {
        let mu = [0.5, 0.5];
        let nu = [0.5, 0.5];
        let c = [0.0, 50.0, 50.0, 0.0];
        let r = log_sinkhorn(&mu, &nu, &c, 2, 2, &SinkhornConfig::new(1e-3)).unwrap();
        assert!(r.coupling.iter().all(|p| p.is_finite()));
        assert!(r.log_u.iter().chain(&r.log_v).all(|l| l.is_finite()));
    }

    #[test]
    fn config_from_json_uses_defaults() {
        let c = SinkhornConfig::from_json(r#"{"epsilon": 0.2, "checkInterval": 5}"#).unwrap();
        assert_eq!(c.epsilon, 0.2);
        assert_eq!(c.check_interval, 5);
        assert_eq!(c.max_iterations, 500);
        assert_eq!(c.clamp, 80.0);
        assert!(c.warm_start.is_none());
    }
}
