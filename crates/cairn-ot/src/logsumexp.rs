//! Stable log-sum-exp reductions over a row-major log kernel.
//!
//! Each reduction subtracts the running maximum before exponentiating and
//! floors the shifted exponent at `−clamp`, so the result is finite
//! whenever the inputs are.

/// `log Σ exp(xᵢ)` for an arbitrary slice; `−∞` for an empty slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

#[inline]
fn shifted_exp(x: f64, max: f64, clamp: f64) -> f64 {
    (x - max).clamp(-clamp, clamp).exp()
}

/// `log Σ_j exp(log_kernel[row, j] + log_v[j])`.
pub fn log_sum_exp_row(log_kernel: &[f64], log_v: &[f64], row: usize, cols: usize, clamp: f64) -> f64 {
    let base = row * cols;
    let terms = &log_kernel[base..base + cols];
    let max = terms
        .iter()
        .zip(log_v)
        .map(|(k, v)| k + v)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = terms
        .iter()
        .zip(log_v)
        .map(|(k, v)| shifted_exp(k + v, max, clamp))
        .sum();
    max + sum.ln()
}

/// `log Σ_i exp(log_kernel[i, col] + log_u[i])`.
pub fn log_sum_exp_col(
    log_kernel: &[f64],
    log_u: &[f64],
    col: usize,
    rows: usize,
    cols: usize,
    clamp: f64,
) -> f64 {
    let term = |i: usize| log_kernel[i * cols + col] + log_u[i];
    let max = (0..rows).map(term).fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = (0..rows).map(|i| shifted_exp(term(i), max, clamp)).sum();
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_naive_for_small_values() {
        let xs = [0.1, -0.5, 1.2];
        let naive = xs.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&xs) - naive).abs() < 1e-12);
    }

    #[test]
    fn survives_huge_magnitudes() {
        assert!((log_sum_exp(&[1000.0, 1000.0]) - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert!((log_sum_exp(&[-1000.0]) + 1000.0).abs() < 1e-9);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn row_and_column_agree_on_symmetric_kernel() {
        // 2×2 kernel [[0, -1], [-1, 0]].
        let k = [0.0, -1.0, -1.0, 0.0];
        let zeros = [0.0, 0.0];
        let r = log_sum_exp_row(&k, &zeros, 1, 2, 80.0);
        let c = log_sum_exp_col(&k, &zeros, 1, 2, 2, 80.0);
        assert!((r - c).abs() < 1e-15);
        assert!((r - (1.0 + (-1f64).exp()).ln()).abs() < 1e-12);
    }

    #[test]
    fn clamp_floors_negligible_terms() {
        // With clamp 1 the -5 term counts as e^-1.
        let k = [0.0, -5.0];
        let lse = log_sum_exp_row(&k, &[0.0, 0.0], 0, 2, 1.0);
        assert!((lse - (1.0 + (-1f64).exp()).ln()).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn lse_bounds(xs in prop::collection::vec(-50.0f64..50.0, 1..20)) {
            let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = log_sum_exp(&xs);
            prop_assert!(lse >= max - 1e-12);
            prop_assert!(lse <= max + (xs.len() as f64).ln() + 1e-12);
        }
    }
}
