//! Distances between grid densities.
//!
//! [`kl_divergence`] and [`entropy`] act on histograms normalized to unit
//! sum with every bin floored at [`PROBABILITY_FLOOR`], so empty bins
//! never produce `log 0`. [`mmd_rbf`] is the Gaussian-kernel maximum mean
//! discrepancy between two densities whose support is the grid nodes.

use crate::error::SdeError;
use crate::kde::check_planar;
use cairn_core::Grid;
use serde::{Deserialize, Serialize};

/// Smallest probability any bin is given.
pub const PROBABILITY_FLOOR: f64 = 1e-12;

/// Default RBF kernel width for [`compare_densities`].
pub const DEFAULT_MMD_BANDWIDTH: f64 = 0.5;

/// Unit-sum copy of `p`; negative and non-finite bins count as empty.
fn to_probabilities(p: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = p
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect();
    let sum: f64 = clean.iter().sum();
    if sum > 0.0 {
        clean.into_iter().map(|v| v / sum).collect()
    } else {
        clean
    }
}

fn floored(p: &[f64]) -> Vec<f64> {
    to_probabilities(p)
        .into_iter()
        .map(|v| v.max(PROBABILITY_FLOOR))
        .collect()
}

fn check_same_len(p: &[f64], q: &[f64]) -> Result<(), SdeError> {
    if p.len() != q.len() {
        return Err(SdeError::DimensionMismatch {
            what: "density lengths",
            expected: p.len(),
            found: q.len(),
        });
    }
    Ok(())
}

/// `KL(p ‖ q) = Σ p log(p / q)`.
///
/// # Errors
///
/// Returns `Err` if the inputs differ in length.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64, SdeError> {
    check_same_len(p, q)?;
    let (p, q) = (floored(p), floored(q));
    Ok(p.iter().zip(&q).map(|(a, b)| a * (a / b).ln()).sum())
}

/// Shannon entropy `−Σ p log p` in nats.
pub fn entropy(p: &[f64]) -> f64 {
    -floored(p).iter().map(|a| a * a.ln()).sum::<f64>()
}

/// Kernel matrix `exp(−(a − b)² / 2h²)` over the nodes of one axis.
fn axis_kernel(n: usize, spacing: f64, bandwidth: f64) -> Vec<f64> {
    let inv = 1.0 / (2.0 * bandwidth * bandwidth);
    let mut k = vec![0.0; n * n];
    for a in 0..n {
        for b in 0..n {
            let d = (a as f64 - b as f64) * spacing;
            k[a * n + b] = (-(d * d) * inv).exp();
        }
    }
    k
}

/// `MMD(p, q)` under the kernel `exp(−‖x − y‖² / 2h²)`.
///
/// Both densities are normalized to unit mass first. The planar kernel
/// factors per axis, so the quadratic form `(p − q)ᵀ K (p − q)` costs
/// `O(nx·ny·(nx + ny))`.
///
/// # Errors
///
/// Returns `Err` if the grid is not 2-D, a density has the wrong length,
/// or `bandwidth` is not finite and positive.
pub fn mmd_rbf(grid: &Grid, p: &[f64], q: &[f64], bandwidth: f64) -> Result<f64, SdeError> {
    check_planar(grid)?;
    grid.check_field_len(p.len())?;
    grid.check_field_len(q.len())?;
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Err(SdeError::invalid(
            "bandwidth",
            format!("must be finite and > 0, got {bandwidth}"),
        ));
    }
    let (nx, ny) = (grid.shape()[0], grid.shape()[1]);
    let diff: Vec<f64> = to_probabilities(p)
        .iter()
        .zip(to_probabilities(q))
        .map(|(a, b)| a - b)
        .collect();
    let kx = axis_kernel(nx, grid.spacing()[0], bandwidth);
    let ky = axis_kernel(ny, grid.spacing()[1], bandwidth);

    // m = Kx · D, then form Σ D ∘ (m · Ky).
    let mut m = vec![0.0; nx * ny];
    for a in 0..nx {
        for b in 0..nx {
            let w = kx[a * nx + b];
            for j in 0..ny {
                m[a * ny + j] += w * diff[b * ny + j];
            }
        }
    }
    let mut total = 0.0;
    for i in 0..nx {
        for j in 0..ny {
            let mk: f64 = (0..ny).map(|l| m[i * ny + l] * ky[l * ny + j]).sum();
            total += diff[i * ny + j] * mk;
        }
    }
    Ok(total.max(0.0).sqrt())
}

/// Per-frame comparison of two aligned density series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityComparison {
    /// `KL(a_k ‖ b_k)`.
    pub kl: Vec<f64>,
    /// `MMD(a_k, b_k)`.
    pub mmd: Vec<f64>,
    /// Entropy of each `a_k`.
    pub entropy_a: Vec<f64>,
    /// Entropy of each `b_k`.
    pub entropy_b: Vec<f64>,
}

/// Compare the first `min(a.len(), b.len())` frames of two series.
///
/// Typical use pairs [`SdeResult::densities`](crate::SdeResult) with
/// [`FpResult::densities`](crate::FpResult) recorded on the same grid
/// and cadence.
pub fn compare_densities(
    grid: &Grid,
    a: &[Vec<f64>],
    b: &[Vec<f64>],
) -> Result<DensityComparison, SdeError> {
    let count = a.len().min(b.len());
    let mut out = DensityComparison::default();
    for (p, q) in a.iter().zip(b).take(count) {
        out.kl.push(kl_divergence(p, q)?);
        out.mmd.push(mmd_rbf(grid, p, q, DEFAULT_MMD_BANDWIDTH)?);
        out.entropy_a.push(entropy(p));
        out.entropy_b.push(entropy(q));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kde::density_grid;
    use proptest::prelude::*;

    fn bump(grid: &Grid, cx: f64, cy: f64) -> Vec<f64> {
        grid.cells()
            .map(|c| (-((c.position[0] - cx).powi(2) + (c.position[1] - cy).powi(2)) / 0.5).exp())
            .collect()
    }

    #[test]
    fn kl_of_identical_is_zero() {
        let p = [0.1, 0.4, 0.5];
        assert!(kl_divergence(&p, &p).unwrap().abs() < 1e-15);
        // Scale does not matter.
        let q = [0.2, 0.8, 1.0];
        assert!(kl_divergence(&p, &q).unwrap().abs() < 1e-15);
    }

    #[test]
    fn kl_floor_keeps_it_finite() {
        let kl = kl_divergence(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(kl.is_finite());
        assert!(kl > 20.0);
    }

    #[test]
    fn kl_rejects_mismatch() {
        assert!(kl_divergence(&[1.0], &[0.5, 0.5]).is_err());
    }

    #[test]
    fn entropy_of_uniform_is_log_n() {
        let h = entropy(&[2.0; 8]);
        assert!((h - 8.0f64.ln()).abs() < 1e-12);
        assert!(entropy(&[1.0, 0.0, 0.0]).abs() < 1e-9);
    }

    #[test]
    fn mmd_grows_with_separation() {
        let g = density_grid(24, 24, 2.5).unwrap();
        let base = bump(&g, 0.0, 0.0);
        let near = mmd_rbf(&g, &base, &bump(&g, 0.3, 0.0), 0.5).unwrap();
        let far = mmd_rbf(&g, &base, &bump(&g, 1.5, 0.0), 0.5).unwrap();
        assert_eq!(mmd_rbf(&g, &base, &base, 0.5).unwrap(), 0.0);
        assert!(near > 0.0);
        assert!(far > near);
    }

    #[test]
    fn comparison_aligns_to_shorter_series() {
        let g = density_grid(8, 8, 1.0).unwrap();
        let a = vec![bump(&g, 0.0, 0.0); 3];
        let b = vec![bump(&g, 0.2, 0.0); 2];
        let c = compare_densities(&g, &a, &b).unwrap();
        assert_eq!(c.kl.len(), 2);
        assert_eq!(c.mmd.len(), 2);
        assert_eq!(c.entropy_a.len(), 2);
        assert!(c.kl.iter().all(|&v| v > 0.0));
    }

    proptest! {
        #[test]
        fn kl_is_non_negative(
            p in prop::collection::vec(0.0f64..10.0, 6),
            q in prop::collection::vec(0.0f64..10.0, 6),
        ) {
            prop_assert!(kl_divergence(&p, &q).unwrap() >= -1e-9);
        }

        #[test]
        fn mmd_is_symmetric(
            p in prop::collection::vec(0.0f64..1.0, 16),
            q in prop::collection::vec(0.0f64..1.0, 16),
        ) {
            let g = density_grid(4, 4, 1.0).unwrap();
            let a = mmd_rbf(&g, &p, &q, 0.7).unwrap();
            let b = mmd_rbf(&g, &q, &p, 0.7).unwrap();
            prop_assert!((a - b).abs() < 1e-9);
        }
    }
}
