//! Kernel density estimates of particle clouds on a 2-D grid.
//!
//! Particles are first deposited onto the grid with cloud-in-cell
//! (bilinear) weights, then the histogram is blurred by a separable
//! Gaussian truncated at [`KERNEL_RADIUS`] bandwidths. The result is a
//! density: `Σ density·cell_volume = 1` whenever any particle lands on
//! the grid, and all zeros otherwise.

use crate::error::SdeError;
use cairn_core::Grid;

/// Kernel truncation radius in bandwidths.
pub const KERNEL_RADIUS: f64 = 3.0;

/// A square `[-domain, domain]²` grid of `width × height` nodes.
///
/// Axis 0 is `x`, axis 1 is `y`; both end nodes sit on the domain edge.
///
/// # Errors
///
/// Returns `Err` if either side has fewer than two nodes or `domain` is
/// not positive.
pub fn density_grid(width: usize, height: usize, domain: f64) -> Result<Grid, SdeError> {
    if width < 2 || height < 2 {
        return Err(SdeError::invalid(
            "grid",
            format!("density grids need at least 2×2 nodes, got {width}×{height}"),
        ));
    }
    if !domain.is_finite() || domain <= 0.0 {
        return Err(SdeError::invalid(
            "domain",
            format!("must be finite and > 0, got {domain}"),
        ));
    }
    let dx = 2.0 * domain / (width - 1) as f64;
    let dy = 2.0 * domain / (height - 1) as f64;
    Ok(Grid::new(&[width, height], &[dx, dy], &[-domain, -domain])?)
}

pub(crate) fn check_planar(grid: &Grid) -> Result<(), SdeError> {
    if grid.ndim() != 2 {
        return Err(SdeError::DimensionMismatch {
            what: "density grid axes",
            expected: 2,
            found: grid.ndim(),
        });
    }
    Ok(())
}

/// Silverman's rule for a planar cloud: `σ̂·n^(−1/6)`, where `σ̂` is the
/// mean of the per-axis standard deviations.
///
/// Non-finite particles are ignored. Returns 0 for fewer than two
/// particles or a cloud with no spread.
pub fn silverman_bandwidth(positions: &[f32]) -> f64 {
    let mut n = 0usize;
    let mut sum = [0.0f64; 2];
    let mut sum_sq = [0.0f64; 2];
    for p in positions.chunks_exact(2) {
        let (x, y) = (f64::from(p[0]), f64::from(p[1]));
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        n += 1;
        sum[0] += x;
        sum[1] += y;
        sum_sq[0] += x * x;
        sum_sq[1] += y * y;
    }
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let spread: f64 = (0..2)
        .map(|d| {
            let mean = sum[d] / nf;
            ((sum_sq[d] - nf * mean * mean) / (nf - 1.0)).max(0.0).sqrt()
        })
        .sum::<f64>()
        / 2.0;
    spread * nf.powf(-1.0 / 6.0)
}

/// Density of `positions` (flattened `x, y` pairs) on `grid`.
///
/// `bandwidth` defaults to [`silverman_bandwidth`]. A zero bandwidth
/// skips the blur and returns the normalized cloud-in-cell histogram.
///
/// # Errors
///
/// Returns `Err` if the grid is not 2-D, `positions` has odd length, or
/// `bandwidth` is negative or non-finite.
pub fn kde_density(
    grid: &Grid,
    positions: &[f32],
    bandwidth: Option<f64>,
) -> Result<Vec<f64>, SdeError> {
    check_planar(grid)?;
    if positions.len() % 2 != 0 {
        return Err(SdeError::DimensionMismatch {
            what: "particle buffer (x, y pairs)",
            expected: positions.len() + 1,
            found: positions.len(),
        });
    }
    let h = match bandwidth {
        Some(h) if !h.is_finite() || h < 0.0 => {
            return Err(SdeError::invalid(
                "bandwidth",
                format!("must be finite and >= 0, got {h}"),
            ));
        }
        Some(h) => h,
        None => silverman_bandwidth(positions),
    };

    let mut density = deposit(grid, positions);
    for axis in 0..2 {
        let cells = h / grid.spacing()[axis];
        if cells > 1e-6 {
            blur_axis(grid, &mut density, axis, &gaussian_kernel(cells, grid.shape()[axis]));
        }
    }

    let total: f64 = density.iter().sum();
    if total > 0.0 {
        let scale = 1.0 / (total * grid.cell_volume());
        for d in &mut density {
            *d *= scale;
        }
    }
    Ok(density)
}

/// Bilinear cloud-in-cell histogram; particles outside the grid keep only
/// the share of weight that falls on in-range nodes.
fn deposit(grid: &Grid, positions: &[f32]) -> Vec<f64> {
    let (nx, ny) = (grid.shape()[0], grid.shape()[1]);
    let mut hist = vec![0.0; grid.size()];
    for p in positions.chunks_exact(2) {
        let fx = (f64::from(p[0]) - grid.origin()[0]) / grid.spacing()[0];
        let fy = (f64::from(p[1]) - grid.origin()[1]) / grid.spacing()[1];
        if !fx.is_finite() || !fy.is_finite() {
            continue;
        }
        let (i0, j0) = (fx.floor(), fy.floor());
        let (wx, wy) = (fx - i0, fy - j0);
        for (di, wi) in [(0i64, 1.0 - wx), (1, wx)] {
            let i = i0 as i64 + di;
            if i < 0 || i >= nx as i64 || wi == 0.0 {
                continue;
            }
            for (dj, wj) in [(0i64, 1.0 - wy), (1, wy)] {
                let j = j0 as i64 + dj;
                if j < 0 || j >= ny as i64 || wj == 0.0 {
                    continue;
                }
                hist[i as usize * ny + j as usize] += wi * wj;
            }
        }
    }
    hist
}

/// Normalized taps `k[r]` for offsets `r = -R..=R`.
fn gaussian_kernel(sigma_cells: f64, len: usize) -> Vec<f64> {
    let radius = ((KERNEL_RADIUS * sigma_cells).ceil() as usize).min(len);
    let mut taps: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let r = k as f64 - radius as f64;
            (-(r * r) / (2.0 * sigma_cells * sigma_cells)).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// Convolve along `axis` with zero padding.
fn blur_axis(grid: &Grid, field: &mut [f64], axis: usize, taps: &[f64]) {
    let len = grid.shape()[axis] as i64;
    let stride = grid.strides()[axis];
    let radius = (taps.len() / 2) as i64;
    let source = field.to_vec();
    for (idx, out) in field.iter_mut().enumerate() {
        let pos = ((idx / stride) as i64) % len;
        let base = idx - pos as usize * stride;
        let mut acc = 0.0;
        for (k, w) in taps.iter().enumerate() {
            let q = pos + k as i64 - radius;
            if q >= 0 && q < len {
                acc += w * source[base + q as usize * stride];
            }
        }
        *out = acc;
    }
}
