//! Standard grids, problems and distributions shared across crate tests.

use cairn_core::Grid;

/// Square `n × n` grid covering `[-half_width, half_width]²`, cell centres
/// on both edges.
pub fn centered_grid(n: usize, half_width: f64) -> Grid {
    let h = if n > 1 {
        2.0 * half_width / (n - 1) as f64
    } else {
        1.0
    };
    Grid::new(&[n, n], &[h, h], &[-half_width, -half_width])
        .unwrap_or_else(|e| panic!("fixture grid {n}x{n}: {e}"))
}

/// 1-D grid with `n` cells covering `[lo, hi]`.
pub fn line_grid(n: usize, lo: f64, hi: f64) -> Grid {
    let h = if n > 1 { (hi - lo) / (n - 1) as f64 } else { 1.0 };
    Grid::new(&[n], &[h], &[lo]).unwrap_or_else(|e| panic!("fixture line {n}: {e}"))
}

/// Uniform probability vector of length `n`.
pub fn uniform(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Discretized Gaussian bump over `n` evenly spaced points in `[0, 1]`,
/// normalized to sum to one.
pub fn gaussian_bump(n: usize, mean: f64, sd: f64) -> Vec<f64> {
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            let x = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            (-0.5 * ((x - mean) / sd).powi(2)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|v| v / total).collect()
}

/// Evenly spaced points of `[0, 1]`, one per row (`n × 1`, flattened).
pub fn unit_line(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 })
        .collect()
}

/// Squared-distance cost between two 1-D point sets, row-major.
pub fn squared_distance_cost(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    xs.iter()
        .flat_map(|&x| ys.iter().map(move |&y| (x - y) * (x - y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_grid_is_symmetric() {
        let g = centered_grid(5, 1.0);
        assert_eq!(g.size(), 25);
        assert_eq!(g.origin(), &[-1.0, -1.0]);
        let last = g.position_from_coords(&[4, 4]).unwrap();
        assert!((last[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bump_is_normalized() {
        let b = gaussian_bump(20, 0.3, 0.1);
        assert!((b.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cost_layout() {
        let c = squared_distance_cost(&[0.0, 1.0], &[0.0, 2.0, 3.0]);
        assert_eq!(c, vec![0.0, 4.0, 9.0, 1.0, 1.0, 4.0]);
    }
}
