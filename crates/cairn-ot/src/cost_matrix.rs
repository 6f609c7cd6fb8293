//! Pairwise cost matrices between two point clouds.

use crate::error::SinkhornError;
use serde::{Deserialize, Serialize};

/// Ground metric between points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `‖x − y‖²`. Also accepted as `l2` or `sqeuclidean`.
    #[default]
    #[serde(alias = "l2", alias = "sqeuclidean")]
    SquaredEuclidean,
    /// `‖x − y‖`.
    Euclidean,
    /// `1 − cos∠(x, y)`; a zero vector has cosine 0 with everything.
    Cosine,
}

impl Metric {
    /// Cost between two points of equal dimension.
    pub fn cost(self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            Self::SquaredEuclidean => squared_distance(x, y),
            Self::Euclidean => squared_distance(x, y).sqrt(),
            Self::Cosine => {
                let dot: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
                let nx = x.iter().map(|a| a * a).sum::<f64>().sqrt();
                let ny = y.iter().map(|b| b * b).sum::<f64>().sqrt();
                if nx == 0.0 || ny == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (nx * ny)
                }
            }
        }
    }
}

fn squared_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// A row-major cost matrix with its shape.
#[derive(Clone, Debug, PartialEq)]
pub struct CostMatrix {
    /// `rows × cols` entries.
    pub matrix: Vec<f64>,
    /// Number of source points.
    pub rows: usize,
    /// Number of target points.
    pub cols: usize,
}

/// Costs between every source point and every target point.
///
/// `xs` and `ys` hold points of dimension `dim`, flattened row-major. With
/// `normalize`, every entry is divided by the largest one (when that is
/// positive), so costs lie in `[0, 1]`.
///
/// # Errors
///
/// Returns `Err` if `dim` is zero, either cloud's length is not a multiple
/// of `dim`, or either cloud is empty.
pub fn cost_matrix(
    xs: &[f64],
    ys: &[f64],
    dim: usize,
    metric: Metric,
    normalize: bool,
) -> Result<CostMatrix, SinkhornError> {
    if dim == 0 {
        return Err(SinkhornError::invalid("dim", "must be at least 1"));
    }
    for (what, cloud) in [("source points", xs), ("target points", ys)] {
        if cloud.is_empty() {
            return Err(SinkhornError::Empty { what });
        }
        if cloud.len() % dim != 0 {
            return Err(SinkhornError::invalid(
                "dim",
                format!("{what}: {} coordinates is not a multiple of {dim}", cloud.len()),
            ));
        }
    }

    let rows = xs.len() / dim;
    let cols = ys.len() / dim;
    let mut matrix = Vec::with_capacity(rows * cols);
    for x in xs.chunks_exact(dim) {
        for y in ys.chunks_exact(dim) {
            matrix.push(metric.cost(x, y));
        }
    }
    if normalize {
        let max = matrix.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            for c in &mut matrix {
                *c /= max;
            }
        }
    }
    Ok(CostMatrix { matrix, rows, cols })
}
