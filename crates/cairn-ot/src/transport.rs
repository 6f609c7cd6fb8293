//! Transport maps and displacement interpolation from a coupling.

use crate::error::SinkhornError;
use serde::{Deserialize, Serialize};

/// Interpolation times used when the caller does not choose any.
pub const DEFAULT_FRAME_TIMES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Source points displaced a fraction `t` of the way along the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointFrame {
    /// Interpolation time in `[0, 1]`.
    pub t: f64,
    /// Points flattened row-major, same layout as the source cloud.
    pub points: Vec<f64>,
}

fn check_coupling(coupling: &[f64], rows: usize, cols: usize) -> Result<(), SinkhornError> {
    if coupling.len() != rows * cols {
        return Err(SinkhornError::DimensionMismatch {
            what: "coupling length vs rows × cols",
            expected: rows * cols,
            found: coupling.len(),
        });
    }
    Ok(())
}

/// Barycentric projection `T(xᵢ) = Σⱼ πᵢⱼ yⱼ / Σⱼ πᵢⱼ`.
///
/// `ys` holds `cols` target points of dimension `dim`, flattened. A row
/// with no mass maps to the unweighted mean of the targets.
///
/// # Errors
///
/// Returns `Err` if `dim` is zero or the coupling or target cloud does
/// not match the stated shape.
pub fn barycentric_map(
    coupling: &[f64],
    rows: usize,
    cols: usize,
    ys: &[f64],
    dim: usize,
) -> Result<Vec<f64>, SinkhornError> {
    check_coupling(coupling, rows, cols)?;
    if dim == 0 {
        return Err(SinkhornError::invalid("dim", "must be at least 1"));
    }
    if ys.len() != cols * dim {
        return Err(SinkhornError::DimensionMismatch {
            what: "target points vs cols × dim",
            expected: cols * dim,
            found: ys.len(),
        });
    }

    let mut out = vec![0.0; rows * dim];
    for (i, target) in out.chunks_exact_mut(dim).enumerate() {
        let row = &coupling[i * cols..(i + 1) * cols];
        let mass: f64 = row.iter().sum();
        for (j, y) in ys.chunks_exact(dim).enumerate() {
            let w = if mass > 0.0 {
                row[j] / mass
            } else {
                1.0 / cols as f64
            };
            for (t, yk) in target.iter_mut().zip(y) {
                *t += w * yk;
            }
        }
    }
    Ok(out)
}

/// Displacement-interpolation frames `xᵢ(t) = (1 − t)xᵢ + t·T(xᵢ)`.
///
/// # Errors
///
/// Returns `Err` if `xs` and `mapped` differ in length or a time lies
/// outside `[0, 1]`.
pub fn interpolate_frames(
    xs: &[f64],
    mapped: &[f64],
    times: &[f64],
) -> Result<Vec<PointFrame>, SinkhornError> {
    if xs.len() != mapped.len() {
        return Err(SinkhornError::DimensionMismatch {
            what: "mapped points vs source points",
            expected: xs.len(),
            found: mapped.len(),
        });
    }
    times
        .iter()
        .map(|&t| {
            if !(0.0..=1.0).contains(&t) {
                return Err(SinkhornError::invalid(
                    "times",
                    format!("must lie in [0, 1], got {t}"),
                ));
            }
            let points = xs
                .iter()
                .zip(mapped)
                .map(|(x, y)| (1.0 - t) * x + t * y)
                .collect();
            Ok(PointFrame { t, points })
        })
        .collect()
}
