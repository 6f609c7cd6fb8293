//! Godunov upwind gradient of a grid field.

use cairn_core::{Boundary, Grid, GridError, Point};

/// Godunov selection between a backward difference `dm` and a forward
/// difference `dp` along one axis.
fn godunov(dm: f64, dp: f64) -> f64 {
    if dm >= 0.0 && dp >= 0.0 {
        dm
    } else if dm <= 0.0 && dp <= 0.0 {
        dp
    } else if dm < 0.0 && dp > 0.0 {
        // Local minimum along this axis.
        0.0
    } else if dm.abs() >= dp.abs() {
        dm
    } else {
        dp
    }
}

/// Upwind gradient of `values` at cell `coords`.
///
/// Neighbours outside the grid are resolved by `boundary`: under
/// [`Boundary::Clamp`] the edge cell is its own neighbour (zero one-sided
/// difference), under [`Boundary::Wrap`] the opposite edge is used.
///
/// # Errors
///
/// Returns `Err` if `values` does not match the grid size or `coords` is
/// out of range.
pub fn godunov_gradient(
    grid: &Grid,
    values: &[f64],
    coords: &[usize],
    boundary: Boundary,
) -> Result<Point, GridError> {
    grid.check_field_len(values.len())?;
    let centre = grid.index_from_coords(coords)?;
    let v = values[centre];
    let strides = grid.strides();

    let gradient = (0..grid.ndim())
        .map(|d| {
            let n = grid.shape()[d];
            let c = coords[d] as i64;
            let at = |k: usize| values[centre - coords[d] * strides[d] + k * strides[d]];
            let minus = at(boundary.resolve(c - 1, n));
            let plus = at(boundary.resolve(c + 1, n));
            let h = grid.spacing()[d];
            godunov((v - minus) / h, (plus - v) / h)
        })
        .collect();
    Ok(gradient)
}
