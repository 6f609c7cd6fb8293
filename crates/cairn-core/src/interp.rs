//! Multilinear interpolation of grid-resident fields.
//!
//! A query position is converted to fractional index coordinates, folded
//! onto the grid by the [`Boundary`] policy, and blended from the `2^d`
//! surrounding cells with multilinear weights.

use crate::boundary::Boundary;
use crate::error::GridError;
use crate::grid::Grid;
use smallvec::SmallVec;

/// A field buffer paired with the grid it lives on.
///
/// Construction checks the buffer length once so repeated sampling in
/// solver hot loops only has to check the query dimensionality.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    grid: &'a Grid,
    values: &'a [f64],
}

impl<'a> FieldView<'a> {
    /// Pair `values` with `grid`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `values.len() != grid.size()`.
    pub fn new(grid: &'a Grid, values: &'a [f64]) -> Result<Self, GridError> {
        grid.check_field_len(values.len())?;
        Ok(Self { grid, values })
    }

    /// The underlying grid.
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// The underlying values.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Sample the field at an arbitrary physical position.
    pub fn sample(&self, position: &[f64], boundary: Boundary) -> Result<f64, GridError> {
        self.grid.check_position(position)?;
        let ndim = self.grid.ndim();
        let shape = self.grid.shape();
        let strides = self.grid.strides();

        // Per axis: (lower index, upper index, upper weight).
        let mut axes: SmallVec<[(usize, usize, f64); 4]> = SmallVec::with_capacity(ndim);
        for d in 0..ndim {
            let n = shape[d];
            let frac = (position[d] - self.grid.origin()[d]) / self.grid.spacing()[d];
            let folded = boundary.fold(frac, n);
            let base = folded.floor();
            let t = folded - base;
            let lo = boundary.resolve(base as i64, n);
            let hi = boundary.resolve(base as i64 + 1, n);
            axes.push((lo * strides[d], hi * strides[d], t));
        }

        let mut acc = 0.0;
        for corner in 0..(1usize << ndim) {
            let mut weight = 1.0;
            let mut index = 0usize;
            for (d, &(lo, hi, t)) in axes.iter().enumerate() {
                if corner & (1 << d) != 0 {
                    weight *= t;
                    index += hi;
                } else {
                    weight *= 1.0 - t;
                    index += lo;
                }
            }
            if weight != 0.0 {
                acc += weight * self.values[index];
            }
        }
        Ok(acc)
    }
}

/// Sample `values` (one per cell of `grid`) at `position`.
///
/// Convenience wrapper over [`FieldView::sample`] for one-off queries.
///
/// # Examples
///
/// ```
/// use cairn_core::{interpolate, Boundary, Grid};
///
/// let grid = Grid::unit(&[2]).unwrap();
/// let v = interpolate(&grid, &[0.0, 10.0], &[0.25], Boundary::Clamp).unwrap();
/// assert!((v - 2.5).abs() < 1e-12);
/// ```
pub fn interpolate(
    grid: &Grid,
    values: &[f64],
    position: &[f64],
    boundary: Boundary,
) -> Result<f64, GridError> {
    FieldView::new(grid, values)?.sample(position, boundary)
}
