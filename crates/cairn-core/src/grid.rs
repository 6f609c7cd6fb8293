//! Rectangular grids with row-major linear indexing.
//!
//! A [`Grid`] discretizes an axis-aligned box: cell `coords` sits at the
//! physical position `origin + coords ⊙ spacing`. Linear indices run
//! row-major (the last axis varies fastest), so iterating `0..size` and
//! iterating [`Grid::cells`] visit cells in the same order.

use crate::boundary::Boundary;
use crate::error::GridError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Integer cell coordinates, one entry per axis.
pub type Coords = SmallVec<[usize; 4]>;

/// A physical position (or any small real vector), one entry per axis.
pub type Point = SmallVec<[f64; 4]>;

/// Serializable grid description, validated into a [`Grid`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of cells per axis.
    pub shape: Vec<usize>,
    /// Physical distance between adjacent cell centres per axis.
    pub spacing: Vec<f64>,
    /// Physical position of cell `[0, 0, ...]`.
    pub origin: Vec<f64>,
}

/// A validated rectangular grid.
///
/// # Examples
///
/// ```
/// use cairn_core::Grid;
///
/// let grid = Grid::new(&[2, 3], &[0.5, 1.0], &[-1.0, 0.0]).unwrap();
/// assert_eq!(grid.size(), 6);
/// assert_eq!(grid.index_from_coords(&[1, 2]).unwrap(), 5);
/// let p = grid.position_from_coords(&[1, 2]).unwrap();
/// assert_eq!(p.as_slice(), &[-0.5, 2.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSpec", into = "GridSpec")]
pub struct Grid {
    shape: Vec<usize>,
    spacing: Vec<f64>,
    origin: Vec<f64>,
    strides: Vec<usize>,
    size: usize,
}

impl Grid {
    /// Create a grid, validating every axis.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `shape` is empty or any `shape[d] == 0`
    /// - `spacing` or `origin` length differs from `shape`
    /// - any spacing is non-finite or `<= 0`
    /// - any origin entry is non-finite
    /// - the cell count overflows `usize`
    pub fn new(shape: &[usize], spacing: &[f64], origin: &[f64]) -> Result<Self, GridError> {
        if shape.is_empty() {
            return Err(GridError::NoAxes);
        }
        if spacing.len() != shape.len() {
            return Err(GridError::DimensionMismatch {
                what: "spacing",
                expected: shape.len(),
                found: spacing.len(),
            });
        }
        if origin.len() != shape.len() {
            return Err(GridError::DimensionMismatch {
                what: "origin",
                expected: shape.len(),
                found: origin.len(),
            });
        }
        for (axis, &n) in shape.iter().enumerate() {
            if n == 0 {
                return Err(GridError::EmptyAxis { axis });
            }
        }
        for (axis, &h) in spacing.iter().enumerate() {
            if !h.is_finite() || h <= 0.0 {
                return Err(GridError::InvalidSpacing { axis, value: h });
            }
        }
        for (axis, &o) in origin.iter().enumerate() {
            if !o.is_finite() {
                return Err(GridError::InvalidOrigin { axis, value: o });
            }
        }

        let mut strides = vec![1usize; shape.len()];
        let mut size = 1usize;
        for d in (0..shape.len()).rev() {
            strides[d] = size;
            size = size.checked_mul(shape[d]).ok_or(GridError::SizeOverflow)?;
        }

        Ok(Self {
            shape: shape.to_vec(),
            spacing: spacing.to_vec(),
            origin: origin.to_vec(),
            strides,
            size,
        })
    }

    /// A grid with unit spacing and its origin at zero.
    pub fn unit(shape: &[usize]) -> Result<Self, GridError> {
        let ones = vec![1.0; shape.len()];
        let zeros = vec![0.0; shape.len()];
        Self::new(shape, &ones, &zeros)
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Cells per axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Cell spacing per axis.
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Physical position of the first cell.
    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    /// Row-major strides: `index = Σ coords[d] * strides[d]`.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of cells, `∏ shape`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Physical volume attributed to one cell, `∏ spacing`.
    pub fn cell_volume(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// Physical position of the last cell on every axis.
    pub fn extent(&self) -> Point {
        self.shape
            .iter()
            .zip(&self.spacing)
            .zip(&self.origin)
            .map(|((&n, &h), &o)| o + (n - 1) as f64 * h)
            .collect()
    }

    /// Linear row-major index of a coordinate.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the coordinate has the wrong dimensionality or lies
    /// outside the grid on any axis.
    pub fn index_from_coords(&self, coords: &[usize]) -> Result<usize, GridError> {
        self.check_coords(coords)?;
        Ok(self.linear_index(coords))
    }

    /// Inverse of [`index_from_coords`](Self::index_from_coords).
    pub fn coords_from_index(&self, index: usize) -> Result<Coords, GridError> {
        if index >= self.size {
            return Err(GridError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        let mut rest = index;
        let mut coords = Coords::with_capacity(self.ndim());
        for &stride in &self.strides {
            coords.push(rest / stride);
            rest %= stride;
        }
        Ok(coords)
    }

    /// Physical position of a cell, `origin + coords ⊙ spacing`.
    pub fn position_from_coords(&self, coords: &[usize]) -> Result<Point, GridError> {
        self.check_coords(coords)?;
        Ok(self.position_unchecked(coords))
    }

    /// Physical position of the cell at a linear index.
    pub fn position_of_index(&self, index: usize) -> Result<Point, GridError> {
        let coords = self.coords_from_index(index)?;
        Ok(self.position_unchecked(&coords))
    }

    /// Continuous index-space coordinates of a physical position,
    /// `(position - origin) / spacing`, without any boundary handling.
    pub fn fractional_coords(&self, position: &[f64]) -> Result<Point, GridError> {
        self.check_position(position)?;
        Ok(position
            .iter()
            .zip(&self.origin)
            .zip(&self.spacing)
            .map(|((&p, &o), &h)| (p - o) / h)
            .collect())
    }

    /// Linear index of the cell nearest to `position`, with out-of-range
    /// positions mapped back through `boundary`.
    pub fn nearest_index(&self, position: &[f64], boundary: Boundary) -> Result<usize, GridError> {
        self.check_position(position)?;
        let mut index = 0usize;
        for d in 0..self.ndim() {
            let frac = (position[d] - self.origin[d]) / self.spacing[d];
            let rounded = boundary.fold(frac, self.shape[d]).round() as i64;
            index += boundary.resolve(rounded, self.shape[d]) * self.strides[d];
        }
        Ok(index)
    }

    /// Check that a field buffer has exactly one entry per cell.
    pub fn check_field_len(&self, len: usize) -> Result<(), GridError> {
        if len != self.size {
            return Err(GridError::DimensionMismatch {
                what: "field length",
                expected: self.size,
                found: len,
            });
        }
        Ok(())
    }

    /// Check that a position has one entry per axis.
    pub fn check_position(&self, position: &[f64]) -> Result<(), GridError> {
        if position.len() != self.ndim() {
            return Err(GridError::DimensionMismatch {
                what: "position",
                expected: self.ndim(),
                found: position.len(),
            });
        }
        Ok(())
    }

    /// Deterministic row-major iteration over every cell.
    ///
    /// The iterator is finite, visits each cell exactly once, and calling
    /// `cells()` again restarts from index 0.
    pub fn cells(&self) -> Cells<'_> {
        Cells {
            grid: self,
            next: 0,
            coords: smallvec::smallvec![0; self.ndim()],
        }
    }

    /// Callback form of [`cells`](Self::cells).
    pub fn for_each_cell(&self, mut f: impl FnMut(&Cell)) {
        for cell in self.cells() {
            f(&cell);
        }
    }

    pub(crate) fn linear_index(&self, coords: &[usize]) -> usize {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    fn position_unchecked(&self, coords: &[usize]) -> Point {
        coords
            .iter()
            .zip(&self.origin)
            .zip(&self.spacing)
            .map(|((&c, &o), &h)| o + c as f64 * h)
            .collect()
    }

    fn check_coords(&self, coords: &[usize]) -> Result<(), GridError> {
        if coords.len() != self.ndim() {
            return Err(GridError::DimensionMismatch {
                what: "coordinate",
                expected: self.ndim(),
                found: coords.len(),
            });
        }
        if coords.iter().zip(&self.shape).any(|(&c, &n)| c >= n) {
            return Err(GridError::CoordOutOfBounds {
                coords: coords.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(())
    }
}

impl TryFrom<GridSpec> for Grid {
    type Error = GridError;

    fn try_from(spec: GridSpec) -> Result<Self, Self::Error> {
        Self::new(&spec.shape, &spec.spacing, &spec.origin)
    }
}

impl From<Grid> for GridSpec {
    fn from(grid: Grid) -> Self {
        Self {
            shape: grid.shape,
            spacing: grid.spacing,
            origin: grid.origin,
        }
    }
}

/// One cell visited by [`Grid::cells`].
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Linear row-major index.
    pub index: usize,
    /// Integer coordinates.
    pub coords: Coords,
    /// Physical position of the cell centre.
    pub position: Point,
}

/// Row-major cell iterator. See [`Grid::cells`].
#[derive(Clone, Debug)]
pub struct Cells<'a> {
    grid: &'a Grid,
    next: usize,
    coords: Coords,
}

impl Iterator for Cells<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.next >= self.grid.size {
            return None;
        }
        let cell = Cell {
            index: self.next,
            coords: self.coords.clone(),
            position: self.grid.position_unchecked(&self.coords),
        };
        self.next += 1;
        // Odometer increment, last axis fastest.
        for d in (0..self.coords.len()).rev() {
            self.coords[d] += 1;
            if self.coords[d] < self.grid.shape[d] {
                break;
            }
            self.coords[d] = 0;
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid.size - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Cells<'_> {}
