//! Error types for grid construction and grid-resident field access.

use std::error::Error;
use std::fmt;

/// Errors arising from grid construction or index/field queries.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// An axis has zero cells.
    EmptyAxis {
        /// The offending axis.
        axis: usize,
    },
    /// The grid was given no axes at all.
    NoAxes,
    /// Two vectors that must agree in length do not.
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected length.
        expected: usize,
        /// The length actually supplied.
        found: usize,
    },
    /// A spacing entry is zero, negative, or non-finite.
    InvalidSpacing {
        /// The offending axis.
        axis: usize,
        /// The rejected value.
        value: f64,
    },
    /// An origin entry is non-finite.
    InvalidOrigin {
        /// The offending axis.
        axis: usize,
        /// The rejected value.
        value: f64,
    },
    /// A coordinate lies outside `[0, shape[d])` on some axis.
    CoordOutOfBounds {
        /// The offending coordinate.
        coords: Vec<usize>,
        /// The grid shape.
        shape: Vec<usize>,
    },
    /// A linear index lies outside `[0, size)`.
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The grid size.
        size: usize,
    },
    /// The product of the shape overflows `usize`.
    SizeOverflow,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAxis { axis } => write!(f, "axis {axis} has zero cells"),
            Self::NoAxes => write!(f, "grid must have at least one axis"),
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected length {expected}, got {found}"),
            Self::InvalidSpacing { axis, value } => {
                write!(f, "spacing on axis {axis} must be finite and > 0, got {value}")
            }
            Self::InvalidOrigin { axis, value } => {
                write!(f, "origin on axis {axis} must be finite, got {value}")
            }
            Self::CoordOutOfBounds { coords, shape } => {
                write!(f, "coordinate {coords:?} out of bounds for shape {shape:?}")
            }
            Self::IndexOutOfBounds { index, size } => {
                write!(f, "index {index} out of bounds for grid of {size} cells")
            }
            Self::SizeOverflow => write!(f, "grid cell count overflows usize"),
        }
    }
}

impl Error for GridError {}
