//! Boundary policy for queries that fall outside the grid.

use serde::{Deserialize, Serialize};

/// How an out-of-range index along one axis is mapped back onto the grid.
///
/// # Examples
///
/// ```
/// use cairn_core::Boundary;
///
/// assert_eq!(Boundary::Clamp.resolve(-3, 5), 0);
/// assert_eq!(Boundary::Clamp.resolve(9, 5), 4);
/// assert_eq!(Boundary::Wrap.resolve(-1, 5), 4);
/// assert_eq!(Boundary::Wrap.resolve(7, 5), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Out-of-range indices are pinned to `[0, len - 1]`.
    #[default]
    Clamp,
    /// Out-of-range indices wrap around (periodic).
    Wrap,
}

impl Boundary {
    /// Resolve a signed index along an axis of `len` cells.
    ///
    /// `len` must be non-zero; grids never have empty axes.
    pub fn resolve(self, index: i64, len: usize) -> usize {
        let n = len as i64;
        if index >= 0 && index < n {
            return index as usize;
        }
        match self {
            Self::Clamp => index.clamp(0, n - 1) as usize,
            Self::Wrap => index.rem_euclid(n) as usize,
        }
    }

    /// Map a continuous fractional coordinate onto the axis.
    ///
    /// Clamp pins to `[0, len - 1]`; wrap reduces modulo `len`. Non-finite
    /// inputs resolve to the nearest end (NaN to 0).
    pub fn fold(self, frac: f64, len: usize) -> f64 {
        let hi = (len - 1) as f64;
        let frac = if frac.is_nan() {
            0.0
        } else if frac == f64::INFINITY {
            hi
        } else if frac == f64::NEG_INFINITY {
            0.0
        } else {
            frac
        };
        match self {
            Self::Clamp => frac.clamp(0.0, hi),
            Self::Wrap => frac.rem_euclid(len as f64),
        }
    }
}
