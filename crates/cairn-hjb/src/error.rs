//! Error types for HJB problem construction and solving.

use cairn_core::GridError;
use std::error::Error;
use std::fmt;

/// Errors from HJB problem validation, configuration resolution, and solving.
///
/// Every variant is raised before the first sweep; numeric trouble inside
/// the sweep loop is absorbed by clamping instead of surfacing as an error.
#[derive(Clone, Debug, PartialEq)]
pub enum HjbError {
    /// Grid construction or a grid query failed.
    Grid(GridError),
    /// Two sizes that must agree do not.
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The size actually supplied.
        found: usize,
    },
    /// A numeric parameter is out of its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A configuration document could not be parsed or resolved.
    Config {
        /// Description of the failure.
        reason: String,
    },
}

impl HjbError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HjbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected}, got {found}"),
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for HjbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for HjbError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<serde_json::Error> for HjbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config {
            reason: e.to_string(),
        }
    }
}
