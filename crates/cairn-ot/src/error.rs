//! Error types for transport problem validation.

use std::error::Error;
use std::fmt;

/// Errors raised before a Sinkhorn solve or a transport post-processing
/// step begins.
///
/// Numeric overflow during iteration is never an error: exponent
/// arguments are clamped so degenerate inputs yield finite output.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkhornError {
    /// Two sizes that must agree do not.
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The size actually supplied.
        found: usize,
    },
    /// An input that must be non-empty is empty.
    Empty {
        /// Which input.
        what: &'static str,
    },
    /// The cost matrix holds a NaN or infinity.
    NonFiniteCost {
        /// Row-major index of the first offending entry.
        index: usize,
    },
    /// A numeric parameter is out of its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// A configuration or distribution document could not be parsed.
    Config {
        /// Description of the failure.
        reason: String,
    },
}

impl SinkhornError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SinkhornError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected}, got {found}"),
            Self::Empty { what } => write!(f, "{what} is empty"),
            Self::NonFiniteCost { index } => {
                write!(f, "cost matrix entry {index} is not finite")
            }
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for SinkhornError {}

impl From<serde_json::Error> for SinkhornError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config {
            reason: e.to_string(),
        }
    }
}
