//! Error types for particle simulation and density solvers.

use cairn_core::GridError;
use std::error::Error;
use std::fmt;

/// Errors from SDE and Fokker–Planck configuration, parsing and setup.
#[derive(Clone, Debug, PartialEq)]
pub enum SdeError {
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
    /// A potential, score or schedule string could not be parsed.
    Parse {
        /// Which kind of string.
        what: &'static str,
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A configuration document could not be parsed.
    Config {
        /// Description of the failure.
        reason: String,
    },
}

impl SdeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(what: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SdeError {
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
            Self::Parse {
                what,
                input,
                reason,
            } => write!(f, "cannot parse {what} '{input}': {reason}"),
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl Error for SdeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for SdeError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<serde_json::Error> for SdeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config {
            reason: e.to_string(),
        }
    }
}
