//! Error types for artifact encoding, decoding and writing.

use cairn_core::GridError;
use std::fmt;
use std::io;

/// Errors that can occur while encoding, decoding or writing artifacts.
#[derive(Debug)]
pub enum ExportError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// A JSON document could not be produced or parsed.
    Json(serde_json::Error),
    /// The grid does not support the requested export.
    Grid(GridError),
    /// A binary array header or body is malformed.
    MalformedArray {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A frames document carries an unknown version tag.
    UnsupportedVersion {
        /// The tag found in the document.
        found: String,
    },
    /// Two sizes that must agree do not.
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected size.
        expected: usize,
        /// The size actually supplied.
        found: usize,
    },
}

impl ExportError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedArray {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::MalformedArray { detail } => write!(f, "malformed array: {detail}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported frames version '{found}'")
            }
            Self::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected}, got {found}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<GridError> for ExportError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}
