//! Path error types

use thiserror::Error;

/// Errors surfaced by the path utilities
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// Malformed path data
    #[error("invalid path data at offset {position}: {message}")]
    Parse { position: usize, message: String },

    /// Two paths disagree on a command letter
    #[error("path structures differ at segment {index}: `{from}` vs `{to}`")]
    StructureMismatch { index: usize, from: char, to: char },

    /// Two paths have a different number of segments
    #[error("path segment counts differ: {from} vs {to}")]
    SegmentCount { from: usize, to: usize },

    /// A target offered neither native length queries nor path data
    #[error("target exposes no path geometry")]
    NoGeometry,
}

impl PathError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        PathError::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result type for path operations
pub type Result<T> = std::result::Result<T, PathError>;
