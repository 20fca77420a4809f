//! Animation error types

use crate::config::ConfigError;
use motif_path::PathError;
use thiserror::Error;

/// Errors raised while building animations
///
/// Runtime problems (a target that disappears mid-flight, a panicking
/// callback) are recovered and logged instead of surfacing here.
#[derive(Error, Debug)]
pub enum AnimationError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("property `{property}` cannot animate from a {from} to a {to}")]
    ValueMismatch {
        property: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("property `{property}` has an invalid value `{value}`")]
    InvalidValue { property: String, value: String },

    #[error("invalid spring parameters: {0}")]
    InvalidSpring(String),

    #[error("invalid timeline position `{0}`")]
    InvalidPosition(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
