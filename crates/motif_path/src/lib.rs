//! Motif Path Utilities
//!
//! Pure functions over SVG path data, used by path-drawing and morphing
//! animations.
//!
//! # Features
//!
//! - **Parsing**: the full SVG path grammar into normalized segments
//! - **Measurement**: total length and point-at-length over lines, Beziers and arcs
//! - **Morphing**: parameter-wise interpolation between same-structure paths
//! - **Editing**: split at movetos, reverse tracing direction
//!
//! Malformed path data is always reported as a [`PathError`]; nothing in this
//! crate panics on user input.
//!
//! # Example
//!
//! ```rust
//! use motif_path::{interpolate_path, path_length};
//!
//! assert_eq!(path_length("M0 0 L3 4").unwrap(), 5.0);
//! assert_eq!(
//!     interpolate_path("M0 0 L10 0", "M0 10 L10 10", 0.5).unwrap(),
//!     "M0 5 L10 5"
//! );
//! ```

pub mod error;
pub mod geometry;
pub mod ops;
pub mod parser;
pub mod path;

pub use error::{PathError, Result};
pub use geometry::{Curve, Subpath};
pub use ops::{
    interpolate_path, path_length, point_at_length, reverse_path, split_path, PathInput,
};
pub use path::{CommandKind, PathBuilder, PathData, Segment};
