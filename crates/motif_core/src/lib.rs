//! Motif Core
//!
//! Foundational primitives shared by the Motif animation crates:
//!
//! - **Geometry & Color**: `Point` and CSS-parsable `Color`
//! - **Targets**: the settable-property contract animations write through
//! - **Signals**: a minimal observable value for reactive animation bindings
//! - **Events**: interaction events consumed by trigger bindings
//!
//! # Example
//!
//! ```rust
//! use motif_core::{PropertyValue, RecordingTarget, TargetHandle};
//! use std::rc::Rc;
//!
//! let circle = Rc::new(RecordingTarget::new());
//! let handle = TargetHandle::new(&circle);
//!
//! handle.set("r", &PropertyValue::Number(25.0));
//! assert_eq!(circle.last_number("r"), Some(25.0));
//! ```

pub mod color;
pub mod events;
pub mod geometry;
pub mod recording;
pub mod signal;
pub mod target;

pub use color::{Color, ColorParseError};
pub use events::TriggerEvent;
pub use geometry::Point;
pub use recording::RecordingTarget;
pub use signal::{Observable, Signal, SubscriptionKey};
pub use target::{AnimationTarget, PropertyValue, TargetHandle};
