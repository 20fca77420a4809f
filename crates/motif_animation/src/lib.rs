//! Motif Animation Engine
//!
//! Tweens, spring physics, timelines, and playback control, driven by one
//! cooperative frame clock.
//!
//! # Features
//!
//! - **Tweens**: time-bounded interpolation of numbers, colors, paths and discrete values
//! - **Springs**: semi-implicit Euler springs with stiffness, damping, mass
//! - **Controllers**: play/pause/resume/stop/reverse/seek/speed with repeats and `then`
//! - **Timelines**: sequential, parallel, overlapping and staggered compositions
//! - **Path drawing**: stroke reveal through dash offsets
//! - **CSS keyframes**: `@keyframes` emission into a per-engine stylesheet
//! - **Triggers**: mount, hover, click, visibility, scroll and signal bindings
//!
//! # Example
//!
//! ```rust
//! use motif_animation::{AnimationConfig, Animator, Easing, Playback, PlaybackState};
//! use motif_core::RecordingTarget;
//! use std::rc::Rc;
//!
//! let animator = Animator::default();
//! let circle = Rc::new(RecordingTarget::new());
//!
//! let anim = animator
//!     .animate(
//!         AnimationConfig::new(&circle)
//!             .prop("r", 0.0, 50.0)
//!             .duration(100.0)
//!             .easing(Easing::EaseInOut),
//!     )
//!     .unwrap();
//! anim.play();
//!
//! animator.advance(120.0);
//! assert_eq!(anim.state(), PlaybackState::Completed);
//! assert_eq!(circle.last_number("r"), Some(50.0));
//! ```

pub mod animation;
pub mod animator;
pub mod clock;
pub mod config;
pub mod controller;
pub mod draw;
pub mod easing;
pub mod error;
pub mod keyframes;
pub mod spring;
pub mod timeline;
pub mod trigger;
pub mod tween;
pub mod values;

/// Slack allowed when deciding whether elapsed time reached an end point
pub(crate) const COMPLETION_EPSILON_MS: f64 = 1e-6;

pub use animation::{AnimationConfig, PropertySpec};
pub use animator::Animator;
pub use clock::{ClockHandle, FrameClock, FrameListener, ListenerId, SystemTime, TimeSource, VirtualTime};
pub use config::{ConfigError, EngineConfig, SpringThresholds};
pub use controller::{
    Callbacks, Completion, Controller, Outcome, Playback, PlaybackOptions, PlaybackState, Repeat,
    Update,
};
pub use draw::DrawOptions;
pub use easing::{Easing, UnknownEasing};
pub use error::{AnimationError, Result};
pub use keyframes::{CssKeyframes, KeyframeStop, StyleRegistry, STYLE_ELEMENT_ID};
pub use spring::{Spring, SpringConfig, SpringSimulation};
pub use timeline::{Position, Timeline, TimelineEntryId, TimelineOptions};
pub use trigger::{Trigger, TriggerBinding, UnknownTrigger};
pub use tween::{Direction, Tween};
pub use values::{AnimatableValue, Interpolate, PropertyTrack};
