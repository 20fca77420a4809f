//! Animation targets
//!
//! The engine never assumes more of a visual object than the capability set
//! in [`AnimationTarget`]: write a named property, and optionally answer
//! native path-geometry queries. Targets are referenced weakly through a
//! [`TargetHandle`], so removing an element from the scene turns every
//! animation writing to it into a no-op sink instead of an error.

use crate::color::Color;
use crate::geometry::Point;
use std::fmt;
use std::rc::{Rc, Weak};

/// A value written to a target property
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    Color(Color),
    /// Any textual value (path data, discrete keywords, dash arrays)
    Text(String),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Color(c) => write!(f, "{}", c),
            PropertyValue::Text(t) => f.write_str(t),
        }
    }
}

/// A mutable visual object that animations can write to
pub trait AnimationTarget {
    /// Write a named property.
    ///
    /// Returns `false` when the target did not accept the write (e.g. it has
    /// been detached from its document).
    fn set_property(&self, name: &str, value: &PropertyValue) -> bool;

    /// Whether the target is still attached to a live scene
    fn is_connected(&self) -> bool {
        true
    }

    /// Native total path length, for path-like targets
    fn total_length(&self) -> Option<f32> {
        None
    }

    /// Native point-at-length query, for path-like targets
    fn point_at_length(&self, _distance: f32) -> Option<Point> {
        None
    }

    /// The target's path data (`d` attribute), if it has one
    fn path_data(&self) -> Option<String> {
        None
    }
}

/// A weak reference to an [`AnimationTarget`]
///
/// Cloning the handle never keeps the target alive.
#[derive(Clone, Default)]
pub struct TargetHandle {
    inner: Option<Weak<dyn AnimationTarget>>,
}

impl TargetHandle {
    /// Create a handle to a live target
    pub fn new<T: AnimationTarget + 'static>(target: &Rc<T>) -> Self {
        let target: Rc<dyn AnimationTarget> = target.clone();
        Self {
            inner: Some(Rc::downgrade(&target)),
        }
    }

    /// A handle that refers to nothing; all writes are dropped
    pub fn detached() -> Self {
        Self { inner: None }
    }

    /// Upgrade to the live target, if it still exists and is connected
    pub fn get(&self) -> Option<Rc<dyn AnimationTarget>> {
        self.inner
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|target| target.is_connected())
    }

    pub fn is_connected(&self) -> bool {
        self.get().is_some()
    }

    /// Write a property; returns `false` when the target is gone
    pub fn set(&self, name: &str, value: &PropertyValue) -> bool {
        match self.get() {
            Some(target) => target.set_property(name, value),
            None => false,
        }
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<T: AnimationTarget + 'static> From<&Rc<T>> for TargetHandle {
    fn from(target: &Rc<T>) -> Self {
        TargetHandle::new(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingTarget;

    #[test]
    fn handle_does_not_keep_target_alive() {
        let target = Rc::new(RecordingTarget::new());
        let handle = TargetHandle::new(&target);
        assert!(handle.set("r", &PropertyValue::Number(1.0)));

        drop(target);
        assert!(!handle.is_connected());
        assert!(!handle.set("r", &PropertyValue::Number(2.0)));
    }

    #[test]
    fn detached_target_rejects_writes() {
        let target = Rc::new(RecordingTarget::new());
        let handle = TargetHandle::new(&target);
        target.detach();
        assert!(!handle.set("r", &PropertyValue::Number(1.0)));
        assert!(target.writes("r").is_empty());
        assert!(!TargetHandle::detached().is_connected());
    }
}
