//! In-memory recording target
//!
//! A headless stand-in for a DOM/SVG element. It records every property
//! write, which makes it the sink used by tests and by headless simulation.

use crate::target::{AnimationTarget, PropertyValue};
use std::cell::{Cell, RefCell};

/// A target that records property writes in order
#[derive(Debug, Default)]
pub struct RecordingTarget {
    writes: RefCell<Vec<(String, PropertyValue)>>,
    disconnected: Cell<bool>,
    length: Option<f32>,
    path: Option<String>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A path-like target answering native length queries
    pub fn with_length(length: f32) -> Self {
        Self {
            length: Some(length),
            ..Default::default()
        }
    }

    /// A path-like target exposing its `d` attribute
    pub fn with_path_data(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Simulate removal from the document
    pub fn detach(&self) {
        self.disconnected.set(true);
    }

    /// All values written to `name`, oldest first
    pub fn writes(&self, name: &str) -> Vec<PropertyValue> {
        self.writes
            .borrow()
            .iter()
            .filter(|(prop, _)| prop == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// The most recent value written to `name`
    pub fn last(&self, name: &str) -> Option<PropertyValue> {
        self.writes
            .borrow()
            .iter()
            .rev()
            .find(|(prop, _)| prop == name)
            .map(|(_, value)| value.clone())
    }

    /// The most recent numeric value written to `name`
    pub fn last_number(&self, name: &str) -> Option<f32> {
        self.last(name).and_then(|v| v.as_number())
    }

    /// Names of all properties written so far, in first-write order
    pub fn properties(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (prop, _) in self.writes.borrow().iter() {
            if !names.contains(prop) {
                names.push(prop.clone());
            }
        }
        names
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn clear(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl AnimationTarget for RecordingTarget {
    fn set_property(&self, name: &str, value: &PropertyValue) -> bool {
        if self.disconnected.get() {
            return false;
        }
        self.writes
            .borrow_mut()
            .push((name.to_string(), value.clone()));
        true
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.get()
    }

    fn total_length(&self) -> Option<f32> {
        self.length
    }

    fn path_data(&self) -> Option<String> {
        self.path.clone()
    }
}
