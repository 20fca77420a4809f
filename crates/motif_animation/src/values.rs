//! Animatable value types
//!
//! Property endpoints are parsed into an [`AnimatableValue`] once, when the
//! animation is built. Interpolation per frame is then a plain `lerp`.

use crate::error::{AnimationError, Result};
use motif_core::{Color, PropertyValue};
use motif_path::PathData;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Color::lerp(self, other, t)
    }
}

impl Interpolate for PathData {
    /// Paths are checked for compatibility before they are animated; an
    /// incompatible pair snaps to the nearer endpoint.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        match self.interpolate(other, t) {
            Ok(path) => path,
            Err(_) if t < 0.5 => self.clone(),
            Err(_) => other.clone(),
        }
    }
}

/// A property endpoint
#[derive(Clone, Debug, PartialEq)]
pub enum AnimatableValue {
    Number(f32),
    Color(Color),
    /// SVG path data, interpolated command by command
    Path(PathData),
    /// Anything else; switches from one value to the other at the midpoint
    Discrete(String),
}

impl AnimatableValue {
    /// Classify a textual value
    ///
    /// Numbers win over colors, colors over path data. Text that is none of
    /// those animates discretely.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(number) = trimmed.parse::<f32>() {
            if number.is_finite() {
                return AnimatableValue::Number(number);
            }
        }
        if let Ok(color) = trimmed.parse::<Color>() {
            return AnimatableValue::Color(color);
        }
        if trimmed.starts_with(['M', 'm']) {
            if let Ok(path) = PathData::parse(trimmed) {
                return AnimatableValue::Path(path);
            }
        }
        AnimatableValue::Discrete(trimmed.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnimatableValue::Number(_) => "number",
            AnimatableValue::Color(_) => "color",
            AnimatableValue::Path(_) => "path",
            AnimatableValue::Discrete(_) => "discrete value",
        }
    }

    pub fn to_property(&self) -> PropertyValue {
        match self {
            AnimatableValue::Number(n) => PropertyValue::Number(*n),
            AnimatableValue::Color(c) => PropertyValue::Color(*c),
            AnimatableValue::Path(p) => PropertyValue::Text(p.to_string()),
            AnimatableValue::Discrete(s) => PropertyValue::Text(s.clone()),
        }
    }

    /// The value at `t` between `self` and `to`
    ///
    /// `t` is not clamped, so overshooting easings overshoot numbers and
    /// colors alike.
    pub fn sample(&self, to: &AnimatableValue, t: f32) -> PropertyValue {
        match (self, to) {
            (AnimatableValue::Number(a), AnimatableValue::Number(b)) => {
                PropertyValue::Number(a.lerp(b, t))
            }
            (AnimatableValue::Color(a), AnimatableValue::Color(b)) => {
                PropertyValue::Color(a.lerp(b, t))
            }
            (AnimatableValue::Path(a), AnimatableValue::Path(b)) => {
                PropertyValue::Text(a.lerp(b, t).to_string())
            }
            _ if t < 0.5 => self.to_property(),
            _ => to.to_property(),
        }
    }
}

impl From<f32> for AnimatableValue {
    fn from(value: f32) -> Self {
        AnimatableValue::Number(value)
    }
}

impl From<i32> for AnimatableValue {
    fn from(value: i32) -> Self {
        AnimatableValue::Number(value as f32)
    }
}

impl From<Color> for AnimatableValue {
    fn from(value: Color) -> Self {
        AnimatableValue::Color(value)
    }
}

impl From<PathData> for AnimatableValue {
    fn from(value: PathData) -> Self {
        AnimatableValue::Path(value)
    }
}

impl From<&str> for AnimatableValue {
    fn from(value: &str) -> Self {
        AnimatableValue::parse(value)
    }
}

impl From<String> for AnimatableValue {
    fn from(value: String) -> Self {
        AnimatableValue::parse(&value)
    }
}

/// One property animated between two validated endpoints
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyTrack {
    name: String,
    from: AnimatableValue,
    to: AnimatableValue,
}

impl PropertyTrack {
    /// Pair two endpoints, rejecting combinations that cannot interpolate
    pub fn new(
        name: impl Into<String>,
        from: impl Into<AnimatableValue>,
        to: impl Into<AnimatableValue>,
    ) -> Result<Self> {
        let name = name.into();
        let from = from.into();
        let to = to.into();

        match (&from, &to) {
            (AnimatableValue::Number(_), AnimatableValue::Number(_))
            | (AnimatableValue::Color(_), AnimatableValue::Color(_))
            | (AnimatableValue::Discrete(_), AnimatableValue::Discrete(_)) => {}
            (AnimatableValue::Path(a), AnimatableValue::Path(b)) => a.check_compatible(b)?,
            _ => {
                return Err(AnimationError::ValueMismatch {
                    property: name,
                    from: from.kind(),
                    to: to.kind(),
                })
            }
        }
        for value in [&from, &to] {
            if let AnimatableValue::Number(n) = value {
                if !n.is_finite() {
                    return Err(AnimationError::InvalidValue {
                        property: name,
                        value: n.to_string(),
                    });
                }
            }
        }
        Ok(Self { name, from, to })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from(&self) -> &AnimatableValue {
        &self.from
    }

    pub fn to(&self) -> &AnimatableValue {
        &self.to
    }

    pub fn sample(&self, t: f32) -> PropertyValue {
        self.from.sample(&self.to, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_path::PathError;

    #[test]
    fn parse_classifies_values() {
        assert_eq!(AnimatableValue::parse("12.5"), AnimatableValue::Number(12.5));
        assert!(matches!(AnimatableValue::parse("#ff0000"), AnimatableValue::Color(_)));
        assert!(matches!(AnimatableValue::parse("M0 0 L10 10"), AnimatableValue::Path(_)));
        assert_eq!(
            AnimatableValue::parse("hidden"),
            AnimatableValue::Discrete("hidden".to_string())
        );
    }

    #[test]
    fn numbers_and_colors_interpolate() {
        let track = PropertyTrack::new("r", 0.0, 50.0).unwrap();
        assert_eq!(track.sample(0.5), PropertyValue::Number(25.0));

        let fill = PropertyTrack::new("fill", "#000000", "#ffffff").unwrap();
        let mid = fill.sample(0.5).as_color().unwrap();
        assert!((mid.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn discrete_values_switch_at_midpoint() {
        let track = PropertyTrack::new("visibility", "hidden", "visible").unwrap();
        assert_eq!(track.sample(0.49).as_text(), Some("hidden"));
        assert_eq!(track.sample(0.5).as_text(), Some("visible"));
    }

    #[test]
    fn path_tracks_interpolate() {
        let track = PropertyTrack::new("d", "M0 0 L10 10", "M10 10 L30 50").unwrap();
        assert_eq!(track.sample(0.5).as_text(), Some("M5 5 L20 30"));
    }

    #[test]
    fn mismatched_kinds_are_rejected() {
        let err = PropertyTrack::new("r", 0.0, "#fff").unwrap_err();
        assert!(matches!(
            err,
            AnimationError::ValueMismatch {
                from: "number",
                to: "color",
                ..
            }
        ));

        let err = PropertyTrack::new("d", "M0 0 L1 1", "M0 0 Q1 1 2 2").unwrap_err();
        assert!(matches!(
            err,
            AnimationError::Path(PathError::StructureMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert!(matches!(
            PropertyTrack::new("r", f32::NAN, 1.0),
            Err(AnimationError::InvalidValue { .. })
        ));
    }
}
