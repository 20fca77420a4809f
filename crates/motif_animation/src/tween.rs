//! Tween engine
//!
//! Maps elapsed time within one leg of a run to linear progress, then
//! through the easing curve to the interpolated property values.

use crate::easing::Easing;
use crate::values::PropertyTrack;
use motif_core::PropertyValue;

/// Which way a leg plays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// A time-bounded interpolation of one or more properties
#[derive(Clone, Debug)]
pub struct Tween {
    duration_ms: f64,
    easing: Easing,
    tracks: Vec<PropertyTrack>,
}

impl Tween {
    /// Negative or non-finite durations are clamped to zero
    pub fn new(duration_ms: f64, easing: Easing, tracks: Vec<PropertyTrack>) -> Self {
        Self {
            duration_ms: sanitize_duration(duration_ms),
            easing,
            tracks,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub(crate) fn set_duration_ms(&mut self, duration_ms: f64) {
        self.duration_ms = sanitize_duration(duration_ms);
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn tracks(&self) -> &[PropertyTrack] {
        &self.tracks
    }

    /// Linear progress through a leg: `clamp(elapsed / duration, 0, 1)`
    ///
    /// A zero-length tween is complete immediately. An infinite one never
    /// progresses.
    pub fn raw_progress(&self, elapsed_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        if self.duration_ms.is_infinite() {
            return 0.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    /// Eased interpolation factor; reversing flips the easing input, not
    /// the endpoints
    pub fn eased(&self, raw: f32, direction: Direction) -> f32 {
        let input = if direction.is_forward() { raw } else { 1.0 - raw };
        self.easing.apply(input)
    }

    /// Whether `elapsed_ms` reaches the end of the leg
    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        elapsed_ms + crate::COMPLETION_EPSILON_MS >= self.duration_ms
    }

    /// Property values at linear progress `raw`
    pub fn sample(&self, raw: f32, direction: Direction) -> Vec<(String, PropertyValue)> {
        let eased = self.eased(raw, direction);
        sample_tracks(&self.tracks, eased)
    }
}

pub(crate) fn sample_tracks(tracks: &[PropertyTrack], t: f32) -> Vec<(String, PropertyValue)> {
    tracks
        .iter()
        .map(|track| (track.name().to_string(), track.sample(t)))
        .collect()
}

fn sanitize_duration(duration_ms: f64) -> f64 {
    if duration_ms.is_nan() || duration_ms < 0.0 {
        0.0
    } else {
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radius(duration_ms: f64, easing: Easing) -> Tween {
        Tween::new(
            duration_ms,
            easing,
            vec![PropertyTrack::new("r", 0.0, 50.0).unwrap()],
        )
    }

    #[test]
    fn progress_is_clamped() {
        let tween = radius(100.0, Easing::Linear);
        assert_eq!(tween.raw_progress(-10.0), 0.0);
        assert_eq!(tween.raw_progress(25.0), 0.25);
        assert_eq!(tween.raw_progress(250.0), 1.0);
    }

    #[test]
    fn zero_duration_is_complete() {
        let tween = radius(0.0, Easing::Linear);
        assert_eq!(tween.raw_progress(0.0), 1.0);
        assert!(tween.is_finished(0.0));
        assert_eq!(radius(-5.0, Easing::Linear).duration_ms(), 0.0);
    }

    #[test]
    fn reverse_flips_easing_input() {
        let tween = radius(100.0, Easing::EaseInQuad);
        assert_eq!(tween.eased(0.25, Direction::Forward), 0.0625);
        assert_eq!(tween.eased(0.25, Direction::Reverse), 0.5625);

        let values = tween.sample(0.0, Direction::Reverse);
        assert_eq!(values[0], ("r".to_string(), PropertyValue::Number(50.0)));
    }

    #[test]
    fn infinite_tween_never_finishes() {
        let tween = Tween::new(f64::INFINITY, Easing::Linear, Vec::new());
        assert_eq!(tween.raw_progress(1e9), 0.0);
        assert!(!tween.is_finished(1e9));
    }
}
