//! Spring physics animation
//!
//! A damped harmonic oscillator integrated with semi-implicit Euler.
//! Controllers run springs on normalized progress (0.0 to 1.0) and map that
//! onto the animated values, so one set of rest thresholds fits every
//! property.

use crate::config::SpringThresholds;
use crate::error::{AnimationError, Result};
use serde::{Deserialize, Serialize};

/// Number of consecutive at-rest frames before a spring counts as settled
pub const SETTLE_FRAMES: u8 = 2;

/// Upper bound on simulated time when estimating how long a spring runs
const MAX_SETTLE_ESTIMATE_MS: f64 = 60_000.0;

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
}

fn default_mass() -> f32 {
    1.0
}

impl SpringConfig {
    /// Create a new spring configuration
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// A very stiff spring with minimal oscillation (good for quick responses)
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    /// A slow spring with no overshoot (critically damped)
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0, 1.0)
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "gentle" => Some(Self::gentle()),
            "wobbly" => Some(Self::wobbly()),
            "stiff" => Some(Self::stiff()),
            "snappy" => Some(Self::snappy()),
            "molasses" => Some(Self::molasses()),
            _ => None,
        }
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    /// Check if the spring is critically damped (no oscillation, fastest settling)
    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 0.01
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }

    /// Stiffness and mass must be positive, damping non-negative
    pub fn validate(&self) -> Result<()> {
        if !(self.stiffness.is_finite() && self.stiffness > 0.0) {
            return Err(AnimationError::InvalidSpring(format!(
                "stiffness must be positive, got {}",
                self.stiffness
            )));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(AnimationError::InvalidSpring(format!(
                "mass must be positive, got {}",
                self.mass
            )));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(AnimationError::InvalidSpring(format!(
                "damping must not be negative, got {}",
                self.damping
            )));
        }
        Ok(())
    }

    /// Estimate how long a 0 to 1 run takes to settle at the given frame rate
    ///
    /// Undamped springs never settle; their estimate is capped at one minute.
    pub fn estimate_settle_ms(
        &self,
        thresholds: &SpringThresholds,
        frame_ms: f64,
        max_step_ms: f64,
    ) -> f64 {
        let mut sim = SpringSimulation::new(*self, 0.0, 1.0, *thresholds, max_step_ms);
        let mut elapsed = 0.0;
        while elapsed < MAX_SETTLE_ESTIMATE_MS {
            elapsed += frame_ms;
            if sim.advance(frame_ms) {
                break;
            }
        }
        elapsed
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// A single damped spring
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Velocity in units per second
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    /// Retarget the spring; velocity is kept
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Place the spring at `value`, at rest
    pub fn reset(&mut self, value: f32) {
        self.value = value;
        self.velocity = 0.0;
    }

    /// Within the thresholds of the target and nearly still
    pub fn is_at_rest(&self, thresholds: &SpringThresholds) -> bool {
        (self.value - self.target).abs() < thresholds.rest_displacement
            && self.velocity.abs() < thresholds.rest_velocity
    }

    /// Step the simulation by `dt` seconds
    ///
    /// Semi-implicit Euler: velocity first, then position from the new
    /// velocity. Stable for the step sizes a frame clock produces.
    pub fn step(&mut self, dt: f32) {
        let acceleration = self.acceleration();
        self.velocity += acceleration * dt;
        self.value += self.velocity * dt;
    }

    fn acceleration(&self) -> f32 {
        let spring_force = -self.config.stiffness * (self.value - self.target);
        let damping_force = -self.config.damping * self.velocity;
        (spring_force + damping_force) / self.config.mass
    }
}

/// A spring run as driven by the frame clock
///
/// Frames are split into substeps no longer than `max_step_ms`. The run is
/// settled after [`SETTLE_FRAMES`] consecutive frames at rest, at which
/// point the spring snaps exactly onto its target.
#[derive(Clone, Debug)]
pub struct SpringSimulation {
    spring: Spring,
    thresholds: SpringThresholds,
    max_step_ms: f64,
    rest_frames: u8,
}

impl SpringSimulation {
    pub fn new(
        config: SpringConfig,
        from: f32,
        to: f32,
        thresholds: SpringThresholds,
        max_step_ms: f64,
    ) -> Self {
        let mut spring = Spring::new(config, from);
        spring.set_target(to);
        Self {
            spring,
            thresholds,
            max_step_ms: if max_step_ms > 0.0 { max_step_ms } else { 8.0 },
            rest_frames: 0,
        }
    }

    pub fn spring(&self) -> &Spring {
        &self.spring
    }

    pub fn value(&self) -> f32 {
        self.spring.value()
    }

    pub fn set_target(&mut self, target: f32) {
        self.spring.set_target(target);
        self.rest_frames = 0;
    }

    pub fn reset(&mut self, value: f32) {
        self.spring.reset(value);
        self.rest_frames = 0;
    }

    /// Advance by one frame of `dt_ms`; returns `true` once settled
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if dt_ms > 0.0 {
            let substeps = (dt_ms / self.max_step_ms).ceil().max(1.0);
            let h = (dt_ms / substeps / 1000.0) as f32;
            for _ in 0..substeps as u32 {
                self.spring.step(h);
            }
        }

        if self.spring.is_at_rest(&self.thresholds) {
            self.rest_frames = self.rest_frames.saturating_add(1);
        } else {
            self.rest_frames = 0;
        }

        if self.rest_frames >= SETTLE_FRAMES {
            let target = self.spring.target();
            self.spring.reset(target);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[test]
    fn damping_classification() {
        assert!(SpringConfig::wobbly().is_underdamped());
        assert!(SpringConfig::molasses().is_critically_damped());
        assert!(SpringConfig::new(100.0, 40.0, 1.0).is_overdamped());
        assert_eq!(SpringConfig::preset("snappy"), Some(SpringConfig::snappy()));
        assert_eq!(SpringConfig::preset("bouncy"), None);
    }

    #[test]
    fn validation() {
        assert!(SpringConfig::stiff().validate().is_ok());
        assert!(SpringConfig::new(0.0, 10.0, 1.0).validate().is_err());
        assert!(SpringConfig::new(100.0, -1.0, 1.0).validate().is_err());
        assert!(SpringConfig::new(100.0, 10.0, 0.0).validate().is_err());
        assert!(SpringConfig::new(100.0, 0.0, 1.0).validate().is_ok());
    }

    #[test]
    fn critically_damped_spring_never_overshoots() {
        let mut sim = SpringSimulation::new(
            SpringConfig::molasses(),
            0.0,
            1.0,
            SpringThresholds::default(),
            8.0,
        );
        for _ in 0..600 {
            let settled = sim.advance(FRAME_MS);
            assert!(sim.value() <= 1.0 + 1e-4, "overshot to {}", sim.value());
            if settled {
                break;
            }
        }
        assert_eq!(sim.value(), 1.0);
    }

    #[test]
    fn settles_and_snaps_to_target() {
        let mut sim = SpringSimulation::new(
            SpringConfig::new(200.0, 20.0, 1.0),
            0.0,
            1.0,
            SpringThresholds::default(),
            8.0,
        );
        let frames = (0..600).position(|_| sim.advance(FRAME_MS));
        let frames = frames.expect("spring should settle");
        assert!(frames < 180, "took {frames} frames");
        assert_eq!(sim.value(), 1.0);
        assert_eq!(sim.spring().velocity(), 0.0);
    }

    #[test]
    fn settle_estimate_is_bounded() {
        let thresholds = SpringThresholds::default();
        let estimate = SpringConfig::stiff().estimate_settle_ms(&thresholds, FRAME_MS, 8.0);
        assert!(estimate > 100.0 && estimate < 2000.0, "{estimate}");

        let undamped =
            SpringConfig::new(100.0, 0.0, 1.0).estimate_settle_ms(&thresholds, FRAME_MS, 8.0);
        assert!(undamped >= MAX_SETTLE_ESTIMATE_MS);
    }
}
