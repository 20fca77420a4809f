//! Animation configuration
//!
//! An [`AnimationConfig`] describes one run: the target, the properties and
//! their endpoints, timing, and callbacks. Building it validates the
//! endpoints and produces an idle [`Controller`].

use crate::clock::ClockHandle;
use crate::config::EngineConfig;
use crate::controller::{Callbacks, Controller, PlaybackOptions, Repeat, Update};
use crate::easing::Easing;
use crate::error::Result;
use crate::spring::{SpringConfig, SpringSimulation};
use crate::tween::Tween;
use crate::values::{AnimatableValue, PropertyTrack};
use motif_core::TargetHandle;
use std::rc::Rc;

/// What animations are built against: a clock and the engine settings
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub clock: ClockHandle,
    pub config: Rc<EngineConfig>,
}

/// One property and its endpoints, not yet validated
#[derive(Clone, Debug, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub from: AnimatableValue,
    pub to: AnimatableValue,
}

/// Configuration of a single animation run
#[derive(Clone, Debug, Default)]
pub struct AnimationConfig {
    pub target: TargetHandle,
    pub props: Vec<PropertySpec>,
    /// Falls back to the engine default when unset
    pub duration_ms: Option<f64>,
    pub delay_ms: f64,
    /// Falls back to the engine default when unset
    pub easing: Option<Easing>,
    pub repeat: Repeat,
    pub alternate: bool,
    /// Run on spring physics instead of a timed tween
    pub spring: Option<SpringConfig>,
    pub callbacks: Callbacks,
}

impl AnimationConfig {
    pub fn new(target: impl Into<TargetHandle>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Animate `name` from `from` to `to`
    pub fn prop(
        mut self,
        name: impl Into<String>,
        from: impl Into<AnimatableValue>,
        to: impl Into<AnimatableValue>,
    ) -> Self {
        self.props.push(PropertySpec {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay_ms = ms;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    /// `true` loops forever, `n` plays `n` times in total
    pub fn repeat(mut self, repeat: impl Into<Repeat>) -> Self {
        self.repeat = repeat.into();
        self
    }

    pub fn alternate(mut self, alternate: bool) -> Self {
        self.alternate = alternate;
        self
    }

    pub fn spring(mut self, spring: SpringConfig) -> Self {
        self.spring = Some(spring);
        self
    }

    pub fn on_start(mut self, callback: impl Fn() + 'static) -> Self {
        self.callbacks = self.callbacks.on_start(callback);
        self
    }

    pub fn on_update(mut self, callback: impl Fn(&Update<'_>) + 'static) -> Self {
        self.callbacks = self.callbacks.on_update(callback);
        self
    }

    pub fn on_repeat(mut self, callback: impl Fn() + 'static) -> Self {
        self.callbacks = self.callbacks.on_repeat(callback);
        self
    }

    pub fn on_complete(mut self, callback: impl Fn() + 'static) -> Self {
        self.callbacks = self.callbacks.on_complete(callback);
        self
    }

    /// Validate every property pair
    pub fn tracks(&self) -> Result<Vec<PropertyTrack>> {
        self.props
            .iter()
            .map(|p| PropertyTrack::new(p.name.clone(), p.from.clone(), p.to.clone()))
            .collect()
    }

    pub(crate) fn build(&self, ctx: &EngineContext) -> Result<Controller> {
        let tracks = self.tracks()?;
        let options = PlaybackOptions {
            delay_ms: self.delay_ms,
            repeat: self.repeat,
            alternate: self.alternate,
            callbacks: self.callbacks.clone(),
        };

        match self.spring {
            Some(spring) => {
                spring.validate()?;
                let config = &ctx.config;
                let sim = SpringSimulation::new(
                    spring,
                    0.0,
                    1.0,
                    config.spring,
                    config.max_spring_step_ms,
                );
                let estimate_ms = spring.estimate_settle_ms(
                    &config.spring,
                    config.frame_interval_ms(),
                    config.max_spring_step_ms,
                );
                Ok(Controller::spring(
                    ctx.clock.clone(),
                    self.target.clone(),
                    tracks,
                    sim,
                    estimate_ms,
                    options,
                ))
            }
            None => {
                let duration = self
                    .duration_ms
                    .unwrap_or(ctx.config.default_duration_ms as f64);
                let easing = self.easing.unwrap_or(ctx.config.default_easing);
                Ok(Controller::tween(
                    ctx.clock.clone(),
                    self.target.clone(),
                    Tween::new(duration, easing, tracks),
                    options,
                ))
            }
        }
    }
}
