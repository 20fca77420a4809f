//! The engine instance
//!
//! An [`Animator`] owns one frame clock, one keyframe stylesheet and the
//! engine settings. Every entry point builds against those, so independent
//! animators never share time, names or configuration.

use crate::animation::{AnimationConfig, EngineContext};
use crate::clock::{FrameClock, TimeSource};
use crate::config::EngineConfig;
use crate::controller::{Controller, Playback};
use crate::draw::{animate_path_draw, DrawOptions};
use crate::error::Result;
use crate::keyframes::{CssKeyframes, StyleRegistry};
use crate::spring::SpringConfig;
use crate::timeline::{compose, Position, Timeline, TimelineOptions};
use crate::trigger::{Trigger, TriggerBinding};
use motif_core::TargetHandle;
use std::rc::Rc;
use tracing::info;

pub struct Animator {
    clock: FrameClock,
    config: Rc<EngineConfig>,
    styles: StyleRegistry,
}

impl Animator {
    /// An engine running on wall-clock time
    pub fn new(config: EngineConfig) -> Self {
        let clock = FrameClock::new(config.frame_rate);
        Self::with_clock(clock, config)
    }

    /// An engine reading time from `source`, such as a [`crate::VirtualTime`]
    pub fn with_time_source(config: EngineConfig, source: Rc<dyn TimeSource>) -> Self {
        let clock = FrameClock::with_source(config.frame_rate, source);
        Self::with_clock(clock, config)
    }

    fn with_clock(clock: FrameClock, config: EngineConfig) -> Self {
        info!(
            frame_rate = config.frame_rate,
            default_duration_ms = config.default_duration_ms,
            "animator created"
        );
        Self {
            clock,
            config: Rc::new(config),
            styles: StyleRegistry::new(),
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub(crate) fn context(&self) -> EngineContext {
        EngineContext {
            clock: self.clock.handle(),
            config: Rc::clone(&self.config),
        }
    }

    /// Build an idle controller for `config`
    pub fn animate(&self, config: AnimationConfig) -> Result<Controller> {
        config.build(&self.context())
    }

    /// Build an idle spring-driven controller for `config`
    pub fn spring(&self, config: AnimationConfig, spring: SpringConfig) -> Result<Controller> {
        config.spring(spring).build(&self.context())
    }

    /// A timeline playing `configs` one after another
    pub fn timeline(&self, configs: Vec<AnimationConfig>) -> Result<Timeline> {
        self.sequential(configs)
    }

    /// An empty timeline to add entries to
    pub fn timeline_with(&self, options: TimelineOptions) -> Timeline {
        Timeline::new(self.context(), options)
    }

    /// Each config starts when the previous one ends
    pub fn sequential(&self, configs: Vec<AnimationConfig>) -> Result<Timeline> {
        compose(self.context(), configs, TimelineOptions::default(), |_| {
            Position::Relative(0.0)
        })
    }

    /// Every config starts together
    pub fn parallel(&self, configs: Vec<AnimationConfig>) -> Result<Timeline> {
        compose(self.context(), configs, TimelineOptions::default(), |_| {
            Position::Parallel
        })
    }

    /// Each config starts `overlap_ms` before the previous one ends
    pub fn overlap(&self, configs: Vec<AnimationConfig>, overlap_ms: f64) -> Result<Timeline> {
        compose(
            self.context(),
            configs,
            TimelineOptions::default(),
            |index| match index {
                0 => Position::Parallel,
                _ => Position::Relative(-overlap_ms),
            },
        )
    }

    /// Config `i` starts at `i * stagger_ms`
    pub fn stagger(&self, configs: Vec<AnimationConfig>, stagger_ms: f64) -> Result<Timeline> {
        let options = TimelineOptions {
            stagger_ms,
            ..Default::default()
        };
        compose(self.context(), configs, options, |_| Position::Parallel)
    }

    /// Stroke-draw animation on a path-like target
    pub fn draw_path(&self, target: &TargetHandle, options: DrawOptions) -> Result<Controller> {
        animate_path_draw(&self.context(), target, options)
    }

    /// Render `config` as CSS keyframes into this engine's stylesheet
    ///
    /// Returns the generated rule name.
    pub fn keyframes(&self, config: &AnimationConfig) -> Result<String> {
        let keyframes = CssKeyframes::from_config(config, self.config.default_easing)?;
        Ok(self.styles.register_generated(&keyframes))
    }

    /// Attach `playback` to `trigger`
    pub fn bind<P: Playback + Clone + 'static>(
        &self,
        trigger: Trigger,
        playback: P,
    ) -> TriggerBinding<P> {
        TriggerBinding::new(trigger, playback)
    }

    /// Advance time by `ms` and run the frames it covers
    ///
    /// On an animator built from a time source, the source is advanced by
    /// the caller and [`Animator::pump`] is used instead.
    pub fn advance(&self, ms: f64) -> u32 {
        self.clock.advance(ms)
    }

    /// Run the frames due according to the time source
    pub fn pump(&self) -> u32 {
        self.clock.pump()
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("frame_rate", &self.config.frame_rate)
            .field("listeners", &self.clock.listener_count())
            .field("styles", &self.styles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualTime;
    use crate::controller::PlaybackState;
    use crate::easing::Easing;
    use motif_core::RecordingTarget;

    #[test]
    fn animate_uses_engine_defaults() {
        let animator = Animator::new(EngineConfig {
            default_duration_ms: 120,
            ..Default::default()
        });
        let circle = Rc::new(RecordingTarget::new());
        let anim = animator
            .animate(AnimationConfig::new(&circle).prop("r", 0.0, 10.0))
            .unwrap();
        assert_eq!(anim.duration_ms(), Some(120.0));
    }

    #[test]
    fn factories_lay_out_entries() {
        let animator = Animator::default();
        let circle = Rc::new(RecordingTarget::new());
        let configs = || {
            (0..3)
                .map(|_| {
                    AnimationConfig::new(&circle)
                        .prop("r", 0.0, 1.0)
                        .duration(100.0)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(animator.sequential(configs()).unwrap().duration_ms(), 300.0);
        assert_eq!(animator.parallel(configs()).unwrap().duration_ms(), 100.0);
        assert_eq!(animator.overlap(configs(), 25.0).unwrap().duration_ms(), 250.0);
        assert_eq!(animator.stagger(configs(), 50.0).unwrap().duration_ms(), 200.0);
        assert_eq!(animator.timeline(configs()).unwrap().len(), 3);
    }

    #[test]
    fn pump_follows_the_time_source() {
        let time = VirtualTime::new();
        let animator = Animator::with_time_source(EngineConfig::default(), Rc::new(time.clone()));
        let circle = Rc::new(RecordingTarget::new());
        let anim = animator
            .animate(
                AnimationConfig::new(&circle)
                    .prop("r", 0.0, 50.0)
                    .duration(100.0)
                    .easing(Easing::Linear),
            )
            .unwrap();
        anim.play();

        animator.pump();
        time.advance(150.0);
        animator.pump();
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(circle.last_number("r"), Some(50.0));
    }

    #[test]
    fn keyframes_land_in_the_engine_stylesheet() {
        let animator = Animator::default();
        let name = animator
            .keyframes(
                &AnimationConfig::new(TargetHandle::detached())
                    .prop("opacity", 0.0, 1.0)
                    .easing(Easing::Linear),
            )
            .unwrap();
        assert!(animator.styles().contains(&name));
        assert!(animator
            .styles()
            .stylesheet()
            .starts_with(&format!("@keyframes {} {{", name)));
    }
}
