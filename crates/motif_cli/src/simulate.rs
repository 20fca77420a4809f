//! Headless scene simulation
//!
//! Runs a scene against recording targets on virtual time and reports what
//! every animation wrote.

use crate::scene::Scene;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use motif_animation::{
    Animator, Controller, Playback, PlaybackState, Timeline, TimelineOptions, Trigger,
    TriggerBinding, VirtualTime,
};
use motif_core::{PropertyValue, RecordingTarget, TargetHandle, TriggerEvent};
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Frames run when no stop condition is given and something keeps looping
const MAX_FRAMES: u32 = 100_000;

/// When a simulation stops
#[derive(Clone, Copy, Debug)]
pub enum StopAt {
    Frames(u32),
    Millis(f64),
    /// Until nothing is animating
    Idle,
}

/// Parse `--event` values
pub fn parse_event(text: &str) -> Result<TriggerEvent> {
    let (name, arg) = match text.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (text, None),
    };
    let event = match name.trim() {
        "mount" => TriggerEvent::Mount,
        "unmount" => TriggerEvent::Unmount,
        "enter" => TriggerEvent::PointerEnter,
        "leave" => TriggerEvent::PointerLeave,
        "click" => TriggerEvent::Click,
        "visible" => TriggerEvent::Visibility(true),
        "hidden" => TriggerEvent::Visibility(false),
        "scroll" => {
            let progress = arg
                .context("scroll events need a progress, e.g. scroll:0.5")?
                .trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid scroll progress in '{}'", text))?;
            TriggerEvent::Scroll { progress }
        }
        other => anyhow::bail!(
            "Unknown event '{}'. Valid events: mount, unmount, enter, leave, click, visible, hidden, scroll:P",
            other
        ),
    };
    Ok(event)
}

#[derive(Debug, Serialize)]
pub struct AnimationReport {
    pub name: String,
    pub state: String,
    pub progress: f32,
    pub repeats: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Number(f32),
    Text(String),
}

impl From<PropertyValue> for ReportValue {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Number(n) => ReportValue::Number(n),
            other => ReportValue::Text(other.to_string()),
        }
    }
}

/// Everything a simulation observed
#[derive(Debug, Serialize)]
pub struct Report {
    pub frames: u32,
    pub elapsed_ms: f64,
    pub animations: Vec<AnimationReport>,
    /// Every value written, per target and property, oldest first
    pub targets: IndexMap<String, IndexMap<String, Vec<ReportValue>>>,
}

impl Report {
    /// Human-readable summary: animation states and final values
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} frames, {:.1}ms simulated",
            self.frames, self.elapsed_ms
        )];
        for animation in &self.animations {
            lines.push(format!(
                "  {:<16} {:<10} progress {:.3}, {} legs done",
                animation.name, animation.state, animation.progress, animation.repeats
            ));
        }
        for (target, properties) in &self.targets {
            for (property, values) in properties {
                let last = match values.last() {
                    Some(ReportValue::Number(n)) => format!("{}", n),
                    Some(ReportValue::Text(text)) => text.clone(),
                    None => continue,
                };
                lines.push(format!(
                    "  {}.{} = {} ({} writes)",
                    target,
                    property,
                    last,
                    values.len()
                ));
            }
        }
        lines.join("\n")
    }
}

enum Driven {
    Single {
        controller: Controller,
        binding: TriggerBinding<Controller>,
    },
    Timeline(Timeline),
}

/// A scene instantiated on virtual time
pub struct Simulation {
    animator: Animator,
    time: VirtualTime,
    targets: IndexMap<String, Rc<RecordingTarget>, FxBuildHasher>,
    driven: Vec<(String, Driven)>,
}

impl Simulation {
    pub fn new(scene: &Scene) -> Result<Self> {
        let time = VirtualTime::new();
        let animator = Animator::with_time_source(scene.engine.clone(), Rc::new(time.clone()));
        animator.pump();

        let mut targets = IndexMap::with_hasher(FxBuildHasher);
        for spec in &scene.targets {
            let target = match (&spec.path, spec.length) {
                (Some(path), _) => RecordingTarget::with_path_data(path.clone()),
                (None, Some(length)) => RecordingTarget::with_length(length),
                (None, None) => RecordingTarget::new(),
            };
            targets.insert(spec.name.clone(), Rc::new(target));
        }

        let mut simulation = Self {
            animator,
            time,
            targets,
            driven: Vec::new(),
        };

        let members = scene.timeline_members();
        for spec in &scene.animations {
            if members.contains(&spec.name.as_str()) {
                continue;
            }
            let config = spec.to_config(simulation.handle(&spec.target))?;
            let controller = simulation
                .animator
                .animate(config)
                .with_context(|| format!("Failed to build animation '{}'", spec.name))?;
            let trigger: Trigger = spec
                .trigger
                .parse()
                .with_context(|| format!("Animation '{}' has an invalid trigger", spec.name))?;
            let binding = TriggerBinding::with_autoplay(trigger, controller.clone(), spec.autoplay);
            simulation
                .driven
                .push((spec.name.clone(), Driven::Single { controller, binding }));
        }

        if let Some(timeline_spec) = &scene.timeline {
            let timeline = simulation.animator.timeline_with(TimelineOptions {
                stagger_ms: timeline_spec.stagger_ms,
                repeat: timeline_spec.repeat.map(Into::into).unwrap_or_default(),
                ..Default::default()
            });
            for entry in &timeline_spec.entries {
                let Some(spec) = scene.animation(&entry.animation) else {
                    anyhow::bail!("Timeline refers to unknown animation '{}'", entry.animation);
                };
                let config = spec.to_config(simulation.handle(&spec.target))?;
                timeline
                    .add(config, entry.position()?)
                    .with_context(|| format!("Failed to add '{}' to the timeline", spec.name))?;
            }
            info!(
                entries = timeline.len(),
                duration_ms = timeline.duration_ms(),
                "timeline built"
            );
            simulation
                .driven
                .push(("timeline".to_string(), Driven::Timeline(timeline)));
        }

        Ok(simulation)
    }

    fn handle(&self, name: &str) -> TargetHandle {
        match self.targets.get(name) {
            Some(target) => TargetHandle::new(target),
            None => TargetHandle::detached(),
        }
    }

    /// Mount everything, then deliver `events` to every binding
    pub fn start(&self, events: &[TriggerEvent]) {
        for (name, driven) in &self.driven {
            match driven {
                Driven::Single { binding, .. } => {
                    binding.handle(TriggerEvent::Mount);
                    for event in events {
                        binding.handle(*event);
                    }
                }
                Driven::Timeline(timeline) => {
                    debug!(name = %name, "playing timeline");
                    timeline.play();
                }
            }
        }
    }

    /// Advance frame by frame until `stop` is reached
    pub fn run(&self, stop: StopAt) -> u32 {
        let frame_ms = self.animator.clock().frame_interval_ms();
        let limit = match stop {
            StopAt::Frames(frames) => frames,
            StopAt::Millis(ms) => (ms / frame_ms).ceil().max(0.0) as u32,
            StopAt::Idle => MAX_FRAMES,
        };

        let mut frames = 0;
        while frames < limit {
            if matches!(stop, StopAt::Idle) && !self.animator.clock().has_listeners() {
                break;
            }
            self.time.advance(frame_ms);
            frames += self.animator.pump();
        }
        if frames >= MAX_FRAMES && matches!(stop, StopAt::Idle) {
            warn!(frames, "scene never went idle, stopping");
        }
        frames
    }

    pub fn report(&self, frames: u32) -> Report {
        let animations = self
            .driven
            .iter()
            .map(|(name, driven)| {
                let (state, progress, repeats) = match driven {
                    Driven::Single { controller, .. } => (
                        controller.state(),
                        controller.progress(),
                        controller.repeats_done(),
                    ),
                    Driven::Timeline(timeline) => (timeline.state(), timeline.progress(), 0),
                };
                AnimationReport {
                    name: name.clone(),
                    state: state_name(state).to_string(),
                    progress,
                    repeats,
                }
            })
            .collect();

        let targets = self
            .targets
            .iter()
            .map(|(name, target)| {
                let properties = target
                    .properties()
                    .into_iter()
                    .map(|property| {
                        let values = target
                            .writes(&property)
                            .into_iter()
                            .map(ReportValue::from)
                            .collect();
                        (property, values)
                    })
                    .collect();
                (name.clone(), properties)
            })
            .collect();

        Report {
            frames,
            elapsed_ms: self.animator.clock().elapsed_ms(),
            animations,
            targets,
        }
    }
}

fn state_name(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Idle => "idle",
        PlaybackState::Running => "running",
        PlaybackState::Paused => "paused",
        PlaybackState::Stopped => "stopped",
        PlaybackState::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
[[targets]]
name = "circle"

[[targets]]
name = "line"
length = 120.0

[[animations]]
name = "grow"
target = "circle"
duration_ms = 100
easing = "linear"
props = { r = { from = 0, to = 50 } }

[[animations]]
name = "wiggle"
target = "line"
duration_ms = 50
trigger = "click"
props = { x = { from = 0, to = 1 } }
"#;

    #[test]
    fn mount_animations_run_to_completion() {
        let scene = Scene::parse(SCENE).unwrap();
        let simulation = Simulation::new(&scene).unwrap();
        simulation.start(&[]);
        simulation.run(StopAt::Idle);

        let report = simulation.report(0);
        assert_eq!(report.animations[0].state, "completed");
        assert_eq!(report.animations[1].state, "idle");
        let r = &report.targets["circle"]["r"];
        assert!(matches!(r.last(), Some(ReportValue::Number(n)) if *n == 50.0));
        assert!(report.summary().contains("circle.r = 50"));
    }

    #[test]
    fn events_reach_bindings() {
        let scene = Scene::parse(SCENE).unwrap();
        let simulation = Simulation::new(&scene).unwrap();
        simulation.start(&[parse_event("click").unwrap()]);
        let frames = simulation.run(StopAt::Millis(200.0));
        assert_eq!(frames, 12);

        let report = simulation.report(frames);
        assert_eq!(report.animations[1].state, "completed");
    }

    #[test]
    fn timeline_members_are_driven_by_the_timeline() {
        let scene = Scene::parse(&format!(
            "{}\n[timeline]\nentries = [{{ animation = \"grow\" }}, {{ animation = \"wiggle\" }}]\n",
            SCENE
        ))
        .unwrap();
        let simulation = Simulation::new(&scene).unwrap();
        simulation.start(&[]);
        simulation.run(StopAt::Idle);

        let report = simulation.report(0);
        assert_eq!(report.animations.len(), 1);
        assert_eq!(report.animations[0].name, "timeline");
        assert_eq!(report.animations[0].state, "completed");
        assert!(report.elapsed_ms >= 150.0);
    }

    #[test]
    fn parses_events() {
        assert_eq!(parse_event("enter").unwrap(), TriggerEvent::PointerEnter);
        assert_eq!(
            parse_event("scroll:0.25").unwrap(),
            TriggerEvent::Scroll { progress: 0.25 }
        );
        assert!(parse_event("scroll").is_err());
        assert!(parse_event("focus").is_err());
    }
}
