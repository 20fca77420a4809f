//! Scene file handling
//!
//! A scene (`scene.toml`) declares headless targets, the animations that
//! run against them and, optionally, a timeline composing them.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use motif_animation::{
    AnimatableValue, AnimationConfig, EngineConfig, Position, Repeat, SpringConfig,
};
use motif_core::TargetHandle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level scene description
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Scene {
    /// Engine settings; omitted keys use the engine defaults
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub animations: Vec<AnimationSpec>,
    #[serde(default)]
    pub timeline: Option<TimelineSpec>,
}

/// A headless element
#[derive(Debug, Deserialize, Serialize)]
pub struct TargetSpec {
    pub name: String,
    /// Path data, for path-like targets
    #[serde(default)]
    pub path: Option<String>,
    /// Native path length, for path-like targets
    #[serde(default)]
    pub length: Option<f32>,
}

/// A scalar written in a scene: a number or any textual value
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SceneValue {
    Number(f64),
    Text(String),
}

impl From<&SceneValue> for AnimatableValue {
    fn from(value: &SceneValue) -> Self {
        match value {
            SceneValue::Number(n) => AnimatableValue::Number(*n as f32),
            SceneValue::Text(text) => AnimatableValue::parse(text),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PropSpec {
    pub from: SceneValue,
    pub to: SceneValue,
}

/// `loop = true` repeats forever, `loop = 3` plays three times
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LoopSpec {
    Forever(bool),
    Times(u32),
}

impl From<LoopSpec> for Repeat {
    fn from(spec: LoopSpec) -> Self {
        match spec {
            LoopSpec::Forever(forever) => Repeat::from(forever),
            LoopSpec::Times(times) => Repeat::Times(times),
        }
    }
}

/// A preset name or explicit spring parameters
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpringSpec {
    Preset(String),
    Custom(SpringConfig),
}

impl SpringSpec {
    pub fn resolve(&self) -> Result<SpringConfig> {
        match self {
            SpringSpec::Preset(name) => SpringConfig::preset(name)
                .with_context(|| format!("Unknown spring preset '{}'", name)),
            SpringSpec::Custom(config) => Ok(*config),
        }
    }
}

/// One animation of the scene
#[derive(Debug, Deserialize, Serialize)]
pub struct AnimationSpec {
    pub name: String,
    pub target: String,
    pub props: IndexMap<String, PropSpec>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub delay_ms: f64,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(default, rename = "loop")]
    pub repeat: Option<LoopSpec>,
    #[serde(default)]
    pub alternate: bool,
    #[serde(default)]
    pub spring: Option<SpringSpec>,
    /// `mount`, `hover`, `click`, `visible` or `scroll`
    #[serde(default = "default_trigger")]
    pub trigger: String,
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

fn default_trigger() -> String {
    "mount".to_string()
}

fn default_true() -> bool {
    true
}

impl AnimationSpec {
    /// Turn the declaration into an engine config against `target`
    pub fn to_config(&self, target: TargetHandle) -> Result<AnimationConfig> {
        let mut config = AnimationConfig::new(target).delay(self.delay_ms);
        for (property, spec) in &self.props {
            config = config.prop(
                property.as_str(),
                AnimatableValue::from(&spec.from),
                AnimatableValue::from(&spec.to),
            );
        }
        if let Some(duration) = self.duration_ms {
            config = config.duration(duration);
        }
        if let Some(easing) = &self.easing {
            let easing = easing
                .parse()
                .with_context(|| format!("Animation '{}' has an invalid easing", self.name))?;
            config = config.easing(easing);
        }
        if let Some(repeat) = self.repeat {
            config = config.repeat(repeat);
        }
        if let Some(spring) = &self.spring {
            config = config.spring(spring.resolve()?);
        }
        Ok(config.alternate(self.alternate))
    }
}

/// A timeline over named animations
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimelineSpec {
    #[serde(default)]
    pub stagger_ms: f64,
    #[serde(default, rename = "loop")]
    pub repeat: Option<LoopSpec>,
    pub entries: Vec<TimelineEntrySpec>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TimelineEntrySpec {
    pub animation: String,
    /// `"+=N"`, `"-=N"`, `"P%"` or `"N"`; sequential when omitted
    #[serde(default)]
    pub position: Option<String>,
}

impl TimelineEntrySpec {
    pub fn position(&self) -> Result<Position> {
        match &self.position {
            Some(text) => text
                .parse()
                .with_context(|| format!("Timeline entry '{}' has an invalid position", self.animation)),
            None => Ok(Position::Relative(0.0)),
        }
    }
}

impl Scene {
    /// Load a scene file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("No scene file found at {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scene: Scene = toml::from_str(content)?;
        scene.engine.validate()?;
        scene.check_references()?;
        Ok(scene)
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationSpec> {
        self.animations.iter().find(|spec| spec.name == name)
    }

    /// Names of animations driven by the timeline rather than their trigger
    pub fn timeline_members(&self) -> Vec<&str> {
        self.timeline
            .iter()
            .flat_map(|timeline| timeline.entries.iter())
            .map(|entry| entry.animation.as_str())
            .collect()
    }

    fn check_references(&self) -> Result<()> {
        for animation in &self.animations {
            if !self.targets.iter().any(|t| t.name == animation.target) {
                anyhow::bail!(
                    "Animation '{}' refers to unknown target '{}'",
                    animation.name,
                    animation.target
                );
            }
        }
        for member in self.timeline_members() {
            if self.animation(member).is_none() {
                anyhow::bail!("Timeline refers to unknown animation '{}'", member);
            }
        }
        Ok(())
    }
}
