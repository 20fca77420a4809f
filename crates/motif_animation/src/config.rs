//! Engine configuration
//!
//! Loaded from TOML (`motif.toml`) or built in code. Every field has a
//! default, so an empty document is a valid configuration.

use crate::easing::Easing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors reading or writing an [`EngineConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine-wide settings shared by every animation an `Animator` creates
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Frames per second driven by the frame clock
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Tween duration used when an animation omits one
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u32,
    #[serde(default = "default_easing")]
    pub default_easing: Easing,
    /// Largest integration step a spring takes inside one frame
    #[serde(default = "default_max_spring_step_ms")]
    pub max_spring_step_ms: f64,
    #[serde(default)]
    pub spring: SpringThresholds,
}

fn default_frame_rate() -> f64 {
    60.0
}

fn default_duration_ms() -> u32 {
    300
}

fn default_easing() -> Easing {
    Easing::EaseOut
}

fn default_max_spring_step_ms() -> f64 {
    8.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            default_duration_ms: default_duration_ms(),
            default_easing: default_easing(),
            max_spring_step_ms: default_max_spring_step_ms(),
            spring: SpringThresholds::default(),
        }
    }
}

/// When a spring counts as settled
///
/// Both thresholds apply to normalized progress, so they are independent of
/// the magnitude of the animated values.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct SpringThresholds {
    #[serde(default = "default_rest_displacement")]
    pub rest_displacement: f32,
    /// Velocity threshold, in progress units per second
    #[serde(default = "default_rest_velocity")]
    pub rest_velocity: f32,
}

fn default_rest_displacement() -> f32 {
    0.0001
}

fn default_rest_velocity() -> f32 {
    0.001
}

impl Default for SpringThresholds {
    fn default() -> Self {
        Self {
            rest_displacement: default_rest_displacement(),
            rest_velocity: default_rest_velocity(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Duration of one frame in milliseconds
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.frame_rate
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(self.max_spring_step_ms.is_finite() && self.max_spring_step_ms > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_spring_step_ms must be positive, got {}",
                self.max_spring_step_ms
            )));
        }
        if self.spring.rest_displacement <= 0.0 || self.spring.rest_velocity <= 0.0 {
            return Err(ConfigError::Invalid(
                "spring rest thresholds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(config.default_duration_ms, 300);
        assert!(matches!(config.default_easing, Easing::EaseOut));
        assert_eq!(config.spring.rest_displacement, 0.0001);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            frame_rate = 120.0
            default_easing = "linear"

            [spring]
            rest_velocity = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(config.frame_rate, 120.0);
        assert!(matches!(config.default_easing, Easing::Linear));
        assert_eq!(config.spring.rest_velocity, 0.01);
        assert_eq!(config.spring.rest_displacement, 0.0001);
        assert!((config.frame_interval_ms() - 8.333).abs() < 1e-3);
    }

    #[test]
    fn rejects_bad_frame_rate() {
        assert!(matches!(
            EngineConfig::from_toml_str("frame_rate = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("frame_rate = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let text = EngineConfig::default().to_toml().unwrap();
        let parsed = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.default_duration_ms, 300);
    }
}
