//! CSS keyframe generation
//!
//! [`CssKeyframes`] renders an `@keyframes` block. A [`StyleRegistry`] owns
//! the single stylesheet every block is injected into, keyed by rule name,
//! together with the counter used for generated names. Each engine instance
//! owns its own registry.

use crate::animation::AnimationConfig;
use crate::easing::Easing;
use crate::error::Result;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt::Write as _;
use tracing::debug;

/// Id of the style element holding the generated stylesheet
pub const STYLE_ELEMENT_ID: &str = "motif-keyframes";

/// Prefix of generated rule names
const GENERATED_PREFIX: &str = "motif-kf";

/// Stops emitted for easings with no CSS timing function
const SAMPLED_STOPS: usize = 10;

/// One stop of a keyframes rule
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeStop {
    /// Position in the rule, 0.0 to 1.0
    pub offset: f32,
    pub declarations: Vec<(String, String)>,
    /// Timing function from this stop to the next
    pub easing: Option<String>,
}

/// An `@keyframes` rule under construction
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CssKeyframes {
    stops: Vec<KeyframeStop>,
}

impl CssKeyframes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stop at `offset` (clamped to 0.0..=1.0)
    pub fn stop<K, V>(mut self, offset: f32, declarations: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.stops.push(KeyframeStop {
            offset: offset.clamp(0.0, 1.0),
            declarations: declarations
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            easing: None,
        });
        self
    }

    /// Set the timing function leaving the most recently added stop
    pub fn easing(mut self, easing: impl Into<String>) -> Self {
        if let Some(last) = self.stops.last_mut() {
            last.easing = Some(easing.into());
        }
        self
    }

    pub fn stops(&self) -> &[KeyframeStop] {
        &self.stops
    }

    /// Keyframes equivalent to a tween config
    ///
    /// Easings with a CSS form become the timing function of the first
    /// stop. The others are sampled into intermediate stops joined by
    /// linear segments.
    pub fn from_config(config: &AnimationConfig, default_easing: Easing) -> Result<Self> {
        let tracks = config.tracks()?;
        let easing = config.easing.unwrap_or(default_easing);
        let declarations_at = |t: f32| -> Vec<(String, String)> {
            tracks
                .iter()
                .map(|track| (track.name().to_string(), track.sample(t).to_string()))
                .collect()
        };

        let keyframes = match easing.to_css() {
            Some(timing) => Self::new()
                .stop(0.0, declarations_at(0.0))
                .easing(timing)
                .stop(1.0, declarations_at(1.0)),
            None => (0..=SAMPLED_STOPS).fold(Self::new(), |keyframes, i| {
                let offset = i as f32 / SAMPLED_STOPS as f32;
                keyframes.stop(offset, declarations_at(easing.apply(offset)))
            }),
        };
        Ok(keyframes)
    }

    /// Render as `@keyframes name { ... }`
    pub fn to_css(&self, name: &str) -> String {
        let mut stops: Vec<&KeyframeStop> = self.stops.iter().collect();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        let mut css = format!("@keyframes {} {{\n", name);
        for stop in stops {
            let _ = write!(css, "  {}% {{", format_percent(stop.offset));
            for (property, value) in &stop.declarations {
                let _ = write!(css, " {}: {};", property, value);
            }
            if let Some(easing) = &stop.easing {
                let _ = write!(css, " animation-timing-function: {};", easing);
            }
            css.push_str(" }\n");
        }
        css.push('}');
        css
    }
}

fn format_percent(offset: f32) -> String {
    let percent = (offset * 1000.0).round() / 10.0;
    if percent.fract() == 0.0 {
        format!("{}", percent as i32)
    } else {
        format!("{}", percent)
    }
}

#[derive(Default)]
struct RegistryInner {
    rules: IndexMap<String, String>,
    next_id: u64,
}

/// The shared stylesheet of generated keyframe rules
///
/// Registering a name again replaces its rule in place.
#[derive(Default)]
pub struct StyleRegistry {
    inner: RefCell<RegistryInner>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the style element this registry's stylesheet belongs in
    pub fn element_id(&self) -> &'static str {
        STYLE_ELEMENT_ID
    }

    /// Register `keyframes` under `name`; returns the rendered rule
    pub fn register(&self, name: &str, keyframes: &CssKeyframes) -> String {
        let css = keyframes.to_css(name);
        let replaced = self
            .inner
            .borrow_mut()
            .rules
            .insert(name.to_string(), css.clone())
            .is_some();
        debug!(name, replaced, "keyframes registered");
        css
    }

    /// Register `keyframes` under a fresh name and return the name
    pub fn register_generated(&self, keyframes: &CssKeyframes) -> String {
        let name = {
            let mut inner = self.inner.borrow_mut();
            loop {
                inner.next_id += 1;
                let candidate = format!("{}-{}", GENERATED_PREFIX, inner.next_id);
                if !inner.rules.contains_key(&candidate) {
                    break candidate;
                }
            }
        };
        self.register(&name, keyframes);
        name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().rules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.borrow().rules.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().rules.is_empty()
    }

    /// Every rule, in registration order
    pub fn stylesheet(&self) -> String {
        self.inner
            .borrow()
            .rules
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every rule and restart generated names
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.rules.clear();
        inner.next_id = 0;
    }
}

impl std::fmt::Debug for StyleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleRegistry")
            .field("element_id", &STYLE_ELEMENT_ID)
            .field("rules", &self.len())
            .finish()
    }
}
