//! Stroke drawing animation for path-like targets
//!
//! The classic dash trick: set `stroke-dasharray` to the path length, then
//! animate `stroke-dashoffset` from the length down to zero so the stroke
//! appears to be traced.

use crate::animation::{AnimationConfig, EngineContext};
use crate::controller::{Callbacks, Controller, Playback, Update};
use crate::easing::Easing;
use crate::error::Result;
use motif_core::{PropertyValue, TargetHandle};
use motif_path::path_length;
use tracing::{debug, warn};

pub const DASH_ARRAY: &str = "stroke-dasharray";
pub const DASH_OFFSET: &str = "stroke-dashoffset";

/// Options for [`animate_path_draw`]
#[derive(Clone, Debug, Default)]
pub struct DrawOptions {
    /// Falls back to the engine default when unset
    pub duration_ms: Option<f64>,
    /// Erase instead of draw
    pub reverse: bool,
    pub easing: Option<Easing>,
    pub delay_ms: f64,
    /// Start playing immediately
    pub autoplay: bool,
    pub callbacks: Callbacks,
}

impl DrawOptions {
    pub fn duration(mut self, ms: f64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay_ms = ms;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Called every frame; [`Update::progress`] is the drawn fraction
    pub fn on_update(mut self, callback: impl Fn(&Update<'_>) + 'static) -> Self {
        self.callbacks = self.callbacks.on_update(callback);
        self
    }

    pub fn on_complete(mut self, callback: impl Fn() + 'static) -> Self {
        self.callbacks = self.callbacks.on_complete(callback);
        self
    }
}

/// Animate the stroke of `target` being drawn (or erased)
///
/// A target without readable geometry surfaces its path error. A target
/// that is already gone draws nothing but still completes on time.
pub(crate) fn animate_path_draw(
    ctx: &EngineContext,
    target: &TargetHandle,
    options: DrawOptions,
) -> Result<Controller> {
    let length = match target.get() {
        Some(element) => path_length(&*element)?,
        None => {
            warn!("path draw target is missing, drawing nothing");
            0.0
        }
    };
    target.set(DASH_ARRAY, &PropertyValue::Number(length));

    let (from, to) = if options.reverse {
        (0.0, length)
    } else {
        (length, 0.0)
    };
    debug!(length, reverse = options.reverse, "path draw");

    let mut config = AnimationConfig::new(target.clone())
        .prop(DASH_OFFSET, from, to)
        .delay(options.delay_ms);
    config.duration_ms = options.duration_ms;
    config.easing = options.easing;
    config.callbacks = options.callbacks;

    let controller = config.build(ctx)?;
    if options.autoplay {
        controller.play();
    }
    Ok(controller)
}
