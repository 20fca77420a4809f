//! Trigger bindings
//!
//! Connects interaction events, or a reactive boolean, to anything that
//! implements [`Playback`].

use crate::controller::Playback;
use motif_core::{Observable, SubscriptionKey, TriggerEvent};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, trace};

/// What starts an animation
#[derive(Clone)]
pub enum Trigger {
    /// Plays when the element mounts, stops when it unmounts
    Mount,
    /// Plays on pointer enter, stops on pointer leave
    Hover,
    /// Each click toggles between playing and stopped
    Click,
    /// Plays when the element scrolls into view
    Visible,
    /// Scroll progress drives the animation's position
    Scroll,
    /// Plays whenever the value turns `true`
    Signal(Rc<dyn Observable<bool>>),
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Mount => f.write_str("Mount"),
            Trigger::Hover => f.write_str("Hover"),
            Trigger::Click => f.write_str("Click"),
            Trigger::Visible => f.write_str("Visible"),
            Trigger::Scroll => f.write_str("Scroll"),
            Trigger::Signal(_) => f.write_str("Signal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trigger `{0}`")]
pub struct UnknownTrigger(pub String);

impl FromStr for Trigger {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mount" => Ok(Trigger::Mount),
            "hover" => Ok(Trigger::Hover),
            "click" => Ok(Trigger::Click),
            "visible" => Ok(Trigger::Visible),
            "scroll" => Ok(Trigger::Scroll),
            other => Err(UnknownTrigger(other.to_string())),
        }
    }
}

/// A trigger attached to an animation or timeline
///
/// Dropping the binding detaches it from its signal.
pub struct TriggerBinding<P: Playback + Clone + 'static> {
    trigger: Trigger,
    playback: P,
    autoplay: bool,
    subscription: Option<SubscriptionKey>,
}

impl<P: Playback + Clone + 'static> TriggerBinding<P> {
    /// Bind with the default autoplay: on for mount triggers
    pub fn new(trigger: Trigger, playback: P) -> Self {
        Self::with_autoplay(trigger, playback, true)
    }

    /// Bind; `autoplay: false` keeps a mount trigger from playing
    pub fn with_autoplay(trigger: Trigger, playback: P, autoplay: bool) -> Self {
        let subscription = match &trigger {
            Trigger::Signal(signal) => {
                let target = playback.clone();
                let last = Cell::new(signal.get());
                if last.get() {
                    target.play();
                }
                Some(signal.subscribe(Box::new(move |value: &bool| {
                    let was = last.replace(*value);
                    if *value && !was {
                        debug!("signal trigger fired");
                        target.play();
                    }
                })))
            }
            _ => None,
        };

        Self {
            trigger,
            playback,
            autoplay,
            subscription,
        }
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    /// Deliver an interaction event
    pub fn handle(&self, event: TriggerEvent) {
        trace!(trigger = ?self.trigger, event = event.name(), "trigger event");
        match (&self.trigger, event) {
            (Trigger::Mount, TriggerEvent::Mount) if self.autoplay => self.playback.play(),
            (_, TriggerEvent::Unmount) => self.playback.stop(),
            (Trigger::Hover, TriggerEvent::PointerEnter) => self.playback.play(),
            (Trigger::Hover, TriggerEvent::PointerLeave) => self.playback.stop(),
            (Trigger::Click, TriggerEvent::Click) => {
                if self.playback.is_active() {
                    self.playback.stop();
                } else {
                    self.playback.play();
                }
            }
            (Trigger::Visible, TriggerEvent::Visibility(true)) => self.playback.play(),
            (Trigger::Scroll, TriggerEvent::Scroll { progress }) => self.playback.seek(progress),
            _ => {}
        }
    }
}

impl<P: Playback + Clone + 'static> Drop for TriggerBinding<P> {
    fn drop(&mut self) {
        if let (Trigger::Signal(signal), Some(key)) = (&self.trigger, self.subscription.take()) {
            signal.unsubscribe(key);
        }
    }
}

impl<P: Playback + Clone + 'static> fmt::Debug for TriggerBinding<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerBinding")
            .field("trigger", &self.trigger)
            .field("autoplay", &self.autoplay)
            .finish()
    }
}
