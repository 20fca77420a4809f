//! Animation controller
//!
//! A [`Controller`] is the playback state machine for one tween or spring
//! run against one target:
//!
//! ```text
//! Idle --play()--> Running            (Idle while a start delay elapses)
//! Running --pause()--> Paused         (elapsed time frozen, deregistered)
//! Paused --play()/resume()--> Running
//! Running/Paused --stop()--> Stopped  (deregistered, progress kept)
//! Running --(last leg done)--> Completed
//! ```
//!
//! Completed and Stopped end a run; `play()` starts a new one. The frame
//! clock only holds a weak registration, so dropping every handle to a
//! controller is enough to let it go.
//!
//! Callbacks never run while the controller's state is borrowed. Each
//! operation collects the events it produced and dispatches them at the
//! end, so callbacks are free to call back into any controller.

use crate::clock::{ClockHandle, FrameListener, ListenerId};
use crate::spring::SpringSimulation;
use crate::tween::{sample_tracks, Direction, Tween};
use crate::values::PropertyTrack;
use crate::COMPLETION_EPSILON_MS;
use motif_core::{PropertyValue, TargetHandle};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace, warn};

/// Frame length used to replay springs when no clock is attached
const FALLBACK_FRAME_MS: f64 = 1000.0 / 60.0;

/// Playback state of a controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

/// How many times a run plays through
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repeat {
    #[default]
    Once,
    /// `n` total play-throughs
    Times(u32),
    Infinite,
}

impl Repeat {
    /// Total number of legs, `None` when infinite
    pub fn legs(self) -> Option<u32> {
        match self {
            Repeat::Once => Some(1),
            Repeat::Times(n) => Some(n.max(1)),
            Repeat::Infinite => None,
        }
    }
}

impl From<bool> for Repeat {
    fn from(looping: bool) -> Self {
        if looping {
            Repeat::Infinite
        } else {
            Repeat::Once
        }
    }
}

impl From<u32> for Repeat {
    fn from(times: u32) -> Self {
        Repeat::Times(times)
    }
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Stopped,
}

/// Data passed to `on_update` callbacks
#[derive(Debug)]
pub struct Update<'a> {
    /// Linear progress through the current leg (0.0 to 1.0)
    pub progress: f32,
    /// Values written this frame
    pub values: &'a [(String, PropertyValue)],
}

impl Update<'_> {
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|(property, _)| property == name)
            .map(|(_, value)| value)
    }

    pub fn number(&self, name: &str) -> Option<f32> {
        self.value(name).and_then(PropertyValue::as_number)
    }
}

pub type EventCallback = Rc<dyn Fn()>;
pub type UpdateCallback = Rc<dyn Fn(&Update<'_>)>;

/// Lifecycle callbacks of a run
#[derive(Clone, Default)]
pub struct Callbacks {
    on_start: Vec<EventCallback>,
    on_update: Vec<UpdateCallback>,
    on_repeat: Vec<EventCallback>,
    on_complete: Vec<EventCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a run starts moving, after any delay
    pub fn on_start(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_start.push(Rc::new(callback));
        self
    }

    /// Called once per rendered frame
    pub fn on_update(mut self, callback: impl Fn(&Update<'_>) + 'static) -> Self {
        self.on_update.push(Rc::new(callback));
        self
    }

    /// Called between legs of a repeating run
    pub fn on_repeat(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_repeat.push(Rc::new(callback));
        self
    }

    /// Called once when the last leg finishes
    pub fn on_complete(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_complete.push(Rc::new(callback));
        self
    }

    pub(crate) fn push_repeat(&mut self, callback: EventCallback) {
        self.on_repeat.push(callback);
    }

    fn is_empty(&self) -> bool {
        self.on_start.is_empty()
            && self.on_update.is_empty()
            && self.on_repeat.is_empty()
            && self.on_complete.is_empty()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_start", &self.on_start.len())
            .field("on_update", &self.on_update.len())
            .field("on_repeat", &self.on_repeat.len())
            .field("on_complete", &self.on_complete.len())
            .finish()
    }
}

/// Run-level settings shared by tweens and springs
#[derive(Clone, Debug, Default)]
pub struct PlaybackOptions {
    pub delay_ms: f64,
    pub repeat: Repeat,
    /// Flip direction between legs
    pub alternate: bool,
    pub callbacks: Callbacks,
}

struct CompletionSlot {
    outcome: Option<Outcome>,
    waker: Option<Waker>,
}

/// Resolves when the run it was taken from completes or is stopped
///
/// Single-threaded: poll it with a local executor such as
/// `pollster::block_on` while something else drives the frame clock, or
/// check [`Completion::outcome`] directly.
#[derive(Clone)]
pub struct Completion {
    slot: Rc<RefCell<CompletionSlot>>,
}

impl Completion {
    fn pending() -> (Self, Rc<RefCell<CompletionSlot>>) {
        let slot = Rc::new(RefCell::new(CompletionSlot {
            outcome: None,
            waker: None,
        }));
        (
            Self {
                slot: Rc::clone(&slot),
            },
            slot,
        )
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.borrow().outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        let mut slot = self.slot.borrow_mut();
        match slot.outcome {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

pub(crate) enum Motion {
    Tween(Tween),
    Spring {
        tracks: Vec<PropertyTrack>,
        sim: SpringSimulation,
        /// Expected length of one leg, used for timeline placement
        estimate_ms: f64,
    },
}

/// How a timeline wants an entry left after placing it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlaceMode {
    /// Running, waiting out its start, or completed, as the position says
    Activate,
    /// Paused at the position
    Pause,
    /// Rendered at the position, state untouched
    Hold,
}

enum Phase {
    Waiting,
    Active,
    Done,
}

enum Event {
    Start,
    Update {
        progress: f32,
        values: Vec<(String, PropertyValue)>,
    },
    Repeat,
    Complete,
}

/// Work produced by an operation, run once the state borrow is released
#[derive(Default)]
struct Pending {
    events: Vec<Event>,
    then: Vec<Box<dyn FnOnce()>>,
    wakers: Vec<Waker>,
    callbacks: Option<Callbacks>,
}

impl Pending {
    fn capture(&mut self, inner: &ControllerInner) {
        if !self.events.is_empty() && !inner.callbacks.is_empty() {
            self.callbacks = Some(inner.callbacks.clone());
        }
    }

    fn dispatch(self) {
        if let Some(callbacks) = &self.callbacks {
            for event in &self.events {
                match event {
                    Event::Start => callbacks.on_start.iter().for_each(|f| f()),
                    Event::Update { progress, values } => {
                        let update = Update {
                            progress: *progress,
                            values,
                        };
                        callbacks.on_update.iter().for_each(|f| f(&update));
                    }
                    Event::Repeat => callbacks.on_repeat.iter().for_each(|f| f()),
                    Event::Complete => callbacks.on_complete.iter().for_each(|f| f()),
                }
            }
        }
        for callback in self.then {
            callback();
        }
        for waker in self.wakers {
            waker.wake();
        }
    }
}

struct ControllerInner {
    label: String,
    motion: Motion,
    target: TargetHandle,
    clock: ClockHandle,
    registration: Option<ListenerId>,
    state: PlaybackState,
    /// Waiting out the start delay (state is Idle, or Paused while waiting)
    armed: bool,
    delay_ms: f64,
    delay_remaining_ms: f64,
    elapsed_ms: f64,
    direction: Direction,
    /// Direction a fresh run starts in
    base_direction: Direction,
    speed: f64,
    repeat: Repeat,
    alternate: bool,
    repeats_done: u32,
    callbacks: Callbacks,
    then_queue: Vec<Box<dyn FnOnce()>>,
    completions: Vec<Rc<RefCell<CompletionSlot>>>,
    last_progress: f32,
    last_values: Vec<(String, PropertyValue)>,
    warned_missing_target: bool,
}

impl ControllerInner {
    fn wants_frames(&self) -> bool {
        self.state == PlaybackState::Running || (self.state == PlaybackState::Idle && self.armed)
    }

    fn deregister(&mut self) {
        if let Some(id) = self.registration.take() {
            self.clock.deregister(id);
        }
    }

    fn frame_ms(&self) -> f64 {
        self.clock.frame_interval_ms().unwrap_or(FALLBACK_FRAME_MS)
    }

    /// Length of one leg; springs report their settle estimate
    fn leg_ms(&self) -> f64 {
        match &self.motion {
            Motion::Tween(tween) => tween.duration_ms(),
            Motion::Spring { estimate_ms, .. } => *estimate_ms,
        }
    }

    fn active_span_ms(&self) -> f64 {
        let leg = self.leg_ms();
        match self.repeat.legs() {
            Some(legs) => leg * legs as f64,
            None if leg > 0.0 => f64::INFINITY,
            None => 0.0,
        }
    }

    fn reset_motion(&mut self) {
        if let Motion::Spring { sim, .. } = &mut self.motion {
            let (from, to) = if self.direction.is_forward() {
                (0.0, 1.0)
            } else {
                (1.0, 0.0)
            };
            sim.reset(from);
            sim.set_target(to);
        }
    }

    fn sample(&self) -> (f32, Vec<(String, PropertyValue)>) {
        match &self.motion {
            Motion::Tween(tween) => {
                let raw = tween.raw_progress(self.elapsed_ms);
                (raw, tween.sample(raw, self.direction))
            }
            Motion::Spring { tracks, sim, .. } => {
                let x = sim.value();
                let progress = if self.direction.is_forward() { x } else { 1.0 - x };
                (progress.clamp(0.0, 1.0), sample_tracks(tracks, x))
            }
        }
    }

    fn render(&mut self, pending: &mut Pending) {
        let (progress, values) = self.sample();
        self.write(&values);
        self.last_progress = progress;
        self.last_values.clone_from(&values);
        pending.events.push(Event::Update { progress, values });
    }

    fn write(&mut self, values: &[(String, PropertyValue)]) {
        if values.is_empty() {
            return;
        }
        let Some(target) = self.target.get() else {
            if !self.warned_missing_target {
                warn!(animation = %self.label, "animation target is missing, continuing without it");
                self.warned_missing_target = true;
            }
            return;
        };
        for (name, value) in values {
            if !target.set_property(name, value) {
                trace!(animation = %self.label, property = %name, "target rejected write");
            }
        }
    }

    fn begin_running(&mut self, pending: &mut Pending) {
        self.state = PlaybackState::Running;
        self.armed = false;
        debug!(animation = %self.label, "running");
        pending.events.push(Event::Start);
    }

    /// Start a run from the current position
    fn start(&mut self, pending: &mut Pending) {
        self.delay_remaining_ms = self.delay_ms;
        if self.delay_ms > 0.0 {
            self.state = PlaybackState::Idle;
            self.armed = true;
            debug!(animation = %self.label, delay_ms = self.delay_ms, "waiting for delay");
        } else {
            self.begin_running(pending);
            self.render(pending);
        }
    }

    fn play(&mut self, pending: &mut Pending) {
        match self.state {
            PlaybackState::Running => trace!(animation = %self.label, "already running"),
            PlaybackState::Idle if self.armed => {}
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle => self.start(pending),
            PlaybackState::Stopped | PlaybackState::Completed => {
                self.elapsed_ms = 0.0;
                self.repeats_done = 0;
                self.direction = self.base_direction;
                self.reset_motion();
                self.start(pending);
            }
        }
    }

    fn pause(&mut self) {
        if self.wants_frames() {
            self.state = PlaybackState::Paused;
            debug!(animation = %self.label, progress = self.last_progress, "paused");
        }
    }

    fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = if self.armed {
                PlaybackState::Idle
            } else {
                PlaybackState::Running
            };
            debug!(animation = %self.label, "resumed");
        }
    }

    fn stop(&mut self, pending: &mut Pending) {
        if self.wants_frames() || self.state == PlaybackState::Paused {
            self.state = PlaybackState::Stopped;
            self.armed = false;
            self.deregister();
            debug!(animation = %self.label, progress = self.last_progress, "stopped");
            self.resolve(Outcome::Stopped, pending);
        }
    }

    /// Not yet moved, sought or placed: nothing to mirror
    fn is_untouched(&self) -> bool {
        (self.state == PlaybackState::Idle || self.armed)
            && self.elapsed_ms == 0.0
            && self.last_values.is_empty()
    }

    fn reverse(&mut self) {
        let untouched = self.is_untouched();
        self.direction = self.direction.flipped();
        self.base_direction = self.base_direction.flipped();
        if untouched {
            self.reset_motion();
            debug!(animation = %self.label, direction = ?self.direction, "reversed before playing");
            return;
        }
        match &mut self.motion {
            Motion::Tween(tween) if tween.duration_ms().is_finite() => {
                self.elapsed_ms = (tween.duration_ms() - self.elapsed_ms).max(0.0);
            }
            Motion::Tween(_) => {}
            Motion::Spring { sim, .. } => {
                sim.set_target(if self.direction.is_forward() { 1.0 } else { 0.0 });
            }
        }
        debug!(animation = %self.label, direction = ?self.direction, "reversed");
    }

    fn seek(&mut self, progress: f32, pending: &mut Pending) {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        match &mut self.motion {
            Motion::Tween(tween) => {
                if !tween.duration_ms().is_finite() {
                    warn!(animation = %self.label, "cannot seek an endless run");
                    return;
                }
                self.elapsed_ms = p as f64 * tween.duration_ms();
            }
            Motion::Spring { sim, .. } => {
                let x = if self.direction.is_forward() { p } else { 1.0 - p };
                sim.reset(x);
            }
        }
        trace!(animation = %self.label, progress = p, "seek");
        self.render(pending);
    }

    fn set_speed(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.speed = factor;
        } else {
            warn!(animation = %self.label, factor, "ignoring non-positive speed factor");
        }
    }

    fn resolve(&mut self, outcome: Outcome, pending: &mut Pending) {
        for slot in self.completions.drain(..) {
            let mut slot = slot.borrow_mut();
            slot.outcome = Some(outcome);
            if let Some(waker) = slot.waker.take() {
                pending.wakers.push(waker);
            }
        }
    }

    fn complete(&mut self, pending: &mut Pending) {
        self.state = PlaybackState::Completed;
        self.armed = false;
        self.deregister();
        debug!(animation = %self.label, "completed");
        pending.events.push(Event::Complete);
        pending.then.append(&mut self.then_queue);
        self.resolve(Outcome::Completed, pending);
    }

    /// Bookkeeping at the end of a leg; returns `true` if the run is over
    fn end_leg(&mut self) -> bool {
        self.repeats_done = self.repeats_done.saturating_add(1);
        if let Some(legs) = self.repeat.legs() {
            if self.repeats_done >= legs {
                return true;
            }
        }
        if self.alternate {
            self.direction = self.direction.flipped();
        }
        self.elapsed_ms = 0.0;
        self.reset_motion();
        false
    }

    fn finish_leg(&mut self, pending: &mut Pending) {
        if self.end_leg() {
            self.complete(pending);
        } else {
            debug!(animation = %self.label, repeats = self.repeats_done, "repeating");
            pending.events.push(Event::Repeat);
        }
    }

    fn step(&mut self, dt_ms: f64, pending: &mut Pending) {
        let waiting = self.state == PlaybackState::Idle && self.armed;
        if self.state != PlaybackState::Running && !waiting {
            return;
        }

        let mut dt = dt_ms * self.speed;
        if waiting {
            if self.delay_remaining_ms > dt + COMPLETION_EPSILON_MS {
                self.delay_remaining_ms -= dt;
                return;
            }
            dt = (dt - self.delay_remaining_ms).max(0.0);
            self.delay_remaining_ms = 0.0;
            self.begin_running(pending);
        }

        self.elapsed_ms += dt;
        let elapsed_ms = self.elapsed_ms;
        let leg_done = match &mut self.motion {
            Motion::Tween(tween) => tween.is_finished(elapsed_ms),
            Motion::Spring { sim, .. } => sim.advance(dt),
        };
        self.render(pending);
        if leg_done {
            self.finish_leg(pending);
        }
    }

    /// Replay a spring run for `ms` without emitting events
    fn replay_spring(&mut self, ms: f64) -> bool {
        let frame_ms = self.frame_ms();
        let mut remaining = ms;
        while remaining > COMPLETION_EPSILON_MS {
            let step = remaining.min(frame_ms);
            remaining -= step;
            let settled = match &mut self.motion {
                Motion::Spring { sim, .. } => sim.advance(step),
                Motion::Tween(_) => return false,
            };
            if settled && self.end_leg() {
                return true;
            }
        }
        false
    }

    fn place_tween(&mut self, t: f64, duration: f64) -> Phase {
        let leg = if duration > 0.0 {
            ((t + COMPLETION_EPSILON_MS) / duration).floor()
        } else {
            f64::INFINITY
        };
        match self.repeat.legs() {
            Some(legs) if leg >= legs as f64 => {
                self.repeats_done = legs;
                if self.alternate && (legs - 1) % 2 == 1 {
                    self.direction = self.direction.flipped();
                }
                self.elapsed_ms = duration;
                Phase::Done
            }
            _ if leg.is_infinite() => Phase::Active,
            _ => {
                let leg = leg as u32;
                self.repeats_done = leg;
                if self.alternate && leg % 2 == 1 {
                    self.direction = self.direction.flipped();
                }
                self.elapsed_ms = (t - leg as f64 * duration).max(0.0);
                Phase::Active
            }
        }
    }

    /// Position the run as if it had started `local_ms` ago
    fn place(&mut self, local_ms: f64, mode: PlaceMode, pending: &mut Pending) {
        let was_moving = self.state == PlaybackState::Running;
        self.repeats_done = 0;
        self.direction = self.base_direction;
        self.elapsed_ms = 0.0;
        self.reset_motion();

        let phase = if local_ms < self.delay_ms {
            self.delay_remaining_ms = self.delay_ms - local_ms;
            Phase::Waiting
        } else {
            self.delay_remaining_ms = 0.0;
            let t = local_ms - self.delay_ms;
            let duration = match &self.motion {
                Motion::Tween(tween) => Some(tween.duration_ms()),
                Motion::Spring { .. } => None,
            };
            match duration {
                Some(duration) => self.place_tween(t, duration),
                None if self.replay_spring(t) => Phase::Done,
                None => Phase::Active,
            }
        };

        match (mode, &phase) {
            (PlaceMode::Activate, Phase::Waiting) => {
                self.state = PlaybackState::Idle;
                self.armed = true;
            }
            (PlaceMode::Activate, Phase::Active) => {
                if !was_moving {
                    self.begin_running(pending);
                }
                self.state = PlaybackState::Running;
                self.armed = false;
            }
            (PlaceMode::Pause, Phase::Waiting) => {
                self.state = PlaybackState::Paused;
                self.armed = true;
            }
            (PlaceMode::Pause, Phase::Active) => {
                self.state = PlaybackState::Paused;
                self.armed = false;
            }
            (PlaceMode::Activate | PlaceMode::Pause, Phase::Done) => {
                self.state = PlaybackState::Completed;
                self.armed = false;
            }
            (PlaceMode::Hold, _) => {
                self.armed = false;
            }
        }

        if !matches!(phase, Phase::Waiting) {
            self.render(pending);
        }
    }
}

impl FrameListener for RefCell<ControllerInner> {
    fn on_frame(&self, dt_ms: f64) {
        let mut pending = Pending::default();
        {
            let Ok(mut inner) = self.try_borrow_mut() else {
                warn!("controller is busy, skipping frame");
                return;
            };
            inner.step(dt_ms, &mut pending);
            pending.capture(&inner);
        }
        pending.dispatch();
    }
}

/// Playback control shared by controllers and timelines
pub trait Playback {
    fn play(&self);
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    fn reverse(&self);
    /// Jump to `progress` (0.0 to 1.0) without changing state
    fn seek(&self, progress: f32);
    /// Scale the rate time accumulates at; non-positive factors are ignored
    fn speed(&self, factor: f64);
    fn state(&self) -> PlaybackState;

    fn is_running(&self) -> bool {
        self.state() == PlaybackState::Running
    }

    /// Running, or committed to run once a start delay elapses
    fn is_active(&self) -> bool {
        self.is_running()
    }
}

/// Handle to one animation run
///
/// Clones share the same run.
#[derive(Clone)]
pub struct Controller {
    inner: Rc<RefCell<ControllerInner>>,
}

impl Controller {
    /// Create an idle tween controller
    pub fn tween(
        clock: ClockHandle,
        target: TargetHandle,
        tween: Tween,
        options: PlaybackOptions,
    ) -> Self {
        let label = label_for(tween.tracks());
        Self::from_motion(label, clock, target, Motion::Tween(tween), options)
    }

    /// Create an idle spring controller
    ///
    /// The simulation runs on normalized progress; `tracks` map it onto
    /// property values.
    pub fn spring(
        clock: ClockHandle,
        target: TargetHandle,
        tracks: Vec<PropertyTrack>,
        sim: SpringSimulation,
        estimate_ms: f64,
        options: PlaybackOptions,
    ) -> Self {
        let label = label_for(&tracks);
        let motion = Motion::Spring {
            tracks,
            sim,
            estimate_ms,
        };
        let controller = Self::from_motion(label, clock, target, motion, options);
        controller.inner.borrow_mut().reset_motion();
        controller
    }

    pub(crate) fn from_motion(
        label: String,
        clock: ClockHandle,
        target: TargetHandle,
        motion: Motion,
        options: PlaybackOptions,
    ) -> Self {
        let delay_ms = if options.delay_ms.is_finite() {
            options.delay_ms.max(0.0)
        } else {
            0.0
        };
        Self {
            inner: Rc::new(RefCell::new(ControllerInner {
                label,
                motion,
                target,
                clock,
                registration: None,
                state: PlaybackState::Idle,
                armed: false,
                delay_ms,
                delay_remaining_ms: delay_ms,
                elapsed_ms: 0.0,
                direction: Direction::Forward,
                base_direction: Direction::Forward,
                speed: 1.0,
                repeat: options.repeat,
                alternate: options.alternate,
                repeats_done: 0,
                callbacks: options.callbacks,
                then_queue: Vec::new(),
                completions: Vec::new(),
                last_progress: 0.0,
                last_values: Vec::new(),
                warned_missing_target: false,
            })),
        }
    }

    /// Run `f` against the state, then fix up the clock registration and
    /// dispatch whatever `f` produced
    fn with_inner<R>(&self, f: impl FnOnce(&mut ControllerInner, &mut Pending) -> R) -> R {
        let mut pending = Pending::default();
        let result = {
            let mut inner = self.inner.borrow_mut();
            let result = f(&mut inner, &mut pending);
            pending.capture(&inner);
            result
        };
        self.sync_registration();
        pending.dispatch();
        result
    }

    fn sync_registration(&self) {
        let mut inner = self.inner.borrow_mut();
        let registered = inner
            .registration
            .is_some_and(|id| inner.clock.is_registered(id));
        match (inner.wants_frames(), registered) {
            (true, false) => {
                let listener: Weak<dyn FrameListener> = {
                    let weak: Weak<RefCell<ControllerInner>> = Rc::downgrade(&self.inner);
                    weak
                };
                inner.registration = inner.clock.register(listener);
                if inner.registration.is_none() {
                    warn!(animation = %inner.label, "frame clock is gone, animation will not advance");
                }
            }
            (false, _) => inner.deregister(),
            (true, true) => {}
        }
    }

    /// Queue `callback` for the next completion
    ///
    /// Queued callbacks survive `stop()` and run, in order, after the
    /// `on_complete` callbacks of the next run that completes.
    pub fn then(&self, callback: impl FnOnce() + 'static) -> Self {
        self.inner.borrow_mut().then_queue.push(Box::new(callback));
        self.clone()
    }

    /// A future resolving when the current (or next) run ends
    pub fn finished(&self) -> Completion {
        let (completion, slot) = Completion::pending();
        self.inner.borrow_mut().completions.push(slot);
        completion
    }

    /// Linear progress through the current leg as last rendered
    pub fn progress(&self) -> f32 {
        self.inner.borrow().last_progress
    }

    /// Values written on the last rendered frame
    pub fn values(&self) -> Vec<(String, PropertyValue)> {
        self.inner.borrow().last_values.clone()
    }

    pub fn direction(&self) -> Direction {
        self.inner.borrow().direction
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.inner.borrow().elapsed_ms
    }

    /// Legs finished so far in the current run
    pub fn repeats_done(&self) -> u32 {
        self.inner.borrow().repeats_done
    }

    pub fn delay_ms(&self) -> f64 {
        self.inner.borrow().delay_ms
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.borrow().speed
    }

    /// Tween duration of one leg; `None` for springs
    pub fn duration_ms(&self) -> Option<f64> {
        match &self.inner.borrow().motion {
            Motion::Tween(tween) => Some(tween.duration_ms()),
            Motion::Spring { .. } => None,
        }
    }

    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    /// Length of all legs, excluding the delay; infinite for endless runs
    pub(crate) fn active_span_ms(&self) -> f64 {
        self.inner.borrow().active_span_ms()
    }

    pub(crate) fn set_delay_ms(&self, delay_ms: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.delay_ms = delay_ms.max(0.0);
        inner.delay_remaining_ms = inner.delay_ms;
    }

    pub(crate) fn set_duration_ms(&self, duration_ms: f64) {
        if let Motion::Tween(tween) = &mut self.inner.borrow_mut().motion {
            tween.set_duration_ms(duration_ms);
        }
    }

    pub(crate) fn add_repeat_hook(&self, hook: EventCallback) {
        self.inner.borrow_mut().callbacks.push_repeat(hook);
    }

    /// Flip the direction fresh runs start in, keeping the current one
    pub(crate) fn flip_base_direction(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.base_direction = inner.base_direction.flipped();
    }

    /// Whether mirroring this run in time also mirrors its direction
    ///
    /// An alternating run with an even number of legs ends where it began,
    /// so its mirror image plays in the same direction.
    pub(crate) fn mirrors_direction(&self) -> bool {
        let inner = self.inner.borrow();
        !(inner.alternate && inner.repeat.legs().is_some_and(|legs| legs % 2 == 0))
    }

    pub(crate) fn place(&self, local_ms: f64, mode: PlaceMode) {
        self.with_inner(|inner, pending| inner.place(local_ms, mode, pending));
    }

    /// Move this controller's registration behind every other listener
    pub(crate) fn reregister(&self) {
        let registered = {
            let mut inner = self.inner.borrow_mut();
            let registered = inner.registration.is_some();
            inner.deregister();
            registered
        };
        if registered {
            self.sync_registration();
        }
    }
}

impl Playback for Controller {
    fn play(&self) {
        self.with_inner(|inner, pending| inner.play(pending));
    }

    fn pause(&self) {
        self.with_inner(|inner, _| inner.pause());
    }

    fn resume(&self) {
        self.with_inner(|inner, _| inner.resume());
    }

    fn stop(&self) {
        self.with_inner(|inner, pending| inner.stop(pending));
    }

    fn reverse(&self) {
        self.with_inner(|inner, _| inner.reverse());
    }

    fn seek(&self, progress: f32) {
        self.with_inner(|inner, pending| inner.seek(progress, pending));
    }

    fn speed(&self, factor: f64) {
        self.with_inner(|inner, _| inner.set_speed(factor));
    }

    fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    fn is_active(&self) -> bool {
        self.inner.borrow().wants_frames()
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Controller")
            .field("label", &inner.label)
            .field("state", &inner.state)
            .field("progress", &inner.last_progress)
            .field("direction", &inner.direction)
            .finish()
    }
}

fn label_for(tracks: &[PropertyTrack]) -> String {
    if tracks.is_empty() {
        return "timer".to_string();
    }
    tracks
        .iter()
        .map(PropertyTrack::name)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrameClock;
    use crate::easing::Easing;
    use motif_core::RecordingTarget;
    use std::cell::Cell;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    struct Fixture {
        clock: FrameClock,
        circle: Rc<RecordingTarget>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clock: FrameClock::new(60.0),
                circle: Rc::new(RecordingTarget::new()),
            }
        }

        fn tween(&self, duration_ms: f64, options: PlaybackOptions) -> Controller {
            let tween = Tween::new(
                duration_ms,
                Easing::Linear,
                vec![PropertyTrack::new("r", 0.0, 100.0).unwrap()],
            );
            Controller::tween(
                self.clock.handle(),
                TargetHandle::new(&self.circle),
                tween,
                options,
            )
        }
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn play_runs_to_completion() {
        let fx = Fixture::new();
        let (completes, on_complete) = counter();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_complete(on_complete),
                ..Default::default()
            },
        );

        assert_eq!(anim.state(), PlaybackState::Idle);
        anim.play();
        assert_eq!(anim.state(), PlaybackState::Running);
        assert_eq!(fx.circle.last_number("r"), Some(0.0));

        fx.clock.advance(50.0);
        assert!((anim.progress() - 0.5).abs() < 0.01);

        fx.clock.advance(60.0);
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(fx.circle.last_number("r"), Some(100.0));
        assert_eq!(completes.get(), 1);
        assert_eq!(fx.clock.listener_count(), 0);
    }

    #[test]
    fn play_while_running_does_not_restart() {
        let fx = Fixture::new();
        let (starts, on_start) = counter();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_start(on_start),
                ..Default::default()
            },
        );
        anim.play();
        fx.clock.advance(50.0);
        let before = anim.progress();
        anim.play();
        assert_eq!(anim.progress(), before);
        assert_eq!(starts.get(), 1);
        assert_eq!(fx.clock.listener_count(), 1);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let fx = Fixture::new();
        let anim = fx.tween(1000.0, PlaybackOptions::default());
        anim.play();
        fx.clock.advance(200.0);
        anim.pause();
        let frozen = anim.progress();

        fx.clock.advance(300.0);
        assert_eq!(anim.progress(), frozen);
        assert_eq!(anim.state(), PlaybackState::Paused);

        anim.resume();
        fx.clock.advance(300.0);
        assert!(anim.progress() > frozen);
    }

    #[test]
    fn stop_keeps_progress_and_resolves_stopped() {
        let fx = Fixture::new();
        let anim = fx.tween(100.0, PlaybackOptions::default());
        let finished = anim.finished();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        anim.then(move || flag.set(true));

        anim.play();
        fx.clock.advance(50.0);
        anim.stop();
        anim.stop();

        assert_eq!(anim.state(), PlaybackState::Stopped);
        assert!((anim.progress() - 0.5).abs() < 0.01);
        assert_eq!(finished.outcome(), Some(Outcome::Stopped));
        assert!(!ran.get());

        // The queued callback fires on the next completion
        anim.play();
        fx.clock.advance(120.0);
        assert!(ran.get());
    }

    #[test]
    fn then_callbacks_run_in_order_after_complete() {
        let fx = Fixture::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let anim = fx.tween(
            50.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_complete(move || l1.borrow_mut().push("complete")),
                ..Default::default()
            },
        );
        anim.then(move || l2.borrow_mut().push("first"))
            .then(move || l3.borrow_mut().push("second"))
            .play();
        fx.clock.advance(100.0);
        assert_eq!(*log.borrow(), vec!["complete", "first", "second"]);
    }

    #[test]
    fn finite_loop_repeats_then_completes() {
        let fx = Fixture::new();
        let (repeats, on_repeat) = counter();
        let (completes, on_complete) = counter();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                repeat: Repeat::Times(3),
                callbacks: Callbacks::new()
                    .on_repeat(on_repeat)
                    .on_complete(on_complete),
                ..Default::default()
            },
        );
        anim.play();
        fx.clock.advance(1000.0);
        assert_eq!(repeats.get(), 2);
        assert_eq!(completes.get(), 1);
    }

    #[test]
    fn alternate_flips_direction_between_legs() {
        let fx = Fixture::new();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                repeat: Repeat::Times(2),
                alternate: true,
                ..Default::default()
            },
        );
        anim.play();
        fx.clock.advance(150.0);
        assert_eq!(anim.direction(), Direction::Reverse);
        let r = fx.circle.last_number("r").unwrap();
        assert!(r > 40.0 && r < 60.0, "r = {r}");

        fx.clock.advance(100.0);
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(fx.circle.last_number("r"), Some(0.0));
    }

    #[test]
    fn reverse_mid_flight_keeps_position() {
        let fx = Fixture::new();
        let anim = fx.tween(100.0, PlaybackOptions::default());
        anim.play();
        fx.clock.advance(5.0 * FRAME_MS);
        let before = fx.circle.last_number("r").unwrap();

        anim.reverse();
        fx.clock.advance(FRAME_MS);
        let after = fx.circle.last_number("r").unwrap();
        assert!(after < before, "{after} should be below {before}");
        assert!(before - after < 20.0);

        fx.clock.advance(200.0);
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(fx.circle.last_number("r"), Some(0.0));
    }

    #[test]
    fn reverse_before_play_runs_backwards_over_full_duration() {
        let fx = Fixture::new();
        let anim = fx.tween(1000.0, PlaybackOptions::default());
        anim.reverse();
        anim.play();
        assert_eq!(fx.circle.last_number("r"), Some(100.0));

        fx.clock.advance(50.0);
        assert_eq!(anim.state(), PlaybackState::Running);
        let r = fx.circle.last_number("r").unwrap();
        assert!(r > 90.0 && r < 100.0, "r = {r}");

        fx.clock.advance(1000.0);
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(fx.circle.last_number("r"), Some(0.0));
    }

    #[test]
    fn alternate_reports_progress_per_leg() {
        let fx = Fixture::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                repeat: Repeat::Times(2),
                alternate: true,
                callbacks: Callbacks::new().on_update(move |u| sink.borrow_mut().push(u.progress)),
                ..Default::default()
            },
        );
        anim.play();
        fx.clock.advance(300.0);

        let seen = seen.borrow();
        assert!(seen.iter().all(|p| (0.0..=1.0).contains(p)));
        let drops = seen.windows(2).filter(|w| w[1] < w[0]).count();
        assert_eq!(drops, 1, "progress: {seen:?}");
        assert_eq!(seen.iter().filter(|p| **p > 0.999).count(), 2);
        assert!(seen.last().is_some_and(|p| *p > 0.999));
    }

    #[test]
    fn seek_renders_without_changing_state() {
        let fx = Fixture::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_update(move |u| sink.borrow_mut().push(u.progress)),
                ..Default::default()
            },
        );
        anim.seek(0.0);
        anim.seek(1.0);
        assert_eq!(*seen.borrow(), vec![0.0, 1.0]);
        assert_eq!(anim.state(), PlaybackState::Idle);
        assert_eq!(fx.circle.last_number("r"), Some(100.0));
    }

    #[test]
    fn speed_scales_future_ticks() {
        let fx = Fixture::new();
        let anim = fx.tween(1000.0, PlaybackOptions::default());
        anim.play();
        anim.speed(2.0);
        fx.clock.advance(250.0);
        assert!((anim.progress() - 0.5).abs() < 0.02);

        anim.speed(0.0);
        anim.speed(f64::NAN);
        assert_eq!(anim.playback_rate(), 2.0);
    }

    #[test]
    fn delay_keeps_controller_idle() {
        let fx = Fixture::new();
        let (starts, on_start) = counter();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                delay_ms: 50.0,
                callbacks: Callbacks::new().on_start(on_start),
                ..Default::default()
            },
        );
        anim.play();
        fx.clock.advance(40.0);
        assert_eq!(anim.state(), PlaybackState::Idle);
        assert!(anim.is_active());
        assert_eq!(starts.get(), 0);

        fx.clock.advance(20.0);
        assert_eq!(anim.state(), PlaybackState::Running);
        assert_eq!(starts.get(), 1);
    }

    #[test]
    fn zero_duration_completes_on_first_tick() {
        let fx = Fixture::new();
        let anim = fx.tween(0.0, PlaybackOptions::default());
        anim.play();
        fx.clock.run_frames(1);
        assert_eq!(anim.state(), PlaybackState::Completed);
        assert_eq!(fx.circle.last_number("r"), Some(100.0));
    }

    #[test]
    fn missing_target_still_completes() {
        let fx = Fixture::new();
        let (completes, on_complete) = counter();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_complete(on_complete),
                ..Default::default()
            },
        );
        fx.circle.detach();
        anim.play();
        fx.clock.advance(150.0);
        assert_eq!(completes.get(), 1);
        assert_eq!(fx.circle.write_count(), 0);
    }

    #[test]
    fn callbacks_may_control_their_own_controller() {
        let fx = Fixture::new();
        let slot: Rc<RefCell<Option<Controller>>> = Rc::new(RefCell::new(None));
        let handle = slot.clone();
        let anim = fx.tween(
            100.0,
            PlaybackOptions {
                callbacks: Callbacks::new().on_update(move |u| {
                    if u.progress >= 0.5 {
                        if let Some(anim) = handle.borrow().as_ref() {
                            anim.pause();
                        }
                    }
                }),
                ..Default::default()
            },
        );
        *slot.borrow_mut() = Some(anim.clone());
        anim.play();
        fx.clock.advance(200.0);
        assert_eq!(anim.state(), PlaybackState::Paused);
        // Break the Rc cycle through the callback
        slot.borrow_mut().take();
    }

    #[test]
    fn dropped_controller_leaves_the_clock() {
        let fx = Fixture::new();
        let anim = fx.tween(100.0, PlaybackOptions::default());
        anim.play();
        drop(anim);
        fx.clock.run_frames(1);
        assert_eq!(fx.clock.listener_count(), 0);
    }

    #[test]
    fn completion_future_resolves() {
        let fx = Fixture::new();
        let anim = fx.tween(100.0, PlaybackOptions::default());
        let finished = anim.finished();
        anim.play();
        fx.clock.advance(200.0);
        assert_eq!(pollster::block_on(finished), Outcome::Completed);
    }
}
