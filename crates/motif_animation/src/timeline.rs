//! Timeline orchestration for multiple animations
//!
//! A timeline owns one sub-controller per entry plus an aggregate
//! controller spanning the whole schedule. Playback operations fan out to
//! every entry with its resolved start offset; the aggregate carries the
//! timeline's own progress, repeats and completion.
//!
//! Entries register with the frame clock in entry order and the aggregate
//! always registers last, so within a frame entries write their values
//! first and the timeline completes after its last entry.

use crate::animation::{AnimationConfig, EngineContext};
use crate::controller::{
    Callbacks, Completion, Controller, Motion, PlaceMode, Playback, PlaybackOptions, PlaybackState,
    Repeat,
};
use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::tween::Tween;
use crate::COMPLETION_EPSILON_MS;
use motif_core::TargetHandle;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use tracing::{debug, warn};

new_key_type! {
    pub struct TimelineEntryId;
}

/// Where an entry starts
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Position {
    /// At timeline zero, alongside everything else
    #[default]
    Parallel,
    /// At an absolute offset in milliseconds
    At(f64),
    /// Relative to the end of the previous entry (`+=N` / `-=N`)
    Relative(f64),
    /// A percentage of the total timeline duration (`P%`)
    Percent(f64),
}

impl FromStr for Position {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        let invalid = || AnimationError::InvalidPosition(token.to_string());
        let number = |text: &str| -> Result<f64> {
            text.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(invalid)
        };

        if token.is_empty() {
            return Ok(Position::Parallel);
        }
        if let Some(rest) = token.strip_prefix("+=") {
            return number(rest).map(Position::Relative);
        }
        if let Some(rest) = token.strip_prefix("-=") {
            return number(rest).map(|n| Position::Relative(-n));
        }
        if let Some(rest) = token.strip_suffix('%') {
            return number(rest).map(Position::Percent);
        }
        number(token).map(Position::At)
    }
}

/// Timeline-wide settings
#[derive(Clone, Debug, Default)]
pub struct TimelineOptions {
    /// Extra start offset added per entry index
    pub stagger_ms: f64,
    pub repeat: Repeat,
    /// Callbacks for the timeline as a whole
    pub callbacks: Callbacks,
}

struct TimelineEntry {
    controller: Controller,
    position: Position,
    /// The entry's own delay, folded into its start
    delay_ms: f64,
    span_ms: f64,
    start_ms: f64,
}

struct TimelineInner {
    ctx: EngineContext,
    entries: SlotMap<TimelineEntryId, TimelineEntry>,
    order: Vec<TimelineEntryId>,
    stagger_ms: f64,
    total_ms: f64,
    reversed: bool,
    aggregate: Controller,
}

impl TimelineInner {
    /// Lay entries out in order; `percent_base` is the total percentages
    /// refer to
    fn layout(&mut self, percent_base: f64) -> f64 {
        let mut previous_end = 0.0;
        let mut total: f64 = 0.0;
        for (index, id) in self.order.iter().enumerate() {
            let Some(entry) = self.entries.get_mut(*id) else {
                continue;
            };
            let base = match entry.position {
                Position::Parallel => 0.0,
                Position::At(ms) => ms,
                Position::Relative(delta) => previous_end + delta,
                Position::Percent(percent) => percent_base * percent / 100.0,
            };
            entry.start_ms = (base + self.stagger_ms * index as f64).max(0.0) + entry.delay_ms;
            previous_end = entry.start_ms + entry.span_ms;
            total = total.max(previous_end);
        }
        total
    }

    fn resolve(&mut self) {
        let mut total = self.layout(0.0);
        let has_percent = self
            .entries
            .values()
            .any(|entry| matches!(entry.position, Position::Percent(_)));
        if has_percent {
            total = self.layout(total);
        }
        self.total_ms = total;

        if self.reversed && total.is_finite() {
            for entry in self.entries.values_mut() {
                entry.start_ms = (total - entry.start_ms - entry.span_ms).max(0.0);
            }
        }
        self.aggregate.set_duration_ms(total);
        debug!(entries = self.order.len(), total_ms = total, "timeline resolved");
    }

    /// Keep the schedule entries are already playing to, trimming the
    /// total to the furthest end that is left
    fn retain_schedule(&mut self) {
        let total = self
            .entries
            .values()
            .map(|entry| entry.start_ms + entry.span_ms)
            .fold(0.0, f64::max);
        self.total_ms = total;
        self.aggregate.set_duration_ms(total);
        debug!(entries = self.order.len(), total_ms = total, "timeline schedule kept");
    }

    fn ordered(&self) -> Vec<(Controller, f64, f64)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(*id))
            .map(|entry| (entry.controller.clone(), entry.start_ms, entry.span_ms))
            .collect()
    }
}

/// A composition of animations on one schedule
///
/// Clones share the same timeline.
#[derive(Clone)]
pub struct Timeline {
    inner: Rc<RefCell<TimelineInner>>,
}

impl Timeline {
    pub(crate) fn new(ctx: EngineContext, options: TimelineOptions) -> Self {
        let aggregate = Controller::from_motion(
            "timeline".to_string(),
            ctx.clock.clone(),
            TargetHandle::detached(),
            Motion::Tween(Tween::new(0.0, Easing::Linear, Vec::new())),
            PlaybackOptions {
                delay_ms: 0.0,
                repeat: options.repeat,
                alternate: false,
                callbacks: options.callbacks,
            },
        );
        let timeline = Self {
            inner: Rc::new(RefCell::new(TimelineInner {
                ctx,
                entries: SlotMap::with_key(),
                order: Vec::new(),
                stagger_ms: options.stagger_ms.max(0.0),
                total_ms: 0.0,
                reversed: false,
                aggregate: aggregate.clone(),
            })),
        };

        let weak: Weak<RefCell<TimelineInner>> = Rc::downgrade(&timeline.inner);
        aggregate.add_repeat_hook(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Timeline { inner }.restart_entries();
            }
        }));
        timeline
    }

    /// Append an entry at `position`
    ///
    /// Adding to a playing timeline starts the new entry at its place in the
    /// schedule right away.
    pub fn add(&self, config: AnimationConfig, position: Position) -> Result<TimelineEntryId> {
        let ctx = self.inner.borrow().ctx.clone();
        let controller = config.build(&ctx)?;
        let delay_ms = controller.delay_ms();
        controller.set_delay_ms(0.0);
        let span_ms = controller.active_span_ms();

        let (id, start_ms, aggregate) = {
            let mut inner = self.inner.borrow_mut();
            if inner.reversed && controller.mirrors_direction() {
                controller.flip_base_direction();
            }
            let id = inner.entries.insert(TimelineEntry {
                controller: controller.clone(),
                position,
                delay_ms,
                span_ms,
                start_ms: 0.0,
            });
            inner.order.push(id);
            inner.resolve();
            let start_ms = inner.entries.get(id).map_or(0.0, |e| e.start_ms);
            (id, start_ms, inner.aggregate.clone())
        };

        if let Some(mode) = live_mode(aggregate.state()) {
            controller.place(aggregate.elapsed_ms() - start_ms, mode);
            aggregate.reregister();
        }
        Ok(id)
    }

    /// Detach one entry; its siblings keep their schedule
    ///
    /// While the timeline is playing or paused, entries anchored to the
    /// removed one stay where they are. The layout is recomputed from
    /// positions on the next pass.
    pub fn remove(&self, id: TimelineEntryId) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.entries.remove(id);
            if removed.is_some() {
                inner.order.retain(|other| *other != id);
                if live_mode(inner.aggregate.state()).is_some() {
                    inner.retain_schedule();
                } else {
                    inner.resolve();
                }
            }
            removed
        };
        match removed {
            Some(entry) => {
                entry.controller.stop();
                true
            }
            None => false,
        }
    }

    /// Stop and detach every entry
    pub fn clear(&self) {
        let (entries, aggregate) = {
            let mut inner = self.inner.borrow_mut();
            let entries: Vec<Controller> = inner
                .entries
                .drain()
                .map(|(_, entry)| entry.controller)
                .collect();
            inner.order.clear();
            inner.resolve();
            (entries, inner.aggregate.clone())
        };
        for controller in entries {
            controller.stop();
        }
        aggregate.stop();
    }

    /// Total length of one pass, including entry delays and stagger
    pub fn duration_ms(&self) -> f64 {
        self.inner.borrow().total_ms
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().order.is_empty()
    }

    pub fn entry_ids(&self) -> Vec<TimelineEntryId> {
        self.inner.borrow().order.clone()
    }

    pub fn entry_state(&self, id: TimelineEntryId) -> Option<PlaybackState> {
        self.entry_controller(id).map(|c| c.state())
    }

    pub fn entry_controller(&self, id: TimelineEntryId) -> Option<Controller> {
        self.inner
            .borrow()
            .entries
            .get(id)
            .map(|entry| entry.controller.clone())
    }

    /// Resolved start of an entry, in timeline time
    pub fn entry_start_ms(&self, id: TimelineEntryId) -> Option<f64> {
        self.inner.borrow().entries.get(id).map(|entry| entry.start_ms)
    }

    /// Linear progress through the current pass
    pub fn progress(&self) -> f32 {
        self.aggregate().progress()
    }

    /// Time since the start of the current pass
    pub fn playhead_ms(&self) -> f64 {
        self.aggregate().elapsed_ms()
    }

    /// Queue `callback` for the next time the timeline completes
    pub fn then(&self, callback: impl FnOnce() + 'static) -> Self {
        self.aggregate().then(callback);
        self.clone()
    }

    pub fn finished(&self) -> Completion {
        self.aggregate().finished()
    }

    fn aggregate(&self) -> Controller {
        self.inner.borrow().aggregate.clone()
    }

    fn parts(&self) -> (Vec<(Controller, f64, f64)>, Controller) {
        let inner = self.inner.borrow();
        (inner.ordered(), inner.aggregate.clone())
    }

    /// Put every entry where the playhead says it should be
    ///
    /// Finished entries are placed first so their final values never land
    /// on top of an entry that is still moving.
    fn place_entries(entries: &[(Controller, f64, f64)], playhead_ms: f64, mode: PlaceMode) {
        let finished =
            |start: f64, span: f64| playhead_ms - start + COMPLETION_EPSILON_MS >= span;
        for (controller, start, span) in entries {
            if finished(*start, *span) {
                controller.place(playhead_ms - start, mode);
            }
        }
        for (controller, start, span) in entries {
            if !finished(*start, *span) {
                controller.place(playhead_ms - start, mode);
            }
        }
    }

    fn restart_entries(&self) {
        self.inner.borrow_mut().resolve();
        let (entries, aggregate) = self.parts();
        debug!(entries = entries.len(), "timeline repeating");
        Self::place_entries(&entries, 0.0, PlaceMode::Activate);
        aggregate.reregister();
    }
}

/// Placement mode matching the aggregate's state, when entries should move
fn live_mode(state: PlaybackState) -> Option<PlaceMode> {
    match state {
        PlaybackState::Running => Some(PlaceMode::Activate),
        PlaybackState::Paused => Some(PlaceMode::Pause),
        _ => None,
    }
}

impl Playback for Timeline {
    fn play(&self) {
        let aggregate = self.aggregate();
        let playhead = match aggregate.state() {
            PlaybackState::Running => return,
            PlaybackState::Paused => {
                self.resume();
                return;
            }
            PlaybackState::Idle => aggregate.elapsed_ms(),
            PlaybackState::Stopped | PlaybackState::Completed => 0.0,
        };

        self.inner.borrow_mut().resolve();
        let (entries, aggregate) = self.parts();
        debug!(
            entries = entries.len(),
            total_ms = self.duration_ms(),
            playhead_ms = playhead,
            "timeline playing"
        );
        Self::place_entries(&entries, playhead, PlaceMode::Activate);
        aggregate.play();
    }

    fn pause(&self) {
        let (entries, aggregate) = self.parts();
        for (controller, _, _) in &entries {
            controller.pause();
        }
        aggregate.pause();
    }

    fn resume(&self) {
        let (entries, aggregate) = self.parts();
        if aggregate.state() != PlaybackState::Paused {
            return;
        }
        for (controller, _, _) in &entries {
            controller.resume();
        }
        aggregate.resume();
    }

    fn stop(&self) {
        let (entries, aggregate) = self.parts();
        for (controller, _, _) in &entries {
            controller.stop();
        }
        aggregate.stop();
    }

    /// Mirror the schedule around the playhead
    ///
    /// Entries that already played will play again backwards, entries that
    /// had not started count as done. Endless timelines cannot be mirrored.
    fn reverse(&self) {
        let total = self.duration_ms();
        if !total.is_finite() {
            warn!("cannot reverse an endless timeline");
            return;
        }
        let aggregate = self.aggregate();
        aggregate.reverse();
        {
            let mut inner = self.inner.borrow_mut();
            inner.reversed = !inner.reversed;
            for entry in inner.entries.values() {
                if entry.controller.mirrors_direction() {
                    entry.controller.flip_base_direction();
                }
            }
            inner.resolve();
        }

        let (entries, aggregate) = self.parts();
        let mode = live_mode(aggregate.state()).unwrap_or(PlaceMode::Hold);
        Self::place_entries(&entries, aggregate.elapsed_ms(), mode);
        aggregate.reregister();
    }

    fn seek(&self, progress: f32) {
        let total = self.duration_ms();
        if !total.is_finite() {
            warn!("cannot seek an endless timeline");
            return;
        }
        let (entries, aggregate) = self.parts();
        aggregate.seek(progress);
        let mode = live_mode(aggregate.state()).unwrap_or(PlaceMode::Hold);
        Self::place_entries(&entries, aggregate.elapsed_ms(), mode);
        aggregate.reregister();
    }

    fn speed(&self, factor: f64) {
        let (entries, aggregate) = self.parts();
        for (controller, _, _) in &entries {
            controller.speed(factor);
        }
        aggregate.speed(factor);
    }

    fn state(&self) -> PlaybackState {
        self.aggregate().state()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Timeline")
            .field("entries", &inner.order.len())
            .field("total_ms", &inner.total_ms)
            .field("state", &inner.aggregate.state())
            .finish()
    }
}

/// Build a timeline from `configs`, each placed by `position(index)`
pub(crate) fn compose(
    ctx: EngineContext,
    configs: Vec<AnimationConfig>,
    options: TimelineOptions,
    position: impl Fn(usize) -> Position,
) -> Result<Timeline> {
    let timeline = Timeline::new(ctx, options);
    for (index, config) in configs.into_iter().enumerate() {
        timeline.add(config, position(index))?;
    }
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrameClock;
    use crate::config::EngineConfig;
    use crate::spring::SpringConfig;
    use motif_core::RecordingTarget;
    use std::cell::Cell;

    struct Fixture {
        clock: FrameClock,
        ctx: EngineContext,
        target: Rc<RecordingTarget>,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = FrameClock::new(60.0);
            let ctx = EngineContext {
                clock: clock.handle(),
                config: Rc::new(EngineConfig::default()),
            };
            Self {
                clock,
                ctx,
                target: Rc::new(RecordingTarget::new()),
            }
        }

        fn config(&self, property: &str, duration_ms: f64) -> AnimationConfig {
            AnimationConfig::new(&self.target)
                .prop(property, 0.0, 100.0)
                .duration(duration_ms)
                .easing(Easing::Linear)
        }

        fn timeline(&self, options: TimelineOptions) -> Timeline {
            Timeline::new(self.ctx.clone(), options)
        }
    }

    #[test]
    fn parses_positions() {
        assert_eq!("".parse::<Position>().unwrap(), Position::Parallel);
        assert_eq!("250".parse::<Position>().unwrap(), Position::At(250.0));
        assert_eq!("+=50".parse::<Position>().unwrap(), Position::Relative(50.0));
        assert_eq!("-=25".parse::<Position>().unwrap(), Position::Relative(-25.0));
        assert_eq!("50%".parse::<Position>().unwrap(), Position::Percent(50.0));
        assert!(matches!(
            "soon".parse::<Position>(),
            Err(AnimationError::InvalidPosition(_))
        ));
    }

    #[test]
    fn resolves_relative_and_absolute_offsets() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 100.0), Position::Relative(50.0))
            .unwrap();
        let c = timeline
            .add(fx.config("c", 100.0), Position::Relative(-30.0))
            .unwrap();
        let d = timeline.add(fx.config("d", 40.0), Position::At(10.0)).unwrap();

        assert_eq!(timeline.entry_start_ms(a), Some(0.0));
        assert_eq!(timeline.entry_start_ms(b), Some(150.0));
        assert_eq!(timeline.entry_start_ms(c), Some(220.0));
        assert_eq!(timeline.entry_start_ms(d), Some(10.0));
        assert_eq!(timeline.duration_ms(), 320.0);
    }

    #[test]
    fn percentage_positions_use_total() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 400.0), Position::Parallel).unwrap();
        let half = timeline
            .add(fx.config("b", 100.0), Position::Percent(50.0))
            .unwrap();
        assert_eq!(timeline.entry_start_ms(half), Some(200.0));
        assert_eq!(timeline.duration_ms(), 400.0);
    }

    #[test]
    fn entry_delay_shifts_its_start() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 100.0).delay(20.0), Position::Relative(0.0))
            .unwrap();
        assert_eq!(timeline.entry_start_ms(b), Some(120.0));
        assert_eq!(timeline.duration_ms(), 220.0);
    }

    #[test]
    fn stagger_offsets_entries() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions {
            stagger_ms: 50.0,
            ..Default::default()
        });
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|p| timeline.add(fx.config(p, 100.0), Position::Parallel).unwrap())
            .collect();
        assert_eq!(timeline.duration_ms(), 200.0);

        timeline.play();
        fx.clock.advance(40.0);
        assert_eq!(timeline.entry_state(ids[0]), Some(PlaybackState::Running));
        assert_eq!(timeline.entry_state(ids[1]), Some(PlaybackState::Idle));
        assert_eq!(timeline.entry_state(ids[2]), Some(PlaybackState::Idle));

        fx.clock.advance(20.0);
        assert_eq!(timeline.entry_state(ids[1]), Some(PlaybackState::Running));

        fx.clock.advance(200.0);
        assert_eq!(timeline.state(), PlaybackState::Completed);
        for id in ids {
            assert_eq!(timeline.entry_state(id), Some(PlaybackState::Completed));
        }
    }

    #[test]
    fn timeline_completes_after_its_entries() {
        let fx = Fixture::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let timeline = fx.timeline(TimelineOptions {
            callbacks: Callbacks::new().on_complete(move || l3.borrow_mut().push("timeline")),
            ..Default::default()
        });
        timeline
            .add(
                fx.config("a", 100.0)
                    .on_complete(move || l1.borrow_mut().push("a")),
                Position::Parallel,
            )
            .unwrap();
        timeline
            .add(
                fx.config("b", 100.0)
                    .on_complete(move || l2.borrow_mut().push("b")),
                Position::Relative(0.0),
            )
            .unwrap();

        timeline.play();
        fx.clock.advance(250.0);
        assert_eq!(*log.borrow(), vec!["a", "b", "timeline"]);
    }

    #[test]
    fn pause_and_resume_fan_out() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 200.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 200.0), Position::Relative(0.0))
            .unwrap();

        timeline.play();
        fx.clock.advance(100.0);
        timeline.pause();
        assert_eq!(timeline.entry_state(a), Some(PlaybackState::Paused));
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Paused));
        let frozen = fx.target.last_number("a");

        fx.clock.advance(500.0);
        assert_eq!(fx.target.last_number("a"), frozen);

        timeline.resume();
        assert_eq!(timeline.entry_state(a), Some(PlaybackState::Running));
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Idle));
        fx.clock.advance(150.0);
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Running));
    }

    #[test]
    fn seek_places_entries() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        timeline
            .add(fx.config("b", 100.0), Position::Relative(0.0))
            .unwrap();

        timeline.seek(0.75);
        assert_eq!(fx.target.last_number("a"), Some(100.0));
        assert_eq!(fx.target.last_number("b"), Some(50.0));
        assert_eq!(timeline.state(), PlaybackState::Idle);

        // Playing from idle continues from the sought position
        timeline.play();
        fx.clock.advance(60.0);
        assert_eq!(timeline.state(), PlaybackState::Completed);
        assert_eq!(fx.target.last_number("b"), Some(100.0));
    }

    #[test]
    fn reverse_plays_the_schedule_backwards() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        timeline
            .add(fx.config("b", 100.0), Position::Relative(0.0))
            .unwrap();

        timeline.play();
        fx.clock.advance(150.0);
        let b_before = fx.target.last_number("b").unwrap();
        assert!(b_before > 40.0 && b_before < 60.0);

        timeline.reverse();
        fx.clock.advance(50.0);
        let b_after = fx.target.last_number("b").unwrap();
        assert!(b_after < b_before);

        fx.clock.advance(200.0);
        assert_eq!(timeline.state(), PlaybackState::Completed);
        assert_eq!(fx.target.last_number("a"), Some(0.0));
        assert_eq!(fx.target.last_number("b"), Some(0.0));
    }

    #[test]
    fn repeating_timeline_restarts_entries() {
        let fx = Fixture::new();
        let repeats = Rc::new(RefCell::new(0));
        let count = repeats.clone();
        let timeline = fx.timeline(TimelineOptions {
            repeat: Repeat::Times(2),
            callbacks: Callbacks::new().on_repeat(move || *count.borrow_mut() += 1),
            ..Default::default()
        });
        let starts = Rc::new(RefCell::new(0));
        let s = starts.clone();
        timeline
            .add(
                fx.config("a", 100.0).on_start(move || *s.borrow_mut() += 1),
                Position::Parallel,
            )
            .unwrap();

        timeline.play();
        fx.clock.advance(500.0);
        assert_eq!(*repeats.borrow(), 1);
        assert_eq!(*starts.borrow(), 2);
        assert_eq!(timeline.state(), PlaybackState::Completed);
    }

    #[test]
    fn remove_and_clear_detach_entries() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline.add(fx.config("b", 100.0), Position::At(100.0)).unwrap();
        timeline.play();
        fx.clock.advance(50.0);

        assert!(timeline.remove(a));
        assert!(!timeline.remove(a));
        assert_eq!(timeline.duration_ms(), 200.0);
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Idle));

        timeline.clear();
        assert!(timeline.is_empty());
        assert_eq!(timeline.state(), PlaybackState::Stopped);
        fx.clock.run_frames(1);
        assert_eq!(fx.clock.listener_count(), 0);
    }

    #[test]
    fn remove_keeps_relative_siblings_on_schedule() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 100.0), Position::Relative(0.0))
            .unwrap();
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        timeline.then(move || flag.set(true)).play();

        fx.clock.advance(50.0);
        assert!(timeline.remove(a));
        assert_eq!(timeline.entry_start_ms(b), Some(100.0));
        assert_eq!(timeline.duration_ms(), 200.0);

        fx.clock.advance(70.0);
        assert_eq!(timeline.state(), PlaybackState::Running);
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Running));
        assert!(!done.get());

        fx.clock.advance(100.0);
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Completed));
        assert_eq!(timeline.state(), PlaybackState::Completed);
        assert_eq!(fx.target.last_number("b"), Some(100.0));
        assert!(done.get());

        // The next pass lays b out from its position again
        timeline.play();
        assert_eq!(timeline.entry_start_ms(b), Some(0.0));
        assert_eq!(timeline.duration_ms(), 100.0);
    }

    #[test]
    fn remove_while_idle_relayouts() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 100.0), Position::Relative(0.0))
            .unwrap();
        assert!(timeline.remove(a));
        assert_eq!(timeline.entry_start_ms(b), Some(0.0));
        assert_eq!(timeline.duration_ms(), 100.0);
    }

    #[test]
    fn percentage_follows_later_entries() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let half = timeline
            .add(fx.config("p", 100.0), Position::Percent(50.0))
            .unwrap();
        assert_eq!(timeline.entry_start_ms(half), Some(50.0));

        timeline.add(fx.config("c", 300.0), Position::At(100.0)).unwrap();
        assert_eq!(timeline.duration_ms(), 400.0);
        assert_eq!(timeline.entry_start_ms(half), Some(200.0));
    }

    #[test]
    fn spring_entry_is_scheduled_by_its_settle_estimate() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let spring = timeline
            .add(
                AnimationConfig::new(&fx.target)
                    .prop("s", 0.0, 100.0)
                    .spring(SpringConfig::new(200.0, 20.0, 1.0)),
                Position::Parallel,
            )
            .unwrap();
        let after = timeline
            .add(fx.config("t", 100.0), Position::Relative(0.0))
            .unwrap();

        let estimate = timeline.entry_controller(spring).unwrap().active_span_ms();
        assert!(estimate > 0.0 && estimate.is_finite());
        assert_eq!(timeline.entry_start_ms(after), Some(estimate));
        assert_eq!(timeline.duration_ms(), estimate + 100.0);

        timeline.play();
        fx.clock.advance(estimate / 2.0);
        assert_eq!(timeline.entry_state(after), Some(PlaybackState::Idle));

        fx.clock.advance(estimate + 600.0);
        assert_eq!(timeline.state(), PlaybackState::Completed);
        assert_eq!(timeline.entry_state(spring), Some(PlaybackState::Completed));
        assert_eq!(fx.target.last_number("s"), Some(100.0));
        assert_eq!(fx.target.last_number("t"), Some(100.0));
    }

    #[test]
    fn reverse_before_play_runs_the_mirrored_schedule() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        let a = timeline.add(fx.config("a", 100.0), Position::Parallel).unwrap();
        let b = timeline
            .add(fx.config("b", 100.0), Position::Relative(0.0))
            .unwrap();

        timeline.reverse();
        timeline.play();
        fx.clock.advance(50.0);
        assert_eq!(timeline.state(), PlaybackState::Running);
        assert_eq!(timeline.entry_state(b), Some(PlaybackState::Running));
        assert_ne!(timeline.entry_state(a), Some(PlaybackState::Running));
        let b_value = fx.target.last_number("b").unwrap();
        assert!(b_value > 40.0 && b_value < 60.0, "b = {b_value}");

        fx.clock.advance(200.0);
        assert_eq!(timeline.state(), PlaybackState::Completed);
        assert_eq!(fx.target.last_number("a"), Some(0.0));
        assert_eq!(fx.target.last_number("b"), Some(0.0));
    }

    #[test]
    fn add_while_playing_joins_the_schedule() {
        let fx = Fixture::new();
        let timeline = fx.timeline(TimelineOptions::default());
        timeline.add(fx.config("a", 200.0), Position::Parallel).unwrap();
        timeline.play();
        fx.clock.advance(100.0);

        let late = timeline.add(fx.config("b", 100.0), Position::At(50.0)).unwrap();
        assert_eq!(timeline.entry_state(late), Some(PlaybackState::Running));
        fx.clock.advance(60.0);
        assert_eq!(timeline.entry_state(late), Some(PlaybackState::Completed));
    }
}
