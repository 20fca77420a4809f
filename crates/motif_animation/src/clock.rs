//! Frame clock
//!
//! The clock is the only place time advances. Every frame it calls each
//! registered [`FrameListener`] once, in registration order. Listeners are
//! held weakly: dropping the last strong reference to a controller is enough
//! for it to go away, the clock forgets it on the next frame.
//!
//! Time comes from a [`TimeSource`]. [`VirtualTime`] makes runs
//! deterministic: advancing it by `X` ms and pumping the clock produces
//! exactly the frames real time would have produced over that interval.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{error, trace};

/// Slack allowed when deciding whether a full frame has accumulated
const FRAME_EPSILON_MS: f64 = 1e-6;

/// Something that runs once per frame
pub trait FrameListener {
    /// Called with the frame interval in milliseconds
    fn on_frame(&self, dt_ms: f64);
}

/// A monotonic clock reading in milliseconds
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time
pub struct SystemTime {
    origin: Instant,
}

impl SystemTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTime {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced time, shared between clones
#[derive(Clone, Debug, Default)]
pub struct VirtualTime {
    now: Rc<Cell<f64>>,
}

impl VirtualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }
}

impl TimeSource for VirtualTime {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Identifies one registration with a clock
///
/// Ids are never reused, so a listener that deregisters and registers again
/// within one frame gets a fresh id and is not visited twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct ClockInner {
    listeners: IndexMap<ListenerId, Weak<dyn FrameListener>>,
    next_id: u64,
    frame_ms: f64,
    pending_ms: f64,
    elapsed_ms: f64,
    frame_count: u64,
    last_pump_ms: Option<f64>,
    ticking: bool,
}

impl ClockInner {
    fn register(&mut self, listener: Weak<dyn FrameListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, listener);
        id
    }
}

/// The frame clock that ticks every registered animation
pub struct FrameClock {
    inner: Rc<RefCell<ClockInner>>,
    source: Rc<dyn TimeSource>,
}

impl FrameClock {
    /// Create a clock driven by wall-clock time
    pub fn new(frame_rate: f64) -> Self {
        Self::with_source(frame_rate, Rc::new(SystemTime::new()))
    }

    /// Create a clock that reads time from `source` when pumped
    pub fn with_source(frame_rate: f64, source: Rc<dyn TimeSource>) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            60.0
        };
        Self {
            inner: Rc::new(RefCell::new(ClockInner {
                listeners: IndexMap::new(),
                next_id: 0,
                frame_ms: 1000.0 / frame_rate,
                pending_ms: 0.0,
                elapsed_ms: 0.0,
                frame_count: 0,
                last_pump_ms: None,
                ticking: false,
            })),
            source,
        }
    }

    /// Get a weak handle for registering listeners
    pub fn handle(&self) -> ClockHandle {
        ClockHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.inner.borrow().frame_ms
    }

    /// Total time consumed by frames so far
    pub fn elapsed_ms(&self) -> f64 {
        self.inner.borrow().elapsed_ms
    }

    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame_count
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Check if anything is waiting for frames
    pub fn has_listeners(&self) -> bool {
        !self.inner.borrow().listeners.is_empty()
    }

    pub fn register(&self, listener: Weak<dyn FrameListener>) -> ListenerId {
        self.inner.borrow_mut().register(listener)
    }

    pub fn deregister(&self, id: ListenerId) {
        self.inner.borrow_mut().listeners.shift_remove(&id);
    }

    /// Read the time source and run every frame that has elapsed since the
    /// previous pump
    ///
    /// The first pump only records the starting time.
    pub fn pump(&self) -> u32 {
        let now = self.source.now_ms();
        let last = self.inner.borrow_mut().last_pump_ms.replace(now);
        match last {
            Some(last) if now > last => self.advance(now - last),
            _ => 0,
        }
    }

    /// Advance time by `delta_ms`, running one tick per whole frame
    ///
    /// Leftover time carries into the next call. Calling this from inside a
    /// listener only adds time; the frames run in the outer call.
    pub fn advance(&self, delta_ms: f64) -> u32 {
        if !(delta_ms.is_finite() && delta_ms > 0.0) {
            return 0;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending_ms += delta_ms;
            if inner.ticking {
                return 0;
            }
            inner.ticking = true;
        }

        let mut frames = 0;
        loop {
            let dt = {
                let mut inner = self.inner.borrow_mut();
                if inner.pending_ms + FRAME_EPSILON_MS < inner.frame_ms {
                    inner.ticking = false;
                    break;
                }
                let frame_ms = inner.frame_ms;
                inner.pending_ms -= frame_ms;
                inner.elapsed_ms += frame_ms;
                inner.frame_count += 1;
                frame_ms
            };
            run_frame(&self.inner, dt);
            frames += 1;
        }
        frames
    }

    /// Run exactly `count` frames
    pub fn run_frames(&self, count: u32) {
        let frame_ms = self.frame_interval_ms();
        for _ in 0..count {
            self.advance(frame_ms);
        }
    }
}

fn run_frame(cell: &RefCell<ClockInner>, dt_ms: f64) {
    let snapshot: SmallVec<[(ListenerId, Weak<dyn FrameListener>); 16]> = cell
        .borrow()
        .listeners
        .iter()
        .map(|(id, listener)| (*id, listener.clone()))
        .collect();
    trace!(listeners = snapshot.len(), dt_ms, "frame");

    for (id, weak) in snapshot {
        // Skip anything deregistered earlier in this frame
        if !cell.borrow().listeners.contains_key(&id) {
            continue;
        }
        let Some(listener) = weak.upgrade() else {
            cell.borrow_mut().listeners.shift_remove(&id);
            continue;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_frame(dt_ms)));
        if outcome.is_err() {
            error!(?id, "frame listener panicked, deregistering it");
            cell.borrow_mut().listeners.shift_remove(&id);
        }
    }
}

/// A weak handle to a [`FrameClock`]
///
/// Handles do not keep the clock alive. Once the clock is gone registration
/// fails quietly and nothing ticks.
#[derive(Clone, Default)]
pub struct ClockHandle {
    inner: Weak<RefCell<ClockInner>>,
}

impl ClockHandle {
    /// A handle that is not attached to any clock
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Weak<dyn FrameListener>) -> Option<ListenerId> {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow_mut().register(listener))
    }

    /// Remove a registration; unknown ids are ignored
    pub fn deregister(&self, id: ListenerId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().listeners.shift_remove(&id);
        }
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.borrow().listeners.contains_key(&id))
    }

    pub fn frame_interval_ms(&self) -> Option<f64> {
        self.inner.upgrade().map(|inner| inner.borrow().frame_ms)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
