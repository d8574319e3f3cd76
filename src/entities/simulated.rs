//! Deterministic stand-ins for the paging engine and media handles.
//!
//! Both record every call they receive into a shared [`CallLog`], so the
//! relative order of engine and media calls can be inspected. Their own
//! signals (settle, ready/play/pause/ended) are *posted* to the bus, not
//! dispatched: like a real widget or video element they arrive on a later
//! turn, when the host pumps the bus.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, trace};
use serde::Serialize;

use crate::core::element::ElementId;
use crate::core::event_bus::EventBus;

use super::engine::{EngineFactory, PagingEngine};
use super::events::{EngineSettled, MediaEvent, MediaSignal};
use super::media::{MediaError, MediaHandle};
use super::options::EngineOptions;

/// One recorded call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Call {
    EngineStop,
    EnginePlay,
    EngineNext,
    EngineDestroy,
    MediaPlay(ElementId),
    MediaPause(ElementId),
    MediaSeek(ElementId, f64),
}

/// Shared, ordered call record.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn record(&self, call: Call) {
        trace!("CallLog: {:?}", call);
        self.0.borrow_mut().push(call);
    }

    pub fn snapshot(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.borrow().iter().position(|c| pred(c))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

// === Engine ===

#[derive(Debug)]
struct EngineState {
    index: usize,
    playing: bool,
    interval: Option<Duration>,
    elapsed: Duration,
    wrap_around: bool,
    destroyed: bool,
}

/// Simulated paging engine. Cells are the carousel element's children, in
/// tree order, read fresh on every access. Transitions settle on the next
/// pump.
#[derive(Clone, Debug)]
pub struct SimulatedEngine {
    bus: EventBus,
    carousel: ElementId,
    log: CallLog,
    state: Rc<RefCell<EngineState>>,
}

impl SimulatedEngine {
    pub fn new(bus: &EventBus, carousel: ElementId, options: &EngineOptions, log: &CallLog) -> Self {
        let interval = options.autoplay_interval();
        let engine = Self {
            bus: bus.clone(),
            carousel,
            log: log.clone(),
            state: Rc::new(RefCell::new(EngineState {
                index: options.initial_index(),
                playing: interval.is_some(),
                interval,
                elapsed: Duration::ZERO,
                wrap_around: options.wrap_around(),
                destroyed: false,
            })),
        };
        // Initial layout settles like any other transition
        engine.bus.post(carousel, EngineSettled);
        engine
    }

    pub fn cells(&self) -> Vec<ElementId> {
        self.bus.children_of(self.carousel)
    }

    pub fn selected_index(&self) -> usize {
        self.state.borrow().index
    }

    /// Whether the auto-advance timer is running.
    pub fn is_playing(&self) -> bool {
        let state = self.state.borrow();
        state.playing && !state.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Let time pass. Every full interval of a running timer advances one
    /// cell (always wrapping, like an autoplay loop). Returns the number of
    /// advances.
    pub fn tick(&self, dt: Duration) -> usize {
        let mut advances = 0;
        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                let Some(interval) = state.interval.filter(|_| state.playing && !state.destroyed)
                else {
                    return advances;
                };
                if advances == 0 {
                    state.elapsed += dt;
                }
                if state.elapsed >= interval {
                    state.elapsed -= interval;
                    true
                } else {
                    false
                }
            };
            if !due {
                return advances;
            }
            trace!("SimulatedEngine {}: autoplay advance", self.carousel);
            self.select_next(true);
            advances += 1;
        }
    }

    fn select_next(&self, wrap: bool) -> bool {
        let count = self.cells().len();
        let mut state = self.state.borrow_mut();
        if count == 0 {
            return false;
        }
        let next = state.index + 1;
        let target = if next < count {
            next
        } else if wrap {
            0
        } else {
            return false;
        };
        if target == state.index {
            return false;
        }
        state.index = target;
        drop(state);
        debug!("SimulatedEngine {}: select cell {}", self.carousel, target);
        self.bus.post(self.carousel, EngineSettled);
        true
    }
}

impl PagingEngine for SimulatedEngine {
    fn stop_player(&self) {
        self.log.record(Call::EngineStop);
        self.state.borrow_mut().playing = false;
    }

    fn play_player(&self) {
        self.log.record(Call::EnginePlay);
        let mut state = self.state.borrow_mut();
        state.playing = state.interval.is_some();
        state.elapsed = Duration::ZERO;
    }

    fn next(&self) {
        self.log.record(Call::EngineNext);
        if self.state.borrow().destroyed {
            return;
        }
        let wrap = self.state.borrow().wrap_around;
        self.select_next(wrap);
    }

    fn selected_element(&self) -> Option<ElementId> {
        let index = self.state.borrow().index;
        self.cells().get(index).copied()
    }

    fn destroy(&self) {
        self.log.record(Call::EngineDestroy);
        self.state.borrow_mut().destroyed = true;
    }
}

/// Factory handing out [`SimulatedEngine`]s and keeping a handle to the
/// latest one so hosts can drive its timer.
#[derive(Debug)]
pub struct SimulatedEngineFactory {
    bus: EventBus,
    log: CallLog,
    current: RefCell<Option<SimulatedEngine>>,
    created: Cell<usize>,
}

impl SimulatedEngineFactory {
    pub fn new(bus: &EventBus, log: &CallLog) -> Self {
        Self {
            bus: bus.clone(),
            log: log.clone(),
            current: RefCell::new(None),
            created: Cell::new(0),
        }
    }

    /// Most recently created engine.
    pub fn current(&self) -> Option<SimulatedEngine> {
        self.current.borrow().clone()
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(&self, carousel: ElementId, options: &EngineOptions) -> Box<dyn PagingEngine> {
        let engine = SimulatedEngine::new(&self.bus, carousel, options, &self.log);
        *self.current.borrow_mut() = Some(engine.clone());
        self.created.set(self.created.get() + 1);
        Box::new(engine)
    }
}

// === Media ===

#[derive(Debug, Default)]
struct MediaState {
    ready: bool,
    playing: bool,
    position: f64,
}

/// Simulated video element.
///
/// Transport calls are recorded; state changes are reported back through
/// posted [`MediaEvent`]s the way a video element fires `play` / `pause`.
#[derive(Clone, Debug)]
pub struct SimulatedMedia {
    element: ElementId,
    bus: EventBus,
    log: CallLog,
    seekable: bool,
    state: Rc<RefCell<MediaState>>,
}

impl SimulatedMedia {
    pub fn new(bus: &EventBus, element: ElementId, log: &CallLog) -> Self {
        Self {
            element,
            bus: bus.clone(),
            log: log.clone(),
            seekable: true,
            state: Rc::new(RefCell::new(MediaState::default())),
        }
    }

    /// Variant whose `seek` is unsupported.
    pub fn without_seek(mut self) -> Self {
        self.seekable = false;
        self
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn signal(&self, signal: MediaSignal) {
        self.bus.post(self.element, MediaEvent::new(self.element, signal));
    }

    /// Finished loading.
    pub fn load(&self) {
        self.state.borrow_mut().ready = true;
        self.signal(MediaSignal::Ready);
    }

    /// Playback reached the end.
    pub fn finish(&self) {
        self.state.borrow_mut().playing = false;
        self.signal(MediaSignal::Ended);
    }

    /// User pressed play on the element's own controls.
    pub fn user_play(&self) {
        self.state.borrow_mut().playing = true;
        self.signal(MediaSignal::Play);
    }

    /// User pressed pause on the element's own controls.
    pub fn user_pause(&self) {
        self.state.borrow_mut().playing = false;
        self.signal(MediaSignal::Pause);
    }
}

impl MediaHandle for SimulatedMedia {
    fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    fn play(&self) -> Result<(), MediaError> {
        self.log.record(Call::MediaPlay(self.element));
        let was_playing = std::mem::replace(&mut self.state.borrow_mut().playing, true);
        if !was_playing {
            self.signal(MediaSignal::Play);
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), MediaError> {
        self.log.record(Call::MediaPause(self.element));
        let was_playing = std::mem::replace(&mut self.state.borrow_mut().playing, false);
        if was_playing {
            self.signal(MediaSignal::Pause);
        }
        Ok(())
    }

    fn seek(&self, offset: f64) -> Result<(), MediaError> {
        if !self.seekable {
            return Err(MediaError::Unsupported("seek"));
        }
        self.log.record(Call::MediaSeek(self.element, offset));
        self.state.borrow_mut().position = offset;
        Ok(())
    }
}
