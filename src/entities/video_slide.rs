//! Video slide: keeps carousel auto-advance and video playback exclusive.
//!
//! - video plays → pause carousel
//! - video paused → resume carousel
//! - video ends → advance and resume carousel, rewind video
//! - slide becomes visible → pause carousel, play video once it is ready
//! - slide hidden → pause video
//!
//! # State machine
//!
//! ```text
//!   Hidden --visible--> VisiblePendingReady --all media ready--> VisiblePlaying
//!     ^                        |                                     |
//!     +--------hidden----------+-----------------hidden--------------+
//! ```
//!
//! The readiness wait is armed on becoming visible and never cancelled.
//! When it resolves it re-checks visibility, so a slide hidden while its
//! media was loading never starts playing.
//!
//! # Feedback
//!
//! Media `play` / `pause` signals only touch the carousel while this slide
//! is visible: a background video pausing must not restart auto-advance.
//! The carousel never calls back into slides from `pause()` / `resume()`,
//! so there is no loop to break on that side.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, error, info, trace};

use crate::core::element::ElementId;
use crate::core::event_bus::{EventBus, ListenerId};

use super::carousel::Carousel;
use super::events::{AddMedia, MediaEvent, MediaSignal, RemoveMedia};
use super::media::{MediaCommand, MediaHandle};
use super::slide::{Slide, SlideHook};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Hidden,
    VisiblePendingReady,
    VisiblePlaying,
}

struct TrackedMedia {
    element: ElementId,
    handle: Rc<dyn MediaHandle>,
}

pub struct VideoSlide {
    slide: Rc<Slide>,
    media: RefCell<Vec<TrackedMedia>>,
    visible: Cell<bool>,
    state: Cell<PlaybackState>,
    /// One-shot readiness wait armed by the last visible transition
    awaiting_ready: Cell<bool>,
    listeners: Vec<ListenerId>,
}

impl std::fmt::Debug for VideoSlide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSlide")
            .field("element", &self.element())
            .field("state", &self.state.get())
            .field("media", &self.media_elements())
            .field("awaiting_ready", &self.awaiting_ready.get())
            .finish()
    }
}

impl VideoSlide {
    pub fn new(bus: &EventBus, element: ElementId) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<VideoSlide>| {
            let hook: Weak<dyn SlideHook> = weak.clone();
            let slide = Slide::with_hook(bus, element, hook);

            let w = weak.clone();
            let add = bus.listen::<AddMedia, _>(element, move |ctx, ev| {
                ctx.stop();
                if let Some(this) = w.upgrade() {
                    this.add_media(ev.element, Rc::clone(&ev.handle));
                }
            });

            let w = weak.clone();
            let remove = bus.listen::<RemoveMedia, _>(element, move |ctx, ev| {
                ctx.stop();
                if let Some(this) = w.upgrade() {
                    this.remove_media(ev.element);
                }
            });

            let w = weak.clone();
            let signals = bus.listen::<MediaEvent, _>(element, move |ctx, ev| {
                // Ready may interest others; transport signals are ours alone
                if ev.signal != MediaSignal::Ready {
                    ctx.stop();
                }
                if let Some(this) = w.upgrade() {
                    this.on_media_event(ev);
                }
            });

            Self {
                slide,
                media: RefCell::new(Vec::new()),
                visible: Cell::new(false),
                state: Cell::new(PlaybackState::Hidden),
                awaiting_ready: Cell::new(false),
                listeners: vec![add, remove, signals],
            }
        })
    }

    pub fn element(&self) -> ElementId {
        self.slide.element()
    }

    /// Underlying generic slide.
    pub fn slide(&self) -> &Rc<Slide> {
        &self.slide
    }

    pub fn on_attach(&self) {
        self.slide.on_attach();
    }

    pub fn on_detach(&self) {
        self.slide.on_detach();
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn is_awaiting_ready(&self) -> bool {
        self.awaiting_ready.get()
    }

    pub fn media_elements(&self) -> Vec<ElementId> {
        self.media.borrow().iter().map(|m| m.element).collect()
    }

    // === Media set ===

    /// Track a media handle; a handle already tracked is ignored.
    pub fn add_media(&self, element: ElementId, handle: Rc<dyn MediaHandle>) {
        {
            let mut media = self.media.borrow_mut();
            if media.iter().any(|m| m.element == element) {
                trace!("VideoSlide {}: media {} already tracked", self.element(), element);
                return;
            }
            media.push(TrackedMedia { element, handle });
        }
        debug!("VideoSlide {}: added media {}", self.element(), element);
        // An already loaded handle completes a pending wait without a signal
        self.try_resolve_ready();
    }

    /// Stop tracking by identity. Returns false if it was not tracked.
    pub fn remove_media(&self, element: ElementId) -> bool {
        let removed = {
            let mut media = self.media.borrow_mut();
            let before = media.len();
            media.retain(|m| m.element != element);
            media.len() != before
        };
        if removed {
            debug!(
                "VideoSlide {}: removed media {}, {} left",
                self.element(),
                element,
                self.media.borrow().len()
            );
            self.try_resolve_ready();
        }
        removed
    }

    fn is_tracked(&self, element: ElementId) -> bool {
        self.media.borrow().iter().any(|m| m.element == element)
    }

    fn all_media_ready(&self) -> bool {
        let media = self.media.borrow();
        !media.is_empty() && media.iter().all(|m| m.handle.is_ready())
    }

    /// Apply `command` to every ready handle; not-ready handles are skipped.
    /// Failures are logged and do not stop the remaining handles.
    /// Returns how many handles accepted the command.
    pub fn modify_media(&self, command: MediaCommand) -> usize {
        // Snapshot: handles may post or even re-register while we call them
        let handles: Vec<(ElementId, Rc<dyn MediaHandle>)> = self
            .media
            .borrow()
            .iter()
            .map(|m| (m.element, Rc::clone(&m.handle)))
            .collect();

        debug!("VideoSlide {}: {} {} media", self.element(), command, handles.len());
        let mut applied = 0;
        for (element, handle) in handles {
            if !handle.is_ready() {
                trace!("VideoSlide {}: media {} not ready, skip {}", self.element(), element, command);
                continue;
            }
            match command.apply(handle.as_ref()) {
                Ok(()) => applied += 1,
                Err(e) => error!(
                    "VideoSlide {}: cannot call {} on media {}: {}",
                    self.element(),
                    command.name(),
                    element,
                    e
                ),
            }
        }
        applied
    }

    // === Carousel ===

    fn with_carousel(&self, action: &str, f: impl FnOnce(&Carousel)) {
        match self.slide.carousel() {
            Some(carousel) => f(&carousel),
            None => debug!("VideoSlide {}: no carousel to {}", self.element(), action),
        }
    }

    // === Readiness ===

    fn arm_ready_wait(&self) {
        self.awaiting_ready.set(true);
        self.try_resolve_ready();
    }

    /// Resolve the pending wait if every tracked handle is ready.
    fn try_resolve_ready(&self) {
        if !self.awaiting_ready.get() || !self.all_media_ready() {
            return;
        }
        self.awaiting_ready.set(false);

        // State at arm time is stale by now; trust only the current flag
        if !self.visible.get() {
            debug!("VideoSlide {}: media ready but slide hidden, not playing", self.element());
            return;
        }
        info!("VideoSlide {}: media ready, play", self.element());
        self.state.set(PlaybackState::VisiblePlaying);
        self.modify_media(MediaCommand::Play);
    }

    // === Media signals ===

    fn on_media_event(&self, ev: &MediaEvent) {
        match ev.signal {
            MediaSignal::Ready => {
                if self.is_tracked(ev.element) {
                    self.try_resolve_ready();
                }
            }
            MediaSignal::Play => {
                if self.visible.get() {
                    self.with_carousel("pause", Carousel::pause);
                }
            }
            MediaSignal::Pause => {
                if self.visible.get() {
                    self.with_carousel("resume", Carousel::resume);
                }
            }
            MediaSignal::Ended => self.on_media_ended(),
        }
    }

    /// Pause, advance, resume, then rewind. Strictly in that order.
    fn on_media_ended(&self) {
        info!("VideoSlide {}: video ended, resume carousel", self.element());
        self.modify_media(MediaCommand::Pause);
        self.with_carousel("advance", |carousel| {
            carousel.advance();
            carousel.resume();
        });
        self.modify_media(MediaCommand::Seek(0.0));
    }
}

impl SlideHook for VideoSlide {
    fn visibility_change(&self, visible: bool) {
        let was_visible = self.visible.replace(visible);

        if !visible {
            self.state.set(PlaybackState::Hidden);
            self.modify_media(MediaCommand::Pause);
            return;
        }

        // Timer must not fire while media is still loading; a re-initialized
        // carousel may have restarted it under an already visible slide
        self.with_carousel("pause", Carousel::pause);

        if was_visible {
            trace!("VideoSlide {}: already visible", self.element());
            return;
        }

        debug!("VideoSlide {}: became visible", self.element());
        self.state.set(PlaybackState::VisiblePendingReady);
        self.arm_ready_wait();
    }
}

impl Drop for VideoSlide {
    fn drop(&mut self) {
        for id in &self.listeners {
            self.slide.bus().unlisten(*id);
        }
    }
}
