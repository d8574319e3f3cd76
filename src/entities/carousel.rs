//! Carousel: single source of truth for the current slide.
//!
//! **Architecture**: the carousel does NOT own the paging engine's behaviour.
//! It creates the engine through an [`EngineFactory`], forwards
//! pause/resume/advance to it and re-broadcasts visibility to every
//! registered slide whenever the engine reports a settled transition.
//!
//! # Slide registration
//!
//! Slides find the carousel by bubbling [`AddSlide`] up the element tree;
//! the carousel answers through the event's register handler. Slides are
//! kept in registration order, without duplicates.
//!
//! # Player state
//!
//! `pause()` / `resume()` are idempotent: repeated calls (e.g. several slides
//! pausing in the same turn) reach the engine once. The latest call wins.
//!
//! # Re-entrancy
//!
//! Slides call back into the carousel from inside `visibility_change`, and
//! an engine may report a settle from inside `next()`. No `RefCell` borrow
//! is held while slides or the engine are called: the engine handle is
//! cloned out first.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, error, info, trace};

use crate::core::element::ElementId;
use crate::core::event_bus::{EventBus, ListenerId};

use super::engine::{EngineFactory, PagingEngine};
use super::events::{AddSlide, EngineSettled, RegisterHandler, RemoveSlide};
use super::options::Attributes;
use super::slide::Slide;

/// Carousel setup errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselError {
    /// No paging engine available at initialization
    EngineMissing,
}

impl std::fmt::Display for CarouselError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CarouselError::EngineMissing => {
                write!(f, "Carousel: paging engine missing, add it before initializing")
            }
        }
    }
}

impl std::error::Error for CarouselError {}

pub struct Carousel {
    element: ElementId,
    bus: EventBus,
    attributes: Attributes,
    factory: Option<Rc<dyn EngineFactory>>,
    engine: RefCell<Option<Rc<dyn PagingEngine>>>,
    slides: RefCell<Vec<Rc<Slide>>>,
    selected: Cell<Option<ElementId>>,
    paused: Cell<bool>,
    slide_listeners: [ListenerId; 2],
    settle_listener: Cell<Option<ListenerId>>,
    self_ref: Weak<Carousel>,
}

impl std::fmt::Debug for Carousel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Carousel")
            .field("element", &self.element)
            .field("slides", &self.slides())
            .field("selected", &self.selected.get())
            .field("paused", &self.paused.get())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Carousel {
    /// Create carousel on `element` and start listening for slide
    /// registrations. The engine is created later by [`init`](Self::init).
    pub fn new(
        bus: &EventBus,
        element: ElementId,
        attributes: Attributes,
        factory: Option<Rc<dyn EngineFactory>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref: &Weak<Carousel>| {
            let weak = self_ref.clone();
            let add = bus.listen::<AddSlide, _>(element, move |ctx, ev| {
                // Nearest carousel owns the slide
                ctx.stop();
                if let Some(carousel) = weak.upgrade() {
                    carousel.register_slide(Rc::clone(&ev.slide), ev.register_handler.as_ref());
                }
            });

            let weak = self_ref.clone();
            let remove = bus.listen::<RemoveSlide, _>(element, move |ctx, ev| {
                ctx.stop();
                if let Some(carousel) = weak.upgrade() {
                    carousel.unregister_slide(ev.element);
                }
            });

            Self {
                element,
                bus: bus.clone(),
                attributes,
                factory,
                engine: RefCell::new(None),
                slides: RefCell::new(Vec::new()),
                selected: Cell::new(None),
                paused: Cell::new(false),
                slide_listeners: [add, remove],
                settle_listener: Cell::new(None),
                self_ref: self_ref.clone(),
            }
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Registered slide elements in registration order.
    pub fn slides(&self) -> Vec<ElementId> {
        self.slides.borrow().iter().map(|s| s.element()).collect()
    }

    /// Slide selected at the last settle.
    pub fn selected(&self) -> Option<ElementId> {
        self.selected.get()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.borrow().is_some()
    }

    // === Lifecycle ===

    /// Element was connected: initialize unless `manual-init` is set.
    pub fn on_attach(&self) -> Result<(), CarouselError> {
        if self.attributes.manual_init() {
            debug!("Carousel {}: manual-init set, waiting for init()", self.element);
            return Ok(());
        }
        self.init()
    }

    /// Create the paging engine. Calling again destroys the previous engine
    /// and starts over with freshly parsed options.
    pub fn init(&self) -> Result<(), CarouselError> {
        let Some(factory) = self.factory.as_ref() else {
            error!("Carousel {}: paging engine missing", self.element);
            return Err(CarouselError::EngineMissing);
        };

        let options = self.attributes.engine_options();
        info!(
            "Carousel {}: initialize engine with {} option(s), {} slide(s)",
            self.element,
            options.len(),
            self.slides.borrow().len()
        );

        let previous = self.engine.borrow_mut().take();
        if let Some(previous) = previous {
            debug!("Carousel {}: re-init, destroying previous engine", self.element);
            previous.destroy();
        }

        let engine: Rc<dyn PagingEngine> = Rc::from(factory.create(self.element, &options));
        self.paused.set(false);
        *self.engine.borrow_mut() = Some(engine);
        self.listen_for_settle();
        Ok(())
    }

    fn listen_for_settle(&self) {
        if self.settle_listener.get().is_some() {
            return;
        }
        let weak = self.self_ref.clone();
        let id = self.bus.listen::<EngineSettled, _>(self.element, move |ctx, _| {
            ctx.stop();
            if let Some(carousel) = weak.upgrade() {
                carousel.on_settle();
            }
        });
        self.settle_listener.set(Some(id));
    }

    // === Slides ===

    /// Store `slide`, hand it our reference and, if it is already the
    /// engine's selection, tell it right away.
    pub fn register_slide(&self, slide: Rc<Slide>, register_handler: Option<&RegisterHandler>) {
        let element = slide.element();
        {
            let mut slides = self.slides.borrow_mut();
            if slides.iter().any(|s| s.element() == element) {
                debug!("Carousel {}: slide {} already registered", self.element, element);
            } else {
                debug!("Carousel {}: slide {} registered", self.element, element);
                slides.push(Rc::clone(&slide));
            }
        }

        if let Some(handler) = register_handler {
            handler(self.self_ref.clone());
        }

        let current = self.engine_selection();
        if current == Some(element) {
            debug!("Carousel {}: registered slide {} is visible", self.element, element);
            slide.visibility_change(true);
        }
    }

    /// Forget slide; unknown slides are ignored.
    pub fn unregister_slide(&self, element: ElementId) -> bool {
        let mut slides = self.slides.borrow_mut();
        let before = slides.len();
        slides.retain(|s| s.element() != element);
        let removed = slides.len() != before;
        if removed {
            debug!("Carousel {}: slide {} unregistered", self.element, element);
        } else {
            trace!("Carousel {}: unregister of unknown slide {}", self.element, element);
        }
        removed
    }

    // === Player ===

    /// Stop auto-advance. Idempotent.
    pub fn pause(&self) {
        if self.paused.get() {
            trace!("Carousel {}: already paused", self.element);
            return;
        }
        let Some(engine) = self.engine() else {
            debug!("Carousel {}: pause before init ignored", self.element);
            return;
        };
        info!("Carousel {}: pause", self.element);
        self.paused.set(true);
        engine.stop_player();
    }

    /// Restart auto-advance. Idempotent.
    pub fn resume(&self) {
        if !self.paused.get() {
            trace!("Carousel {}: not paused", self.element);
            return;
        }
        let Some(engine) = self.engine() else {
            debug!("Carousel {}: resume before init ignored", self.element);
            return;
        };
        info!("Carousel {}: play", self.element);
        self.paused.set(false);
        engine.play_player();
    }

    /// Go straight to the next slide.
    pub fn advance(&self) {
        let Some(engine) = self.engine() else {
            debug!("Carousel {}: advance before init ignored", self.element);
            return;
        };
        info!("Carousel {}: next slide", self.element);
        engine.next();
    }

    fn engine(&self) -> Option<Rc<dyn PagingEngine>> {
        self.engine.borrow().clone()
    }

    fn engine_selection(&self) -> Option<ElementId> {
        self.engine().and_then(|e| e.selected_element())
    }

    /// Engine settled: every slide learns whether it is the selected one.
    fn on_settle(&self) {
        let selected = self.engine_selection();
        self.selected.set(selected);
        debug!(
            "Carousel {}: settled on {:?}",
            self.element,
            selected.map(|s| s.to_string())
        );

        // Snapshot: slides may pause/resume us (or even unregister) meanwhile
        let slides: Vec<Rc<Slide>> = self.slides.borrow().clone();
        for slide in &slides {
            slide.visibility_change(Some(slide.element()) == selected);
        }
    }
}

impl Drop for Carousel {
    fn drop(&mut self) {
        for id in self.slide_listeners {
            self.bus.unlisten(id);
        }
        if let Some(id) = self.settle_listener.get() {
            self.bus.unlisten(id);
        }
    }
}
