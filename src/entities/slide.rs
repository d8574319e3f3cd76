//! Generic carousel slide.
//!
//! A slide registers with the enclosing carousel when attached, unregisters
//! when detached and receives visibility updates in between. What a slide
//! *does* with visibility is delegated to an optional [`SlideHook`], which is
//! how [`VideoSlide`](super::video_slide::VideoSlide) extends it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, trace};

use crate::core::element::ElementId;
use crate::core::event_bus::EventBus;

use super::carousel::Carousel;
use super::events::{AddSlide, RegisterHandler, RemoveSlide};

/// Behaviour attached to a slide.
pub trait SlideHook {
    /// Called once per settle with the authoritative visibility.
    fn visibility_change(&self, visible: bool);
}

pub struct Slide {
    element: ElementId,
    bus: EventBus,
    /// Parent captured on attach; the tree link is gone by the time we detach
    container: Cell<Option<ElementId>>,
    owner: RefCell<Weak<Carousel>>,
    visible: Cell<bool>,
    hook: Option<Weak<dyn SlideHook>>,
    self_ref: Weak<Slide>,
}

impl std::fmt::Debug for Slide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slide")
            .field("element", &self.element)
            .field("container", &self.container.get())
            .field("visible", &self.visible.get())
            .field("registered", &self.carousel().is_some())
            .finish()
    }
}

impl Slide {
    /// Plain slide without behaviour.
    pub fn new(bus: &EventBus, element: ElementId) -> Rc<Self> {
        Self::build(bus, element, None)
    }

    /// Slide forwarding visibility changes to `hook`.
    pub fn with_hook(bus: &EventBus, element: ElementId, hook: Weak<dyn SlideHook>) -> Rc<Self> {
        Self::build(bus, element, Some(hook))
    }

    fn build(bus: &EventBus, element: ElementId, hook: Option<Weak<dyn SlideHook>>) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            element,
            bus: bus.clone(),
            container: Cell::new(None),
            owner: RefCell::new(Weak::new()),
            visible: Cell::new(false),
            hook,
            self_ref: self_ref.clone(),
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Container captured at attach time.
    pub fn container(&self) -> Option<ElementId> {
        self.container.get()
    }

    /// Carousel this slide is registered with, if it is still alive.
    pub fn carousel(&self) -> Option<Rc<Carousel>> {
        self.owner.borrow().upgrade()
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Element was connected to the tree: register at the carousel.
    pub fn on_attach(&self) {
        self.container.set(self.bus.parent_of(self.element));

        let Some(slide) = self.self_ref.upgrade() else {
            return;
        };
        let weak = self.self_ref.clone();
        let handler: RegisterHandler = Rc::new(move |carousel: Weak<Carousel>| {
            if let Some(slide) = weak.upgrade() {
                slide.set_owner(carousel);
            }
        });

        debug!("Slide {}: send add-slide", self.element);
        let out = self.bus.dispatch(
            self.element,
            AddSlide {
                element: self.element,
                slide,
                register_handler: Some(handler),
            },
        );
        if out.delivered == 0 {
            debug!("Slide {}: no carousel above, not registered", self.element);
        }
    }

    /// Element was disconnected: unregister via the captured container.
    pub fn on_detach(&self) {
        let Some(container) = self.container.take() else {
            trace!("Slide {}: detached without container", self.element);
            return;
        };
        debug!("Slide {}: send remove-slide to {}", self.element, container);
        self.bus.dispatch(container, RemoveSlide { element: self.element });
    }

    fn set_owner(&self, carousel: Weak<Carousel>) {
        debug!("Slide {}: store carousel", self.element);
        *self.owner.borrow_mut() = carousel;
    }

    /// Called by the carousel after every settle.
    pub fn visibility_change(&self, visible: bool) {
        debug!("Slide {}: visible? {}", self.element, visible);
        self.visible.set(visible);
        if let Some(hook) = self.hook.as_ref().and_then(Weak::upgrade) {
            hook.visibility_change(visible);
        }
    }
}
