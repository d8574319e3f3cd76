//! Signals exchanged between carousel, slides and media over the bus.
//!
//! # Registration handshake
//!
//! A slide dispatches [`AddSlide`] on its own element when attached. The event
//! bubbles to the nearest carousel, which stores the slide and calls the
//! attached [`RegisterHandler`] with a reference to itself. On detach the
//! slide dispatches [`RemoveSlide`] on the container it captured at attach
//! time, since its own parent link is already gone.
//!
//! # Media
//!
//! Media elements sit below a video slide. They announce themselves with
//! [`AddMedia`] / [`RemoveMedia`] and report transport changes with
//! [`MediaEvent`]. The nearest video slide consumes all of these; they never
//! reach the carousel.

use std::rc::{Rc, Weak};

use crate::core::element::ElementId;

use super::carousel::Carousel;
use super::media::MediaHandle;
use super::slide::Slide;

/// Called by the carousel with a reference to itself.
pub type RegisterHandler = Rc<dyn Fn(Weak<Carousel>)>;

// === Slide registration ===

/// Slide asks the enclosing carousel to manage it.
pub struct AddSlide {
    pub element: ElementId,
    pub slide: Rc<Slide>,
    pub register_handler: Option<RegisterHandler>,
}

impl std::fmt::Debug for AddSlide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddSlide")
            .field("element", &self.element)
            .field("register_handler", &self.register_handler.is_some())
            .finish()
    }
}

/// Slide leaves the carousel.
#[derive(Clone, Copy, Debug)]
pub struct RemoveSlide {
    pub element: ElementId,
}

// === Engine ===

/// Paging engine finished a transition; selection is stable.
#[derive(Clone, Copy, Debug)]
pub struct EngineSettled;

// === Media ===

/// Media element registers with the nearest video slide.
pub struct AddMedia {
    pub element: ElementId,
    pub handle: Rc<dyn MediaHandle>,
}

impl std::fmt::Debug for AddMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddMedia").field("element", &self.element).finish()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RemoveMedia {
    pub element: ElementId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaSignal {
    /// Media became playable
    Ready,
    Play,
    Pause,
    Ended,
}

/// Transport change reported by a media element.
#[derive(Clone, Copy, Debug)]
pub struct MediaEvent {
    pub element: ElementId,
    pub signal: MediaSignal,
}

impl MediaEvent {
    pub fn new(element: ElementId, signal: MediaSignal) -> Self {
        Self { element, signal }
    }
}
