//! Paging engine contract (the third-party carousel widget).
//!
//! The engine owns page animation and the auto-advance timer. The carousel
//! only starts/stops the timer, asks for the next page and reads the current
//! selection. Completed transitions are reported with
//! [`EngineSettled`](super::events::EngineSettled) on the carousel element,
//! either posted or dispatched from inside `next()`.
//!
//! Methods take `&self`: the carousel calls in without holding a borrow, so
//! an engine may re-enter the carousel synchronously.

use crate::core::element::ElementId;

use super::options::EngineOptions;

pub trait PagingEngine {
    /// Stop the auto-advance timer. Slides stay mounted.
    fn stop_player(&self);

    /// (Re)start the auto-advance timer.
    fn play_player(&self);

    /// Go to the next page.
    fn next(&self);

    /// Element of the currently selected cell, if any.
    fn selected_element(&self) -> Option<ElementId>;

    /// Tear down before the carousel re-initializes.
    fn destroy(&self) {}
}

/// Creates engines for a carousel element.
///
/// The carousel is handed an `Option<Rc<dyn EngineFactory>>`; `None` models
/// the engine library not being loaded, which fails initialization.
pub trait EngineFactory {
    fn create(&self, carousel: ElementId, options: &EngineOptions) -> Box<dyn PagingEngine>;
}
