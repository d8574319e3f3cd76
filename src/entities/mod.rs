//! Entities module - carousel, slides and their collaborators
//!
//! Roles talk to each other only through events on the element tree:
//! - [`Carousel`] owns slide order, selection and the paging engine
//! - [`Slide`] registers with the nearest carousel on attach
//! - [`VideoSlide`] adds media tracking and playback arbitration on top

pub mod carousel;
pub mod engine;
pub mod events;
pub mod media;
pub mod options;
pub mod simulated;
pub mod slide;
pub mod video_slide;

pub use carousel::{Carousel, CarouselError};
pub use engine::{EngineFactory, PagingEngine};
pub use media::{MediaCommand, MediaError, MediaHandle};
pub use options::{Attributes, EngineOptions, OptionsError};
pub use slide::{Slide, SlideHook};
pub use video_slide::{PlaybackState, VideoSlide};
