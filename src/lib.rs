//! slidecast - carousel and video slide coordination
//!
//! Re-exports all modules for use by the binary target.

// Core plumbing (element ids, event bus)
pub mod core;

// App modules
pub mod cli;
pub mod entities;
pub mod scenario;
pub mod shell;

// Re-export commonly used types from core
pub use core::element::ElementId;
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, Propagation};

// Re-export entities
pub use entities::{Attributes, Carousel, CarouselError, EngineOptions, Slide, VideoSlide};
pub use scenario::{Scenario, ScenarioError, Step};
pub use shell::{Report, Shell};
