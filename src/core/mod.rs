//! Core plumbing - element identity and the element-tree event bus
//!
//! Independent of any carousel semantics.

pub mod element;
pub mod event_bus;

pub use element::ElementId;
pub use event_bus::{downcast_event, BoxedEvent, EventBus, ListenerId, Propagation};
