//! Element identity.
//!
//! Every participant of the carousel tree (carousel, slides, media) is an
//! element addressed by an [`ElementId`]. Parent links between ids live in
//! the [`EventBus`](super::event_bus::EventBus), ids themselves carry no state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque element identifier (UUID v4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    /// Short form (first 8 hex digits), enough to tell elements apart in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "{}", &simple[..8])
    }
}
