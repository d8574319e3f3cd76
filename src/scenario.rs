//! Declarative scenarios for driving a carousel without a browser.
//!
//! ```json
//! {
//!   "options": "{\"autoPlay\": 3000}",
//!   "steps": [
//!     { "op": "attach_slide", "id": "a", "video": true },
//!     { "op": "attach_slide", "id": "b" },
//!     { "op": "add_media", "slide": "a", "id": "clip" },
//!     { "op": "init" },
//!     { "op": "media_ready", "id": "clip" },
//!     { "op": "media_ended", "id": "clip" }
//!   ]
//! }
//! ```
//!
//! Ids are free-form names chosen by the scenario author; the [`Shell`]
//! maps them to element ids.
//!
//! [`Shell`]: crate::shell::Shell

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::entities::carousel::CarouselError;
use crate::entities::options::{Attributes, MANUAL_INIT_ATTRIBUTE, OPTIONS_ATTRIBUTE};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Raw `flickity-options` attribute text
    #[serde(default)]
    pub options: Option<String>,
    /// Do not initialize on attach; wait for an `init` step
    #[serde(default)]
    pub manual_init: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AttachSlide {
        id: String,
        #[serde(default)]
        video: bool,
    },
    DetachSlide { id: String },
    Init,
    AddMedia { slide: String, id: String },
    RemoveMedia { id: String },
    MediaReady { id: String },
    MediaPlay { id: String },
    MediaPause { id: String },
    MediaEnded { id: String },
    Tick { ms: u64 },
    Settle,
    Advance,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scenario JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    /// Carousel element attributes described by this scenario.
    pub fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        if let Some(options) = &self.options {
            attrs.set(OPTIONS_ATTRIBUTE, options.as_str());
        }
        if self.manual_init {
            attrs.set(MANUAL_INIT_ATTRIBUTE, "");
        }
        attrs
    }
}

/// Scenario execution errors
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    UnknownSlide(String),
    UnknownMedia(String),
    DuplicateId(String),
    Carousel(CarouselError),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::UnknownSlide(id) => write!(f, "Unknown slide: {}", id),
            ScenarioError::UnknownMedia(id) => write!(f, "Unknown media: {}", id),
            ScenarioError::DuplicateId(id) => write!(f, "Id already in use: {}", id),
            ScenarioError::Carousel(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Carousel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CarouselError> for ScenarioError {
    fn from(e: CarouselError) -> Self {
        ScenarioError::Carousel(e)
    }
}
