//! Carousel configuration: element attributes and paging engine options.
//!
//! Options arrive as a textual attribute holding a JSON object, e.g.
//! `flickity-options='{"autoPlay": 4000, "wrapAround": true}'`. Parsing is
//! forgiving: malformed text or a non-object value is logged and replaced by
//! an empty option set, never surfaced as an error to the carousel.

use std::time::Duration;

use indexmap::IndexMap;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute holding the engine options JSON.
pub const OPTIONS_ATTRIBUTE: &str = "flickity-options";
/// Presence of this attribute disables auto-initialization on attach.
pub const MANUAL_INIT_ATTRIBUTE: &str = "manual-init";

/// Interval used when `autoPlay` is `true` rather than a number.
const DEFAULT_AUTOPLAY_MS: u64 = 3000;

/// Element attributes in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.shift_remove(name)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn manual_init(&self) -> bool {
        self.has(MANUAL_INIT_ATTRIBUTE)
    }

    /// Engine options parsed from [`OPTIONS_ATTRIBUTE`].
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::from_attribute(self.get(OPTIONS_ATTRIBUTE))
    }
}

/// Option parsing errors
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    Malformed(String),
    NotAnObject(&'static str),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::Malformed(e) => write!(f, "Could not parse options: {}", e),
            OptionsError::NotAnObject(kind) => {
                write!(f, "Invalid options: expected an object, got {}", kind)
            }
        }
    }
}

impl std::error::Error for OptionsError {}

/// Plain option mapping handed to the paging engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineOptions(Map<String, Value>);

impl EngineOptions {
    /// Strict parse of an options attribute value.
    pub fn parse(text: &str) -> Result<Self, OptionsError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OptionsError::Malformed(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(OptionsError::NotAnObject(json_kind(&other))),
        }
    }

    /// Forgiving parse: absent or empty attribute gives empty options,
    /// invalid input logs an error and gives empty options.
    pub fn from_attribute(raw: Option<&str>) -> Self {
        let Some(text) = raw.filter(|t| !t.trim().is_empty()) else {
            return Self::default();
        };
        match Self::parse(text) {
            Ok(options) => options,
            Err(e) => {
                error!("Carousel: {} (attribute {:?}), using defaults", e, text);
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Auto-advance interval; `autoPlay: true` means the default interval,
    /// a positive number is milliseconds. Anything else disables auto-advance.
    pub fn autoplay_interval(&self) -> Option<Duration> {
        match self.get("autoPlay")? {
            Value::Bool(true) => Some(Duration::from_millis(DEFAULT_AUTOPLAY_MS)),
            Value::Number(n) => n
                .as_u64()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            _ => None,
        }
    }

    pub fn wrap_around(&self) -> bool {
        self.get("wrapAround").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn initial_index(&self) -> usize {
        self.get("initialIndex")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_object() {
        let opts = EngineOptions::parse(r#"{"autoPlay": 1500, "wrapAround": true}"#).unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts.autoplay_interval(), Some(Duration::from_millis(1500)));
        assert!(opts.wrap_around());
        assert_eq!(opts.initial_index(), 0);
    }

    #[test]
    fn test_malformed_falls_back_to_empty() {
        assert!(matches!(
            EngineOptions::parse("{autoPlay: }"),
            Err(OptionsError::Malformed(_))
        ));
        assert!(EngineOptions::from_attribute(Some("{autoPlay: }")).is_empty());
    }

    #[test]
    fn test_non_object_falls_back_to_empty() {
        assert_eq!(
            EngineOptions::parse("[1, 2]"),
            Err(OptionsError::NotAnObject("array"))
        );
        assert_eq!(
            EngineOptions::parse("42"),
            Err(OptionsError::NotAnObject("number"))
        );
        assert!(EngineOptions::from_attribute(Some("\"text\"")).is_empty());
    }

    #[test]
    fn test_absent_or_blank_attribute() {
        assert!(EngineOptions::from_attribute(None).is_empty());
        assert!(EngineOptions::from_attribute(Some("   ")).is_empty());
    }

    #[test]
    fn test_autoplay_variants() {
        let mut opts = EngineOptions::default();
        assert_eq!(opts.autoplay_interval(), None);
        opts.set("autoPlay", json!(true));
        assert_eq!(opts.autoplay_interval(), Some(Duration::from_millis(3000)));
        opts.set("autoPlay", json!(false));
        assert_eq!(opts.autoplay_interval(), None);
        opts.set("autoPlay", json!(0));
        assert_eq!(opts.autoplay_interval(), None);
    }

    #[test]
    fn test_attributes() {
        let attrs = Attributes::new()
            .with(OPTIONS_ATTRIBUTE, r#"{"initialIndex": 2}"#)
            .with(MANUAL_INIT_ATTRIBUTE, "");
        assert!(attrs.manual_init());
        assert_eq!(attrs.engine_options().initial_index(), 2);

        let mut attrs = attrs;
        assert!(attrs.remove(MANUAL_INIT_ATTRIBUTE).is_some());
        assert!(!attrs.manual_init());
    }
}
