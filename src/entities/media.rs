//! Media handle contract.
//!
//! A media handle is whatever embeds actual video playback. The carousel
//! layer only needs readiness and transport controls; it never decodes.
//! Handles emit [`MediaEvent`](super::events::MediaEvent) signals on the bus
//! from their own element.

use serde::Serialize;

/// Transport command applied to media handles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum MediaCommand {
    Play,
    Pause,
    /// Seek to offset in seconds
    Seek(f64),
}

impl MediaCommand {
    /// Method name as exposed by media handles.
    pub fn name(&self) -> &'static str {
        match self {
            MediaCommand::Play => "play",
            MediaCommand::Pause => "pause",
            MediaCommand::Seek(_) => "seek",
        }
    }

    /// Apply command to a handle. Readiness is the caller's business.
    pub fn apply(&self, handle: &dyn MediaHandle) -> Result<(), MediaError> {
        match *self {
            MediaCommand::Play => handle.play(),
            MediaCommand::Pause => handle.pause(),
            MediaCommand::Seek(offset) => handle.seek(offset),
        }
    }
}

impl std::fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaCommand::Seek(offset) => write!(f, "seek({})", offset),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Media operation errors
#[derive(Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Handle does not implement the method
    Unsupported(&'static str),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::Unsupported(method) => write!(f, "method {} does not exist", method),
        }
    }
}

impl std::error::Error for MediaError {}

/// Playable video-like resource.
///
/// Methods take `&self`: handles are shared between the embedding code and
/// the slide that tracks them, so implementations use interior mutability.
/// `seek` is optional; handles that cannot seek keep the default.
pub trait MediaHandle {
    fn is_ready(&self) -> bool;

    fn play(&self) -> Result<(), MediaError>;

    fn pause(&self) -> Result<(), MediaError>;

    fn seek(&self, _offset: f64) -> Result<(), MediaError> {
        Err(MediaError::Unsupported("seek"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct NoSeek {
        calls: RefCell<Vec<&'static str>>,
    }

    impl MediaHandle for NoSeek {
        fn is_ready(&self) -> bool {
            true
        }
        fn play(&self) -> Result<(), MediaError> {
            self.calls.borrow_mut().push("play");
            Ok(())
        }
        fn pause(&self) -> Result<(), MediaError> {
            self.calls.borrow_mut().push("pause");
            Ok(())
        }
    }

    #[test]
    fn test_apply_dispatches_to_method() {
        let media = NoSeek::default();
        MediaCommand::Play.apply(&media).unwrap();
        MediaCommand::Pause.apply(&media).unwrap();
        assert_eq!(*media.calls.borrow(), vec!["play", "pause"]);
    }

    #[test]
    fn test_default_seek_is_unsupported() {
        let media = NoSeek::default();
        let err = MediaCommand::Seek(0.0).apply(&media).unwrap_err();
        assert_eq!(err, MediaError::Unsupported("seek"));
        assert_eq!(err.to_string(), "method seek does not exist");
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaCommand::Play.to_string(), "play");
        assert_eq!(MediaCommand::Seek(1.5).to_string(), "seek(1.5)");
    }
}
