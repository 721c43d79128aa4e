//! Error types for Overture Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-level failure payload.
///
/// Shaped like the platform media errors playback engines surface (for
/// example a `play()` rejected with `NotAllowedError` by an autoplay
/// policy), so it can ride inside canonical `*-fail` event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct MediaError {
    /// Platform error name, e.g. `NotAllowedError`
    pub name: String,
    /// Human-readable description
    pub message: String,
}

impl MediaError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Rejected by a user-agent policy (autoplay, gesture requirements).
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new("NotAllowedError", message)
    }

    /// The engine cannot perform the operation.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new("NotSupportedError", message)
    }

    /// The operation was aborted before it completed.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new("AbortError", message)
    }
}

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Precondition violations
    #[error("`{operation}` was requested before playback is ready")]
    NotReady { operation: &'static str },

    #[error("{capability} is not supported in this environment")]
    Unsupported { capability: &'static str },

    #[error("no provider is attached")]
    NoProvider,

    // Source selection errors
    #[error("no loader can play any of the given sources")]
    NoPlayableSource,

    // Engine failures
    #[error("playback failed: {0}")]
    Playback(MediaError),

    #[error("fullscreen request failed: {0}")]
    Fullscreen(MediaError),

    #[error("picture-in-picture request failed: {0}")]
    PictureInPicture(MediaError),

    #[error("screen orientation lock failed: {0}")]
    Orientation(MediaError),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Extract the engine-level payload, synthesizing one for errors that
    /// did not originate from an engine.
    pub fn to_media_error(&self) -> MediaError {
        match self {
            Error::Playback(e)
            | Error::Fullscreen(e)
            | Error::PictureInPicture(e)
            | Error::Orientation(e) => e.clone(),
            Error::Unsupported { capability } => {
                MediaError::not_supported(format!("{capability} is not supported"))
            }
            other => MediaError::new("UnknownError", other.to_string()),
        }
    }

    /// Returns true if this error is recoverable by a later user action
    /// (an autoplay rejection is retried on the next explicit play).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Playback(e) if e.name == "NotAllowedError")
    }

    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotReady { .. } => "NOT_READY",
            Error::Unsupported { .. } => "UNSUPPORTED",
            Error::NoProvider => "NO_PROVIDER",
            Error::NoPlayableSource => "NO_PLAYABLE_SOURCE",
            Error::Playback(_) => "PLAYBACK",
            Error::Fullscreen(_) => "FULLSCREEN",
            Error::PictureInPicture(_) => "PICTURE_IN_PICTURE",
            Error::Orientation(_) => "ORIENTATION",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_display() {
        let err = MediaError::not_allowed("play() requires a user gesture");
        assert_eq!(
            err.to_string(),
            "NotAllowedError: play() requires a user gesture"
        );
    }

    #[test]
    fn test_recoverable_autoplay_rejection() {
        let err = Error::Playback(MediaError::not_allowed("blocked"));
        assert!(err.is_recoverable());

        let err = Error::Playback(MediaError::aborted("torn down"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_to_media_error_synthesizes_payload() {
        let err = Error::NoProvider;
        let media = err.to_media_error();
        assert_eq!(media.name, "UnknownError");
        assert_eq!(media.message, "no provider is attached");
    }
}
