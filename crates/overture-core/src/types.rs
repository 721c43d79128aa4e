//! Core types for Overture

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier correlating a request with the state change it caused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad media category a loader resolves a source to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    Unknown,
    Audio,
    Video,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Unknown => write!(f, "unknown"),
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// Stream delivery type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StreamType {
    #[default]
    Unknown,
    /// Fixed-duration content with a fully seekable timeline
    OnDemand,
    /// Live stream without a seekable window
    Live,
    /// Live stream with a DVR window
    LiveDvr,
}

impl StreamType {
    pub fn is_live(&self) -> bool {
        matches!(self, StreamType::Live | StreamType::LiveDvr)
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self, StreamType::OnDemand | StreamType::LiveDvr)
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Unknown => write!(f, "unknown"),
            StreamType::OnDemand => write!(f, "on-demand"),
            StreamType::Live => write!(f, "live"),
            StreamType::LiveDvr => write!(f, "live:dvr"),
        }
    }
}

/// A normalized playback source candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Location of the media (URL, blob reference, identifier)
    pub src: String,
    /// MIME type hint, e.g. `video/mp4` or `application/x-mpegurl`
    pub mime_type: Option<String>,
}

impl Source {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Parse the source location as a URL, if it is one.
    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.src).ok()
    }

    /// Lowercased extension of the source path, if any.
    pub fn extension(&self) -> Option<String> {
        let path = self.url().map(|u| u.path().to_string())?;
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        (!ext.is_empty() && !ext.contains('/')).then_some(ext)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.src)
    }
}

/// Which fullscreen capability a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FullscreenTarget {
    /// Use the player-level adapter, falling back to the provider's
    #[default]
    PreferMedia,
    /// Only the player-level adapter
    Media,
    /// Only the provider's own adapter
    Provider,
}

/// Screen orientation lock applied while in fullscreen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrientationLock {
    Landscape,
    Portrait,
}

impl std::fmt::Display for OrientationLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrientationLock::Landscape => write!(f, "landscape"),
            OrientationLock::Portrait => write!(f, "portrait"),
        }
    }
}

/// A selectable video rendition exposed by the active provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoQuality {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Bandwidth in bits per second, when the engine reports it
    pub bitrate: Option<u64>,
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A selectable audio track exposed by the active provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    /// BCP-47 language code
    pub language: String,
    /// Human-readable label
    pub label: String,
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Window for collapsing bursts of engine waiting events (milliseconds)
    pub waiting_debounce_ms: u64,
    /// Margin kept between a committed seek target and the seekable bounds
    /// (some engines treat a seek landing exactly on the end as "ended")
    pub seek_clamp_epsilon: f64,
    /// How far behind the live sync position still counts as at the edge
    /// (seconds)
    pub live_edge_tolerance: f64,
    /// Begin playback as soon as the engine can play
    pub autoplay: bool,
    /// Restart playback when the media ends
    pub loop_enabled: bool,
    /// Play inline rather than entering a platform fullscreen presentation
    pub playsinline: bool,
    /// Orientation lock applied while fullscreen, if any
    pub fullscreen_orientation: Option<OrientationLock>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            waiting_debounce_ms: 300,
            seek_clamp_epsilon: 0.1,
            live_edge_tolerance: 10.0,
            autoplay: false,
            loop_enabled: false,
            playsinline: true,
            fullscreen_orientation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_extension() {
        let source = Source::new("https://example.com/media/stream.m3u8");
        assert_eq!(source.extension().as_deref(), Some("m3u8"));

        let source = Source::new("https://example.com/media/video");
        assert_eq!(source.extension(), None);
    }

    #[test]
    fn test_source_url_tolerates_malformed_input() {
        let source = Source::new("not a url at all");
        assert!(source.url().is_none());
        assert!(source.extension().is_none());
    }

    #[test]
    fn test_stream_type_predicates() {
        assert!(StreamType::Live.is_live());
        assert!(StreamType::LiveDvr.is_live());
        assert!(StreamType::LiveDvr.is_seekable());
        assert!(!StreamType::Live.is_seekable());
        assert!(StreamType::OnDemand.is_seekable());
    }

    #[test]
    fn test_player_config_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.waiting_debounce_ms, 300);
        assert_eq!(config.seek_clamp_epsilon, 0.1);
        assert!(!config.autoplay);
        assert!(config.playsinline);
    }
}
