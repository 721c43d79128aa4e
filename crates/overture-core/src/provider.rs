//! Provider adapter contract
//!
//! Any playback engine (a native media element bridge, an HLS engine, a
//! programmatic renderer) is driven through [`MediaProvider`]. The request
//! manager only ever talks to this surface; engines report back by pushing
//! canonical events into the state manager.

use crate::{
    error::{Error, Result},
    types::OrientationLock,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Discriminates the family of engine behind a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Native media element playback
    Html,
    /// HLS engine layered on top of a media element
    Hls,
    /// Programmatic renderer or other third-party engine
    Custom,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Html => write!(f, "html"),
            ProviderKind::Hls => write!(f, "hls"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

/// Minimal capability surface a playback engine must satisfy.
///
/// `play` and `pause` are fallible: engines reject for policy reasons
/// (autoplay) or because they were torn down mid-call. Quality and audio
/// track selection default to unsupported since plain engines have no
/// rendition ladder.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn paused(&self) -> bool;
    async fn muted(&self) -> bool;
    async fn volume(&self) -> f64;
    async fn current_time(&self) -> f64;

    fn playsinline(&self) -> bool {
        true
    }

    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;

    async fn set_current_time(&self, time: f64) -> Result<()>;
    async fn set_volume(&self, volume: f64) -> Result<()>;
    async fn set_muted(&self, muted: bool) -> Result<()>;
    async fn set_playback_rate(&self, rate: f64) -> Result<()>;

    async fn select_quality(&self, _quality: Option<usize>) -> Result<()> {
        Err(Error::Unsupported {
            capability: "quality selection",
        })
    }

    async fn select_audio_track(&self, _track: usize) -> Result<()> {
        Err(Error::Unsupported {
            capability: "audio track selection",
        })
    }

    /// Engine-level fullscreen capability, if the engine presents its own
    /// surface (e.g. an embedded platform view).
    fn fullscreen(&self) -> Option<Arc<dyn FullscreenAdapter>> {
        None
    }

    fn picture_in_picture(&self) -> Option<Arc<dyn PictureInPictureAdapter>> {
        None
    }
}

/// Fullscreen capability, satisfied either by the player shell (the
/// document-level capability) or by a provider's own surface.
#[async_trait]
pub trait FullscreenAdapter: Send + Sync {
    fn supported(&self) -> bool {
        true
    }

    async fn active(&self) -> bool;
    async fn enter(&self) -> Result<()>;
    async fn exit(&self) -> Result<()>;
}

/// Picture-in-picture capability
#[async_trait]
pub trait PictureInPictureAdapter: Send + Sync {
    fn supported(&self) -> bool {
        true
    }

    async fn active(&self) -> bool;
    async fn enter(&self) -> Result<()>;
    async fn exit(&self) -> Result<()>;
}

/// Screen orientation capability (external collaborator; present only on
/// platforms that can lock orientation)
#[async_trait]
pub trait ScreenOrientationAdapter: Send + Sync {
    fn supported(&self) -> bool {
        true
    }

    async fn lock(&self, orientation: OrientationLock) -> Result<()>;
    async fn unlock(&self) -> Result<()>;
}
