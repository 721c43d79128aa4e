//! Canonical media state store
//!
//! A single mutable record per player, owned by the controller. Only the
//! state manager (through canonical event handlers) writes to it; requests
//! and UI read snapshots or subscribe to change notifications.

use crate::{
    error::MediaError,
    time_ranges::TimeRanges,
    types::{AudioTrack, MediaType, PlayerConfig, Source, StreamType, VideoQuality},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// The canonical, observable playback state record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    // Playback flags
    pub paused: bool,
    pub playing: bool,
    pub ended: bool,
    pub seeking: bool,
    pub waiting: bool,
    /// Playback has produced frames at least once this source session
    pub started: bool,

    // Timing
    pub current_time: f64,
    pub duration: f64,
    pub buffered: TimeRanges,
    pub seekable: TimeRanges,
    pub played: TimeRanges,

    // Volume
    pub volume: f64,
    pub muted: bool,

    // Loading
    pub can_load: bool,
    pub can_play: bool,

    // Source
    pub source: Option<Source>,
    pub sources: Vec<Source>,
    pub media_type: MediaType,
    pub stream_type: StreamType,
    /// Name of the loader that resolved the active source
    pub loader: Option<String>,

    // Presentation
    pub fullscreen: bool,
    pub picture_in_picture: bool,
    pub playsinline: bool,
    pub controls: bool,
    pub playback_rate: f64,

    // Errors / autoplay
    pub error: Option<MediaError>,
    pub autoplay: bool,
    pub autoplay_error: Option<MediaError>,
    pub attempting_autoplay: bool,

    // Loop
    pub loop_enabled: bool,

    // Live
    pub live_edge: bool,
    pub live_sync_position: Option<f64>,

    // Tracks
    pub qualities: Vec<VideoQuality>,
    pub quality: Option<usize>,
    pub audio_tracks: Vec<AudioTrack>,
    pub audio_track: Option<usize>,

    // UI
    pub user_idle: bool,
    pub can_load_poster: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            paused: true,
            playing: false,
            ended: false,
            seeking: false,
            waiting: false,
            started: false,
            current_time: 0.0,
            duration: 0.0,
            buffered: TimeRanges::empty(),
            seekable: TimeRanges::empty(),
            played: TimeRanges::empty(),
            volume: 1.0,
            muted: false,
            can_load: false,
            can_play: false,
            source: None,
            sources: Vec::new(),
            media_type: MediaType::Unknown,
            stream_type: StreamType::Unknown,
            loader: None,
            fullscreen: false,
            picture_in_picture: false,
            playsinline: true,
            controls: true,
            playback_rate: 1.0,
            error: None,
            autoplay: false,
            autoplay_error: None,
            attempting_autoplay: false,
            loop_enabled: false,
            live_edge: false,
            live_sync_position: None,
            qualities: Vec::new(),
            quality: None,
            audio_tracks: Vec::new(),
            audio_track: None,
            user_idle: false,
            can_load_poster: true,
        }
    }
}

impl MediaState {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            autoplay: config.autoplay,
            loop_enabled: config.loop_enabled,
            playsinline: config.playsinline,
            ..Default::default()
        }
    }

    pub fn is_live(&self) -> bool {
        self.stream_type.is_live()
    }

    pub fn seekable_start(&self) -> f64 {
        self.seekable.start().unwrap_or(0.0)
    }

    pub fn seekable_end(&self) -> f64 {
        self.seekable.end().unwrap_or(self.duration)
    }

    /// Clear transient per-source playback fields while preserving
    /// session-level settings. Applied on every non-initial source change
    /// and on provider detach.
    pub(crate) fn soft_reset(&mut self) {
        let mut next = MediaState {
            autoplay: self.autoplay,
            can_load: self.can_load,
            controls: self.controls,
            loop_enabled: self.loop_enabled,
            muted: self.muted,
            playsinline: self.playsinline,
            can_load_poster: self.can_load_poster,
            source: self.source.take(),
            sources: std::mem::take(&mut self.sources),
            volume: self.volume,
            user_idle: self.user_idle,
            ..Default::default()
        };
        std::mem::swap(self, &mut next);
    }
}

/// Shared handle over the state record, publishing a snapshot after every
/// mutation
#[derive(Clone)]
pub struct MediaStore {
    state: Arc<RwLock<MediaState>>,
    tx: Arc<watch::Sender<MediaState>>,
}

impl MediaStore {
    pub fn new(initial: MediaState) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            state: Arc::new(RwLock::new(initial)),
            tx: Arc::new(tx),
        }
    }

    /// Snapshot of the current state
    pub async fn get(&self) -> MediaState {
        self.state.read().await.clone()
    }

    /// Read a projection of the current state without cloning it all
    pub async fn read<R>(&self, f: impl FnOnce(&MediaState) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Mutate the state and notify subscribers
    pub async fn update<R>(&self, f: impl FnOnce(&mut MediaState) -> R) -> R {
        let mut state = self.state.write().await;
        let result = f(&mut state);
        let _ = self.tx.send(state.clone());
        result
    }

    pub async fn soft_reset(&self) {
        self.update(|state| state.soft_reset()).await;
    }

    /// Subscribe to state snapshots published after each transition
    pub fn subscribe(&self) -> watch::Receiver<MediaState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_publishes_snapshot() {
        let store = MediaStore::new(MediaState::default());
        let mut rx = store.subscribe();

        store.update(|s| s.current_time = 12.5).await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().current_time, 12.5);
    }

    #[tokio::test]
    async fn test_soft_reset_preserves_session_settings() {
        let store = MediaStore::new(MediaState::default());
        store
            .update(|s| {
                s.volume = 0.4;
                s.muted = true;
                s.autoplay = true;
                s.current_time = 33.0;
                s.buffered = TimeRanges::from_ranges([(0.0, 30.0)]);
                s.error = Some(MediaError::aborted("decode error"));
                s.playing = true;
                s.paused = false;
                s.started = true;
            })
            .await;

        store.soft_reset().await;
        let state = store.get().await;

        assert_eq!(state.volume, 0.4);
        assert!(state.muted);
        assert!(state.autoplay);

        assert_eq!(state.current_time, 0.0);
        assert!(state.buffered.is_empty());
        assert!(state.error.is_none());
        assert!(!state.playing);
        assert!(state.paused);
        assert!(!state.started);
    }

    #[test]
    fn test_seekable_bounds_fall_back_to_duration() {
        let mut state = MediaState {
            duration: 42.0,
            ..Default::default()
        };
        assert_eq!(state.seekable_start(), 0.0);
        assert_eq!(state.seekable_end(), 42.0);

        state.seekable = TimeRanges::from_ranges([(5.0, 30.0)]);
        assert_eq!(state.seekable_start(), 5.0);
        assert_eq!(state.seekable_end(), 30.0);
    }
}
