//! Canonical media events and request events
//!
//! Engines emit heterogeneous, inconsistent event streams; the state manager
//! normalizes them into the closed [`EventPayload`] set below. Requests
//! mirror the canonical vocabulary from the imperative side and carry a
//! correlation id so a confirmation event can be attributed to the exact
//! request that caused it.

use crate::{
    error::MediaError,
    provider::ProviderKind,
    time_ranges::TimeRanges,
    types::{
        AudioTrack, FullscreenTarget, MediaType, RequestId, Source, StreamType, VideoQuality,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Canonical media event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EventPayload {
    CanLoad,
    SourceChange { source: Source },
    MediaTypeChange { media_type: MediaType },
    StreamTypeChange { stream_type: StreamType },
    ProviderLoaderChange { loader: String },
    ProviderChange { kind: Option<ProviderKind> },
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    CanPlay { duration: f64 },
    Play,
    PlayFail { error: MediaError },
    Playing,
    Pause,
    PauseFail { error: MediaError },
    TimeUpdate { current_time: f64 },
    Progress { buffered: TimeRanges, seekable: TimeRanges },
    Seeking { time: f64 },
    Seeked { time: f64 },
    Waiting,
    Ended,
    Replay,
    Started,
    VolumeChange { volume: f64, muted: bool },
    RateChange { rate: f64 },
    FullscreenChange { active: bool },
    FullscreenError { error: MediaError },
    PictureInPictureChange { active: bool },
    PictureInPictureError { error: MediaError },
    QualitiesChange { qualities: Vec<VideoQuality> },
    QualityChange { quality: Option<usize> },
    AudioTracksChange { tracks: Vec<AudioTrack> },
    AudioTrackChange { track: Option<usize> },
    AutoplayFail { error: MediaError },
    LiveEdgeChange { at_edge: bool },
    UserIdleChange { idle: bool },
    PosterChange { can_load: bool },
    Error { error: MediaError, fatal: bool },
}

/// Fieldless mirror of [`EventPayload`], used for tracked-event maps and
/// trigger-chain queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CanLoad,
    SourceChange,
    MediaTypeChange,
    StreamTypeChange,
    ProviderLoaderChange,
    ProviderChange,
    LoadedMetadata,
    DurationChange,
    CanPlay,
    Play,
    PlayFail,
    Playing,
    Pause,
    PauseFail,
    TimeUpdate,
    Progress,
    Seeking,
    Seeked,
    Waiting,
    Ended,
    Replay,
    Started,
    VolumeChange,
    RateChange,
    FullscreenChange,
    FullscreenError,
    PictureInPictureChange,
    PictureInPictureError,
    QualitiesChange,
    QualityChange,
    AudioTracksChange,
    AudioTrackChange,
    AutoplayFail,
    LiveEdgeChange,
    UserIdleChange,
    PosterChange,
    Error,
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::CanLoad => EventKind::CanLoad,
            EventPayload::SourceChange { .. } => EventKind::SourceChange,
            EventPayload::MediaTypeChange { .. } => EventKind::MediaTypeChange,
            EventPayload::StreamTypeChange { .. } => EventKind::StreamTypeChange,
            EventPayload::ProviderLoaderChange { .. } => EventKind::ProviderLoaderChange,
            EventPayload::ProviderChange { .. } => EventKind::ProviderChange,
            EventPayload::LoadedMetadata { .. } => EventKind::LoadedMetadata,
            EventPayload::DurationChange { .. } => EventKind::DurationChange,
            EventPayload::CanPlay { .. } => EventKind::CanPlay,
            EventPayload::Play => EventKind::Play,
            EventPayload::PlayFail { .. } => EventKind::PlayFail,
            EventPayload::Playing => EventKind::Playing,
            EventPayload::Pause => EventKind::Pause,
            EventPayload::PauseFail { .. } => EventKind::PauseFail,
            EventPayload::TimeUpdate { .. } => EventKind::TimeUpdate,
            EventPayload::Progress { .. } => EventKind::Progress,
            EventPayload::Seeking { .. } => EventKind::Seeking,
            EventPayload::Seeked { .. } => EventKind::Seeked,
            EventPayload::Waiting => EventKind::Waiting,
            EventPayload::Ended => EventKind::Ended,
            EventPayload::Replay => EventKind::Replay,
            EventPayload::Started => EventKind::Started,
            EventPayload::VolumeChange { .. } => EventKind::VolumeChange,
            EventPayload::RateChange { .. } => EventKind::RateChange,
            EventPayload::FullscreenChange { .. } => EventKind::FullscreenChange,
            EventPayload::FullscreenError { .. } => EventKind::FullscreenError,
            EventPayload::PictureInPictureChange { .. } => EventKind::PictureInPictureChange,
            EventPayload::PictureInPictureError { .. } => EventKind::PictureInPictureError,
            EventPayload::QualitiesChange { .. } => EventKind::QualitiesChange,
            EventPayload::QualityChange { .. } => EventKind::QualityChange,
            EventPayload::AudioTracksChange { .. } => EventKind::AudioTracksChange,
            EventPayload::AudioTrackChange { .. } => EventKind::AudioTrackChange,
            EventPayload::AutoplayFail { .. } => EventKind::AutoplayFail,
            EventPayload::LiveEdgeChange { .. } => EventKind::LiveEdgeChange,
            EventPayload::UserIdleChange { .. } => EventKind::UserIdleChange,
            EventPayload::PosterChange { .. } => EventKind::PosterChange,
            EventPayload::Error { .. } => EventKind::Error,
        }
    }
}

impl EventKind {
    /// Events remembered for trigger-chaining. Everything else is transient
    /// and never becomes the cause of a later event.
    pub fn is_tracked(&self) -> bool {
        matches!(
            self,
            EventKind::CanLoad
                | EventKind::SourceChange
                | EventKind::LoadedMetadata
                | EventKind::CanPlay
                | EventKind::Play
                | EventKind::PlayFail
                | EventKind::Playing
                | EventKind::Pause
                | EventKind::Seeking
                | EventKind::Seeked
                | EventKind::Waiting
                | EventKind::Ended
                | EventKind::Replay
                | EventKind::Started
        )
    }
}

/// A canonical media event with diagnostics metadata
#[derive(Debug, Clone)]
pub struct MediaEvent {
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
    /// The event that causally preceded this one, if known
    pub trigger: Option<Arc<MediaEvent>>,
    /// The request this event confirms, attached when a pending request
    /// entry is served
    pub request: Option<MediaRequest>,
}

impl MediaEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
            trigger: None,
            request: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Arc<MediaEvent>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Walk the trigger chain back to the root cause.
    pub fn origin(&self) -> &MediaEvent {
        let mut current = self;
        while let Some(trigger) = &current.trigger {
            current = trigger;
        }
        current
    }

    /// True if any event in the trigger chain is of the given kind.
    pub fn triggered_by(&self, kind: EventKind) -> bool {
        let mut current = self.trigger.as_deref();
        while let Some(event) = current {
            if event.kind() == kind {
                return true;
            }
            current = event.trigger.as_deref();
        }
        false
    }
}

/// Imperative request commands, one per supported category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
pub enum RequestCommand {
    Play,
    Pause,
    /// Commit a seek to the given time
    Seek { time: f64 },
    /// Scrub-in-progress position update (throttled upstream)
    Seeking { time: f64 },
    SetVolume { volume: f64 },
    Mute,
    Unmute,
    EnterFullscreen { target: FullscreenTarget },
    ExitFullscreen { target: FullscreenTarget },
    EnterPictureInPicture,
    ExitPictureInPicture,
    SetRate { rate: f64 },
    SelectQuality { quality: Option<usize> },
    SelectAudioTrack { track: usize },
    StartLoading,
    Loop,
    ResumeUserIdle,
    PauseUserIdle,
    ShowPoster,
    HidePoster,
}

/// Category key under which a pending request awaits confirmation.
///
/// At most one request is pending per key; a newer request under the same
/// key replaces the older one so only the most recent request is ever
/// attributed as the cause of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKey {
    Play,
    Pause,
    Seeking,
    Seeked,
    Volume,
    Rate,
    Fullscreen,
    PictureInPicture,
    Quality,
    AudioTrack,
    Load,
    Loop,
    UserIdle,
    Poster,
}

/// A user/UI-originated request event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRequest {
    pub id: RequestId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub command: RequestCommand,
}

impl MediaRequest {
    pub fn new(command: RequestCommand) -> Self {
        Self {
            id: RequestId::new(),
            timestamp: Utc::now(),
            command,
        }
    }

    /// The pending-map category this request is confirmed under
    pub fn key(&self) -> RequestKey {
        match self.command {
            RequestCommand::Play => RequestKey::Play,
            RequestCommand::Pause => RequestKey::Pause,
            RequestCommand::Seek { .. } => RequestKey::Seeked,
            RequestCommand::Seeking { .. } => RequestKey::Seeking,
            RequestCommand::SetVolume { .. }
            | RequestCommand::Mute
            | RequestCommand::Unmute => RequestKey::Volume,
            RequestCommand::EnterFullscreen { .. }
            | RequestCommand::ExitFullscreen { .. } => RequestKey::Fullscreen,
            RequestCommand::EnterPictureInPicture
            | RequestCommand::ExitPictureInPicture => RequestKey::PictureInPicture,
            RequestCommand::SetRate { .. } => RequestKey::Rate,
            RequestCommand::SelectQuality { .. } => RequestKey::Quality,
            RequestCommand::SelectAudioTrack { .. } => RequestKey::AudioTrack,
            RequestCommand::StartLoading => RequestKey::Load,
            RequestCommand::Loop => RequestKey::Loop,
            RequestCommand::ResumeUserIdle | RequestCommand::PauseUserIdle => {
                RequestKey::UserIdle
            }
            RequestCommand::ShowPoster | RequestCommand::HidePoster => RequestKey::Poster,
        }
    }
}
