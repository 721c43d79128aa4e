//! Media request manager
//!
//! Receives imperative request events, validates them against the current
//! state snapshot, records a causality entry so the confirming engine event
//! can be attributed back to the request, and delegates to the active
//! provider adapter.
//!
//! Failure semantics are asymmetric on purpose: `play()` dispatches a
//! canonical `play-fail` event and re-throws so callers can observe the
//! rejection, while pause/fullscreen/picture-in-picture failures are
//! converted to their `*-fail`/`*-error` events and swallowed.

use crate::{
    error::{Error, Result},
    events::{EventPayload, MediaEvent, MediaRequest, RequestCommand, RequestKey},
    provider::{FullscreenAdapter, MediaProvider, ScreenOrientationAdapter},
    state::StateManager,
    store::MediaStore,
    types::{FullscreenTarget, PlayerConfig, StreamType},
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Pending request entries awaiting confirmation, at most one per category.
///
/// A newer request under the same key replaces the older one so only the
/// most recent request is ever attributed as the cause of a state change.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    map: Mutex<HashMap<RequestKey, MediaRequest>>,
}

impl PendingRequests {
    pub(crate) fn record(&self, key: RequestKey, request: MediaRequest) {
        self.lock().insert(key, request);
    }

    pub(crate) fn take(&self, key: RequestKey) -> Option<MediaRequest> {
        self.lock().remove(&key)
    }

    pub(crate) fn contains(&self, key: RequestKey) -> bool {
        self.lock().contains_key(&key)
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestKey, MediaRequest>> {
        self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Transient flags shared between the request and state managers.
///
/// `looping`/`replay` suppress the normal ended/play side effects during a
/// loop restart; `seeking_request` marks a scrub in progress so engine
/// seeked/waiting events are not misreported.
#[derive(Debug, Default)]
pub(crate) struct PlaybackFlags {
    looping: AtomicBool,
    replay: AtomicBool,
    seeking_request: AtomicBool,
}

impl PlaybackFlags {
    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub(crate) fn set_looping(&self, value: bool) {
        self.looping.store(value, Ordering::SeqCst);
    }

    pub(crate) fn take_looping(&self) -> bool {
        self.looping.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn set_replay(&self, value: bool) {
        self.replay.store(value, Ordering::SeqCst);
    }

    pub(crate) fn take_replay(&self) -> bool {
        self.replay.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn is_seeking_request(&self) -> bool {
        self.seeking_request.load(Ordering::SeqCst)
    }

    pub(crate) fn set_seeking_request(&self, value: bool) {
        self.seeking_request.store(value, Ordering::SeqCst);
    }

    pub(crate) fn reset(&self) {
        self.set_looping(false);
        self.set_replay(false);
        self.set_seeking_request(false);
    }
}

pub(crate) type ProviderSlot = Arc<RwLock<Option<Arc<dyn MediaProvider>>>>;

/// Validates and dispatches imperative playback requests
pub struct RequestManager {
    config: PlayerConfig,
    store: MediaStore,
    pending: Arc<PendingRequests>,
    flags: Arc<PlaybackFlags>,
    provider: ProviderSlot,
    state: Arc<StateManager>,
    fullscreen: Option<Arc<dyn FullscreenAdapter>>,
    orientation: Option<Arc<dyn ScreenOrientationAdapter>>,
    restore_pip: AtomicBool,
    orientation_locked: AtomicBool,
}

impl RequestManager {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: PlayerConfig,
        store: MediaStore,
        pending: Arc<PendingRequests>,
        flags: Arc<PlaybackFlags>,
        provider: ProviderSlot,
        state: Arc<StateManager>,
        fullscreen: Option<Arc<dyn FullscreenAdapter>>,
        orientation: Option<Arc<dyn ScreenOrientationAdapter>>,
    ) -> Self {
        Self {
            config,
            store,
            pending,
            flags,
            provider,
            state,
            fullscreen,
            orientation,
            restore_pip: AtomicBool::new(false),
            orientation_locked: AtomicBool::new(false),
        }
    }

    /// Route a request event to its category handler.
    pub async fn handle(&self, request: MediaRequest) -> Result<()> {
        match request.command.clone() {
            RequestCommand::Play => self.play(request).await,
            RequestCommand::Pause => self.pause(request).await,
            RequestCommand::Seek { time } => self.seek(request, time).await,
            RequestCommand::Seeking { time } => self.seeking(request, time).await,
            RequestCommand::SetVolume { volume } => self.set_volume(request, volume).await,
            RequestCommand::Mute => self.set_muted(request, true).await,
            RequestCommand::Unmute => self.set_muted(request, false).await,
            RequestCommand::EnterFullscreen { target } => {
                self.enter_fullscreen(request, target).await
            }
            RequestCommand::ExitFullscreen { target } => {
                self.exit_fullscreen(request, target).await
            }
            RequestCommand::EnterPictureInPicture => {
                self.enter_picture_in_picture(request).await
            }
            RequestCommand::ExitPictureInPicture => self.exit_picture_in_picture(request).await,
            RequestCommand::SetRate { rate } => self.set_rate(request, rate).await,
            RequestCommand::SelectQuality { quality } => {
                self.select_quality(request, quality).await
            }
            RequestCommand::SelectAudioTrack { track } => {
                self.select_audio_track(request, track).await
            }
            RequestCommand::StartLoading => self.start_loading(request).await,
            RequestCommand::Loop => self.restart_loop(request).await,
            RequestCommand::ResumeUserIdle => self.set_user_idle(request, true).await,
            RequestCommand::PauseUserIdle => self.set_user_idle(request, false).await,
            RequestCommand::ShowPoster => self.set_poster_visible(request, true).await,
            RequestCommand::HidePoster => self.set_poster_visible(request, false).await,
        }
    }

    /// Start playback.
    ///
    /// The only category that re-throws engine failures: the `play-fail`
    /// event is dispatched first, then the error propagates to the caller.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn play(&self, request: MediaRequest) -> Result<()> {
        let snapshot = self.store.get().await;
        if !snapshot.paused {
            debug!("play ignored: not paused");
            return Ok(());
        }
        if !snapshot.can_play {
            return Err(Error::NotReady { operation: "play" });
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Play, request);

        let result: Result<()> = async {
            if snapshot.ended {
                // Restart from the beginning; not every engine rewinds itself
                provider.set_current_time(snapshot.seekable_start()).await?;
            }
            provider.play().await
        }
        .await;

        if let Err(err) = &result {
            let error = err.to_media_error();
            warn!(error = %error, "play rejected by engine");
            self.state
                .handle(MediaEvent::new(EventPayload::PlayFail { error }))
                .await;
        }
        result
    }

    /// Pause playback. Engine failures are converted to `pause-fail` and
    /// swallowed.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn pause(&self, request: MediaRequest) -> Result<()> {
        let snapshot = self.store.get().await;
        if snapshot.paused {
            debug!("pause ignored: already paused");
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Pause, request);

        if let Err(err) = provider.pause().await {
            let error = err.to_media_error();
            debug!(error = %error, "pause rejected by engine");
            self.state
                .handle(MediaEvent::new(EventPayload::PauseFail { error }))
                .await;
        }
        Ok(())
    }

    /// Commit a seek. The target is clamped away from the seekable bounds;
    /// targets with no finite seekable range are dropped without enqueuing.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn seek(&self, request: MediaRequest, time: f64) -> Result<()> {
        let snapshot = self.store.get().await;
        if !snapshot.can_play {
            return Err(Error::NotReady { operation: "seek" });
        }
        if matches!(snapshot.stream_type, StreamType::Live) {
            debug!("seek dropped: stream is not seekable");
            return Ok(());
        }
        if snapshot.seekable.is_empty() {
            debug!("seek dropped: no seekable range");
            return Ok(());
        }

        let start = snapshot.seekable_start();
        let end = snapshot.seekable_end();
        if !end.is_finite() {
            debug!("seek dropped: seekable end is not finite");
            return Ok(());
        }

        // Landing exactly on a boundary makes some engines report "ended"
        let lo = start + self.config.seek_clamp_epsilon;
        let hi = (end - self.config.seek_clamp_epsilon).max(lo);
        let target = time.clamp(lo, hi);

        let provider = self.provider().await?;
        self.flags.set_seeking_request(false);
        self.pending.record(RequestKey::Seeked, request);
        self.state
            .handle(MediaEvent::new(EventPayload::Seeking { time: target }))
            .await;

        debug!(requested = time, target, "seek committed");
        provider.set_current_time(target).await
    }

    /// Scrub-in-progress position update. Updates observable state and
    /// records causality but does not hit the provider; only the commit
    /// does.
    pub async fn seeking(&self, request: MediaRequest, time: f64) -> Result<()> {
        let snapshot = self.store.get().await;
        if !snapshot.can_play {
            return Err(Error::NotReady { operation: "seeking" });
        }

        self.flags.set_seeking_request(true);
        self.pending.record(RequestKey::Seeking, request);
        self.state
            .handle(MediaEvent::new(EventPayload::Seeking { time }))
            .await;
        Ok(())
    }

    pub async fn set_volume(&self, request: MediaRequest, volume: f64) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        let snapshot = self.store.get().await;
        if (snapshot.volume - volume).abs() < f64::EPSILON {
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Volume, request);
        provider.set_volume(volume).await
    }

    pub async fn set_muted(&self, request: MediaRequest, muted: bool) -> Result<()> {
        let snapshot = self.store.get().await;
        if snapshot.muted == muted {
            debug!(muted, "mute request ignored: state already holds");
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Volume, request);
        provider.set_muted(muted).await
    }

    /// Enter fullscreen. Exits picture-in-picture first when active and
    /// restores it after fullscreen exits; the orientation lock is applied
    /// only after the entry succeeds.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn enter_fullscreen(
        &self,
        request: MediaRequest,
        target: FullscreenTarget,
    ) -> Result<()> {
        let adapter = self.resolve_fullscreen(target).await?;
        if adapter.active().await {
            return Ok(());
        }

        self.pending.record(RequestKey::Fullscreen, request);

        if self.store.read(|s| s.picture_in_picture).await {
            if let Ok(provider) = self.provider().await {
                if let Some(pip) = provider.picture_in_picture() {
                    if pip.exit().await.is_ok() {
                        self.restore_pip.store(true, Ordering::SeqCst);
                    }
                }
            }
        }

        match adapter.enter().await {
            Ok(()) => {
                self.apply_orientation_lock().await;
                Ok(())
            }
            Err(err) => {
                let error = err.to_media_error();
                debug!(error = %error, "fullscreen entry rejected");
                self.state
                    .handle(MediaEvent::new(EventPayload::FullscreenError { error }))
                    .await;
                Ok(())
            }
        }
    }

    /// Exit fullscreen, releasing the orientation lock before the exit
    /// completes and restoring picture-in-picture when it was displaced.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn exit_fullscreen(
        &self,
        request: MediaRequest,
        target: FullscreenTarget,
    ) -> Result<()> {
        let adapter = self.resolve_fullscreen(target).await?;
        if !adapter.active().await {
            return Ok(());
        }

        self.pending.record(RequestKey::Fullscreen, request);
        self.release_orientation_lock().await;

        match adapter.exit().await {
            Ok(()) => {
                if self.restore_pip.swap(false, Ordering::SeqCst) {
                    let restore = MediaRequest::new(RequestCommand::EnterPictureInPicture);
                    if let Err(err) = self.enter_picture_in_picture(restore).await {
                        debug!(error = %err, "picture-in-picture restore failed");
                    }
                }
                Ok(())
            }
            Err(err) => {
                let error = err.to_media_error();
                debug!(error = %error, "fullscreen exit rejected");
                self.state
                    .handle(MediaEvent::new(EventPayload::FullscreenError { error }))
                    .await;
                Ok(())
            }
        }
    }

    pub async fn enter_picture_in_picture(&self, request: MediaRequest) -> Result<()> {
        let provider = self.provider().await?;
        let pip = provider.picture_in_picture().ok_or(Error::Unsupported {
            capability: "picture-in-picture",
        })?;
        if pip.active().await {
            return Ok(());
        }

        self.pending.record(RequestKey::PictureInPicture, request);
        if let Err(err) = pip.enter().await {
            let error = err.to_media_error();
            debug!(error = %error, "picture-in-picture entry rejected");
            self.state
                .handle(MediaEvent::new(EventPayload::PictureInPictureError { error }))
                .await;
        }
        Ok(())
    }

    pub async fn exit_picture_in_picture(&self, request: MediaRequest) -> Result<()> {
        let provider = self.provider().await?;
        let pip = provider.picture_in_picture().ok_or(Error::Unsupported {
            capability: "picture-in-picture",
        })?;
        if !pip.active().await {
            return Ok(());
        }

        self.pending.record(RequestKey::PictureInPicture, request);
        if let Err(err) = pip.exit().await {
            let error = err.to_media_error();
            debug!(error = %error, "picture-in-picture exit rejected");
            self.state
                .handle(MediaEvent::new(EventPayload::PictureInPictureError { error }))
                .await;
        }
        Ok(())
    }

    pub async fn set_rate(&self, request: MediaRequest, rate: f64) -> Result<()> {
        let snapshot = self.store.get().await;
        if (snapshot.playback_rate - rate).abs() < f64::EPSILON {
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Rate, request);
        provider.set_playback_rate(rate).await
    }

    pub async fn select_quality(
        &self,
        request: MediaRequest,
        quality: Option<usize>,
    ) -> Result<()> {
        let snapshot = self.store.get().await;
        if snapshot.quality == quality {
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::Quality, request);
        provider.select_quality(quality).await
    }

    pub async fn select_audio_track(&self, request: MediaRequest, track: usize) -> Result<()> {
        let snapshot = self.store.get().await;
        if snapshot.audio_track == Some(track) {
            return Ok(());
        }

        let provider = self.provider().await?;
        self.pending.record(RequestKey::AudioTrack, request);
        provider.select_audio_track(track).await
    }

    pub async fn start_loading(&self, request: MediaRequest) -> Result<()> {
        if self.store.read(|s| s.can_load).await {
            return Ok(());
        }
        self.pending.record(RequestKey::Load, request);
        self.state
            .handle(MediaEvent::new(EventPayload::CanLoad))
            .await;
        Ok(())
    }

    /// Restart playback for a loop. Deferred one scheduler tick; sets the
    /// looping/replay flags so the state manager suppresses the restart's
    /// ended/play side effects, rolling both back if `play()` rejects.
    pub async fn restart_loop(&self, _request: MediaRequest) -> Result<()> {
        tokio::task::yield_now().await;

        self.flags.set_looping(true);
        self.flags.set_replay(true);

        let result: Result<()> = async {
            let provider = self.provider().await?;
            let snapshot = self.store.get().await;
            provider.set_current_time(snapshot.seekable_start()).await?;
            provider.play().await
        }
        .await;

        if let Err(err) = result {
            self.flags.set_looping(false);
            self.flags.set_replay(false);
            let error = err.to_media_error();
            warn!(error = %error, "loop restart failed");
            self.state
                .handle(MediaEvent::new(EventPayload::PlayFail { error }))
                .await;
        }
        Ok(())
    }

    pub async fn set_user_idle(&self, request: MediaRequest, idle: bool) -> Result<()> {
        if self.store.read(|s| s.user_idle).await == idle {
            return Ok(());
        }
        self.pending.record(RequestKey::UserIdle, request);
        self.state
            .handle(MediaEvent::new(EventPayload::UserIdleChange { idle }))
            .await;
        Ok(())
    }

    pub async fn set_poster_visible(&self, request: MediaRequest, can_load: bool) -> Result<()> {
        if self.store.read(|s| s.can_load_poster).await == can_load {
            return Ok(());
        }
        self.pending.record(RequestKey::Poster, request);
        self.state
            .handle(MediaEvent::new(EventPayload::PosterChange { can_load }))
            .await;
        Ok(())
    }

    async fn provider(&self) -> Result<Arc<dyn MediaProvider>> {
        self.provider.read().await.clone().ok_or(Error::NoProvider)
    }

    /// Prefer the player-level fullscreen capability unless the caller
    /// targets the provider's own, or the player-level one is unsupported.
    async fn resolve_fullscreen(
        &self,
        target: FullscreenTarget,
    ) -> Result<Arc<dyn FullscreenAdapter>> {
        let media = self
            .fullscreen
            .as_ref()
            .filter(|adapter| adapter.supported())
            .cloned();

        let provider = match self.provider.read().await.as_ref() {
            Some(provider) => provider.fullscreen().filter(|a| a.supported()),
            None => None,
        };

        let resolved = match target {
            FullscreenTarget::Media => media,
            FullscreenTarget::Provider => provider,
            FullscreenTarget::PreferMedia => media.or(provider),
        };

        resolved.ok_or(Error::Unsupported {
            capability: "fullscreen",
        })
    }

    async fn apply_orientation_lock(&self) {
        let (Some(orientation), Some(lock)) =
            (self.orientation.as_ref(), self.config.fullscreen_orientation)
        else {
            return;
        };
        if !orientation.supported() {
            return;
        }
        match orientation.lock(lock).await {
            Ok(()) => self.orientation_locked.store(true, Ordering::SeqCst),
            Err(err) => warn!(error = %err, %lock, "orientation lock failed"),
        }
    }

    async fn release_orientation_lock(&self) {
        if !self.orientation_locked.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(orientation) = self.orientation.as_ref() {
            if let Err(err) = orientation.unlock().await {
                warn!(error = %err, "orientation unlock failed");
            }
        }
    }
}
