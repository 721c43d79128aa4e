//! Media state manager
//!
//! Normalizes the raw event streams emitted by playback engines into the
//! canonical event set, reconciles them against pending request entries
//! (attaching the causing request to the outgoing event), maintains the
//! trigger chain used for diagnostics and cycle-avoidance, and is the only
//! writer of the media state store.

use crate::{
    events::{EventKind, EventPayload, MediaEvent, MediaRequest, RequestCommand, RequestKey},
    live::LiveEdgeTracker,
    request::{PendingRequests, PlaybackFlags},
    store::MediaStore,
    types::PlayerConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Result of applying one event: whether outward propagation is suppressed
/// and which synthetic events follow from it.
struct Applied {
    suppress: bool,
    follow_ups: Vec<MediaEvent>,
}

impl Applied {
    fn pass() -> Self {
        Self {
            suppress: false,
            follow_ups: Vec::new(),
        }
    }

    fn suppress() -> Self {
        Self {
            suppress: true,
            follow_ups: Vec::new(),
        }
    }
}

/// Subscribes to canonical media events and drives the state store
pub struct StateManager {
    config: PlayerConfig,
    store: MediaStore,
    pending: Arc<PendingRequests>,
    flags: Arc<PlaybackFlags>,
    events_tx: broadcast::Sender<MediaEvent>,
    /// Internal request inbox, used for loop restarts
    requests_tx: mpsc::UnboundedSender<MediaRequest>,
    tracked: Mutex<HashMap<EventKind, Arc<MediaEvent>>>,
    waiting_timer: Mutex<Option<JoinHandle<()>>>,
    live: Mutex<LiveEdgeTracker>,
    first_source_seen: AtomicBool,
    self_ref: Weak<StateManager>,
}

impl StateManager {
    pub(crate) fn create(
        config: PlayerConfig,
        store: MediaStore,
        pending: Arc<PendingRequests>,
        flags: Arc<PlaybackFlags>,
        events_tx: broadcast::Sender<MediaEvent>,
        requests_tx: mpsc::UnboundedSender<MediaRequest>,
    ) -> Arc<Self> {
        let live = LiveEdgeTracker::new(config.live_edge_tolerance);
        Arc::new_cyclic(|weak| Self {
            config,
            store,
            pending,
            flags,
            events_tx,
            requests_tx,
            tracked: Mutex::new(HashMap::new()),
            waiting_timer: Mutex::new(None),
            live: Mutex::new(live),
            first_source_seen: AtomicBool::new(false),
            self_ref: weak.clone(),
        })
    }

    /// Subscribe to the outgoing canonical event stream
    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events_tx.subscribe()
    }

    /// Normalize and apply a canonical media event.
    ///
    /// Synthetic follow-up events (replay, started, live-edge changes) are
    /// processed in order after the event that produced them.
    pub async fn handle(&self, event: MediaEvent) {
        let mut queue = std::collections::VecDeque::from([event]);
        while let Some(mut event) = queue.pop_front() {
            let applied = self.apply(&mut event).await;
            if applied.suppress {
                trace!(kind = ?event.kind(), "event suppressed");
            } else {
                if event.kind().is_tracked() {
                    self.lock_tracked()
                        .insert(event.kind(), Arc::new(event.clone()));
                }
                let _ = self.events_tx.send(event);
            }
            queue.extend(applied.follow_ups);
        }
    }

    /// Tear down everything bound to the departing provider so no stale
    /// handler or timer fires against a torn-down engine.
    pub async fn on_provider_detach(&self) {
        self.cancel_waiting();
        self.reset_tracking();
        self.flags.reset();
        self.pending.clear();
        self.lock_live().reset();
        self.store.soft_reset().await;
        debug!("provider detached: state torn down");
    }

    async fn apply(&self, event: &mut MediaEvent) -> Applied {
        let payload = event.payload.clone();
        match payload {
            EventPayload::CanLoad => {
                self.store.update(|s| s.can_load = true).await;
                self.satisfy(RequestKey::Load, event);
                Applied::pass()
            }

            EventPayload::SourceChange { source } => {
                let first = !self.first_source_seen.swap(true, Ordering::SeqCst);
                self.store.update(|s| s.source = Some(source)).await;
                if !first {
                    self.cancel_waiting();
                    self.reset_tracking();
                    self.flags.reset();
                    self.pending.clear();
                    self.lock_live().reset();
                    self.store.soft_reset().await;
                }
                Applied::pass()
            }

            EventPayload::MediaTypeChange { media_type } => {
                self.store.update(|s| s.media_type = media_type).await;
                Applied::pass()
            }

            EventPayload::StreamTypeChange { stream_type } => {
                self.store.update(|s| s.stream_type = stream_type).await;
                let mut live = self.lock_live();
                if stream_type.is_live() {
                    live.start();
                } else {
                    live.stop();
                }
                Applied::pass()
            }

            EventPayload::ProviderLoaderChange { loader } => {
                self.store.update(|s| s.loader = Some(loader)).await;
                Applied::pass()
            }

            EventPayload::ProviderChange { .. } => Applied::pass(),

            EventPayload::LoadedMetadata { duration } => {
                self.store.update(|s| s.duration = duration).await;
                Applied::pass()
            }

            EventPayload::DurationChange { duration } => {
                self.store
                    .update(|s| {
                        s.duration = duration;
                        if s.ended {
                            s.current_time = duration;
                        }
                    })
                    .await;
                Applied::pass()
            }

            EventPayload::CanPlay { duration } => {
                self.store
                    .update(|s| {
                        s.can_play = true;
                        s.duration = duration;
                    })
                    .await;
                // Chain back to loaded-metadata unless this can-play is a
                // near-duplicate the engine derived from it already
                if !event.triggered_by(EventKind::LoadedMetadata) {
                    self.attach_trigger(event, EventKind::LoadedMetadata);
                }
                Applied::pass()
            }

            EventPayload::Play => {
                if self.flags.is_looping() || !self.store.read(|s| s.paused).await {
                    return Applied::suppress();
                }

                self.satisfy(RequestKey::Play, event);
                let was_ended = self.store.read(|s| s.ended).await;
                let replay = self.flags.take_replay();
                self.store
                    .update(|s| {
                        s.paused = false;
                        s.autoplay_error = None;
                        s.ended = false;
                    })
                    .await;

                let mut applied = Applied::pass();
                if was_ended || replay {
                    applied.follow_ups.push(
                        MediaEvent::new(EventPayload::Replay)
                            .with_trigger(Arc::new(event.clone())),
                    );
                }
                applied
            }

            EventPayload::PlayFail { error } => {
                self.satisfy(RequestKey::Play, event);
                self.cancel_waiting();
                self.store
                    .update(|s| {
                        s.paused = true;
                        s.playing = false;
                        s.waiting = false;
                        if s.attempting_autoplay {
                            s.attempting_autoplay = false;
                            s.autoplay_error = Some(error.clone());
                        }
                    })
                    .await;
                // The playback session aborted; nothing pending can resolve
                self.reset_tracking();
                Applied::pass()
            }

            EventPayload::PauseFail { .. } => {
                self.satisfy(RequestKey::Pause, event);
                Applied::pass()
            }

            EventPayload::Playing => {
                self.cancel_waiting();
                self.store
                    .update(|s| {
                        s.paused = false;
                        s.playing = true;
                        s.waiting = false;
                        s.seeking = false;
                        s.ended = false;
                        s.attempting_autoplay = false;
                    })
                    .await;

                if self.flags.take_looping() {
                    self.flags.set_replay(false);
                    return Applied::suppress();
                }

                let mut applied = Applied::pass();
                if !self.store.read(|s| s.started).await {
                    self.store.update(|s| s.started = true).await;
                    applied.follow_ups.push(
                        MediaEvent::new(EventPayload::Started)
                            .with_trigger(Arc::new(event.clone())),
                    );
                }
                applied
            }

            EventPayload::Pause => {
                if self.flags.is_looping() {
                    return Applied::suppress();
                }

                self.satisfy(RequestKey::Pause, event);
                self.cancel_waiting();
                self.store
                    .update(|s| {
                        s.paused = true;
                        s.playing = false;
                        s.seeking = false;
                        s.waiting = false;
                    })
                    .await;
                self.reset_tracking();
                Applied::pass()
            }

            EventPayload::TimeUpdate { current_time } => {
                self.cancel_waiting();
                self.store
                    .update(|s| {
                        let previous = s.current_time;
                        s.current_time = current_time;
                        s.waiting = false;
                        if s.playing && current_time > previous {
                            s.played = s.played.add(previous, current_time);
                        }
                    })
                    .await;

                let mut applied = Applied::pass();
                self.sync_live_edge(current_time, &mut applied.follow_ups)
                    .await;
                applied
            }

            EventPayload::Progress { buffered, seekable } => {
                self.store
                    .update(|s| {
                        s.buffered = buffered;
                        s.seekable = seekable;
                    })
                    .await;

                let current_time = self.store.read(|s| s.current_time).await;
                let mut applied = Applied::pass();
                self.sync_live_edge(current_time, &mut applied.follow_ups)
                    .await;
                applied
            }

            EventPayload::Seeking { time } => {
                self.satisfy(RequestKey::Seeking, event);
                self.store
                    .update(|s| {
                        s.seeking = true;
                        s.current_time = time;
                    })
                    .await;
                Applied::pass()
            }

            EventPayload::Seeked { time } => {
                if self.flags.is_seeking_request() {
                    // Scrub still in progress; only the commit ends it
                    return Applied::suppress();
                }

                self.satisfy(RequestKey::Seeked, event);
                self.store
                    .update(|s| {
                        s.seeking = false;
                        s.waiting = false;
                        s.current_time = time;
                        // Landing exactly on the duration is a completed
                        // playthrough, not a cleared ended state
                        if (time - s.duration).abs() > f64::EPSILON {
                            s.ended = false;
                        }
                    })
                    .await;
                Applied::pass()
            }

            EventPayload::Waiting => {
                if self.flags.is_seeking_request() || self.pending.contains(RequestKey::Seeked) {
                    // Seeking legitimately looks like waiting
                    return Applied::suppress();
                }
                // The canonical waiting dispatch comes from the debounce
                // timer; raw engine bursts collapse into it
                self.schedule_waiting(event);
                Applied::suppress()
            }

            EventPayload::Ended => {
                if self.flags.is_looping() {
                    return Applied::suppress();
                }

                if self.store.read(|s| s.loop_enabled).await {
                    let _ = self
                        .requests_tx
                        .send(MediaRequest::new(RequestCommand::Loop));
                    return Applied::suppress();
                }

                self.cancel_waiting();
                self.store
                    .update(|s| {
                        s.ended = true;
                        s.paused = true;
                        s.playing = false;
                        s.seeking = false;
                        s.waiting = false;
                        if s.duration > 0.0 {
                            s.current_time = s.duration;
                        }
                    })
                    .await;
                self.reset_tracking();
                Applied::pass()
            }

            EventPayload::Replay => Applied::pass(),
            EventPayload::Started => Applied::pass(),

            EventPayload::VolumeChange { volume, muted } => {
                self.satisfy(RequestKey::Volume, event);
                self.store
                    .update(|s| {
                        s.volume = volume;
                        s.muted = muted;
                    })
                    .await;
                Applied::pass()
            }

            EventPayload::RateChange { rate } => {
                self.satisfy(RequestKey::Rate, event);
                self.store.update(|s| s.playback_rate = rate).await;
                Applied::pass()
            }

            EventPayload::FullscreenChange { active } => {
                self.satisfy(RequestKey::Fullscreen, event);
                self.store.update(|s| s.fullscreen = active).await;
                Applied::pass()
            }

            EventPayload::FullscreenError { .. } => {
                self.satisfy(RequestKey::Fullscreen, event);
                Applied::pass()
            }

            EventPayload::PictureInPictureChange { active } => {
                self.satisfy(RequestKey::PictureInPicture, event);
                self.store.update(|s| s.picture_in_picture = active).await;
                Applied::pass()
            }

            EventPayload::PictureInPictureError { .. } => {
                self.satisfy(RequestKey::PictureInPicture, event);
                Applied::pass()
            }

            EventPayload::QualitiesChange { qualities } => {
                self.store.update(|s| s.qualities = qualities).await;
                Applied::pass()
            }

            EventPayload::QualityChange { quality } => {
                self.satisfy(RequestKey::Quality, event);
                self.store.update(|s| s.quality = quality).await;
                Applied::pass()
            }

            EventPayload::AudioTracksChange { tracks } => {
                self.store.update(|s| s.audio_tracks = tracks).await;
                Applied::pass()
            }

            EventPayload::AudioTrackChange { track } => {
                self.satisfy(RequestKey::AudioTrack, event);
                self.store.update(|s| s.audio_track = track).await;
                Applied::pass()
            }

            EventPayload::AutoplayFail { error } => {
                self.store
                    .update(|s| {
                        s.attempting_autoplay = false;
                        s.autoplay_error = Some(error);
                    })
                    .await;
                Applied::pass()
            }

            EventPayload::LiveEdgeChange { at_edge } => {
                self.store.update(|s| s.live_edge = at_edge).await;
                Applied::pass()
            }

            EventPayload::UserIdleChange { idle } => {
                self.satisfy(RequestKey::UserIdle, event);
                self.store.update(|s| s.user_idle = idle).await;
                Applied::pass()
            }

            EventPayload::PosterChange { can_load } => {
                self.satisfy(RequestKey::Poster, event);
                self.store.update(|s| s.can_load_poster = can_load).await;
                Applied::pass()
            }

            EventPayload::Error { error, fatal } => {
                self.store.update(|s| s.error = Some(error)).await;
                if fatal {
                    self.cancel_waiting();
                    self.store
                        .update(|s| {
                            s.playing = false;
                            s.paused = true;
                            s.waiting = false;
                        })
                        .await;
                }
                Applied::pass()
            }
        }
    }

    /// Resolve the pending entry under `key`, attributing the request as
    /// the cause of this event.
    fn satisfy(&self, key: RequestKey, event: &mut MediaEvent) {
        if let Some(request) = self.pending.take(key) {
            trace!(?key, request_id = %request.id, "request satisfied");
            event.request = Some(request);
        }
    }

    fn attach_trigger(&self, event: &mut MediaEvent, kind: EventKind) {
        if event.trigger.is_some() {
            return;
        }
        if let Some(tracked) = self.lock_tracked().get(&kind) {
            event.trigger = Some(Arc::clone(tracked));
        }
    }

    fn reset_tracking(&self) {
        self.lock_tracked().clear();
    }

    /// Collapse a burst of engine waiting events into one canonical
    /// dispatch after the debounce window elapses.
    fn schedule_waiting(&self, event: &MediaEvent) {
        let mut timer = self.lock_waiting_timer();
        if timer.is_some() {
            return;
        }

        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let trigger = Arc::new(event.clone());
        let delay = Duration::from_millis(self.config.waiting_debounce_ms);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_waiting(trigger).await;
        }));
    }

    async fn fire_waiting(&self, trigger: Arc<MediaEvent>) {
        self.lock_waiting_timer().take();

        // Playback may have resumed or a seek begun while debouncing
        if self.flags.is_seeking_request() || self.pending.contains(RequestKey::Seeked) {
            return;
        }

        self.store
            .update(|s| {
                s.waiting = true;
                s.playing = false;
            })
            .await;
        let event = MediaEvent::new(EventPayload::Waiting).with_trigger(trigger);
        self.lock_tracked()
            .insert(EventKind::Waiting, Arc::new(event.clone()));
        let _ = self.events_tx.send(event);
    }

    fn cancel_waiting(&self) {
        if let Some(timer) = self.lock_waiting_timer().take() {
            timer.abort();
        }
    }

    async fn sync_live_edge(&self, current_time: f64, follow_ups: &mut Vec<MediaEvent>) {
        let (is_live, seekable, previous_edge) = self
            .store
            .read(|s| (s.is_live(), s.seekable.clone(), s.live_edge))
            .await;
        if !is_live {
            return;
        }

        let sample = self.lock_live().sync(current_time, &seekable);
        if let Some(sample) = sample {
            self.store
                .update(|s| {
                    s.duration = sample.duration;
                    s.live_sync_position = Some(sample.live_sync_position);
                    s.live_edge = sample.at_edge;
                })
                .await;
            if sample.at_edge != previous_edge {
                follow_ups.push(MediaEvent::new(EventPayload::LiveEdgeChange {
                    at_edge: sample.at_edge,
                }));
            }
        }
    }

    fn lock_tracked(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Arc<MediaEvent>>> {
        self.tracked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_waiting_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.waiting_timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_live(&self) -> std::sync::MutexGuard<'_, LiveEdgeTracker> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::store::MediaState;
    use crate::time_ranges::TimeRanges;
    use crate::types::{Source, StreamType};

    struct Fixture {
        state: Arc<StateManager>,
        store: MediaStore,
        pending: Arc<PendingRequests>,
        flags: Arc<PlaybackFlags>,
        events: broadcast::Receiver<MediaEvent>,
        requests_rx: mpsc::UnboundedReceiver<MediaRequest>,
    }

    fn fixture() -> Fixture {
        let store = MediaStore::new(MediaState::default());
        let pending = Arc::new(PendingRequests::default());
        let flags = Arc::new(PlaybackFlags::default());
        let (events_tx, events) = broadcast::channel(64);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let state = StateManager::create(
            PlayerConfig::default(),
            store.clone(),
            Arc::clone(&pending),
            Arc::clone(&flags),
            events_tx,
            requests_tx,
        );
        Fixture {
            state,
            store,
            pending,
            flags,
            events,
            requests_rx,
        }
    }

    fn drain(events: &mut broadcast::Receiver<MediaEvent>) -> Vec<MediaEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_can_play_chains_to_loaded_metadata() {
        let mut f = fixture();
        f.state
            .handle(MediaEvent::new(EventPayload::LoadedMetadata { duration: 30.0 }))
            .await;
        f.state
            .handle(MediaEvent::new(EventPayload::CanPlay { duration: 30.0 }))
            .await;

        let events = drain(&mut f.events);
        let can_play = events
            .iter()
            .find(|e| e.kind() == EventKind::CanPlay)
            .unwrap();
        assert!(can_play.triggered_by(EventKind::LoadedMetadata));
        assert!(f.store.get().await.can_play);
    }

    #[tokio::test]
    async fn test_play_emits_replay_after_ended() {
        let mut f = fixture();
        f.store
            .update(|s| {
                s.ended = true;
                s.paused = true;
            })
            .await;

        f.state.handle(MediaEvent::new(EventPayload::Play)).await;

        let events = drain(&mut f.events);
        let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::Play, EventKind::Replay]);
        assert!(!f.store.get().await.ended);
    }

    #[tokio::test]
    async fn test_play_suppressed_when_not_paused() {
        let mut f = fixture();
        f.store.update(|s| s.paused = false).await;

        f.state.handle(MediaEvent::new(EventPayload::Play)).await;
        assert!(drain(&mut f.events).is_empty());
    }

    #[tokio::test]
    async fn test_playing_emits_started_once() {
        let mut f = fixture();
        f.state.handle(MediaEvent::new(EventPayload::Playing)).await;
        f.state.handle(MediaEvent::new(EventPayload::Playing)).await;

        let events = drain(&mut f.events);
        let started = events
            .iter()
            .filter(|e| e.kind() == EventKind::Started)
            .count();
        assert_eq!(started, 1);
        assert!(f.store.get().await.started);
    }

    #[tokio::test]
    async fn test_pause_suppressed_while_looping() {
        let mut f = fixture();
        f.store.update(|s| s.paused = false).await;
        f.flags.set_looping(true);

        f.state.handle(MediaEvent::new(EventPayload::Pause)).await;
        assert!(drain(&mut f.events).is_empty());
        assert!(!f.store.get().await.paused);
    }

    #[tokio::test]
    async fn test_ended_suppressed_while_looping() {
        let mut f = fixture();
        f.store
            .update(|s| {
                s.playing = true;
                s.paused = false;
            })
            .await;
        f.flags.set_looping(true);

        f.state.handle(MediaEvent::new(EventPayload::Ended)).await;

        let state = f.store.get().await;
        assert!(!state.ended);
        assert!(state.playing);
        assert!(drain(&mut f.events).is_empty());
    }

    #[tokio::test]
    async fn test_ended_with_loop_enabled_requests_restart() {
        let mut f = fixture();
        f.store.update(|s| s.loop_enabled = true).await;

        f.state.handle(MediaEvent::new(EventPayload::Ended)).await;

        let request = f.requests_rx.try_recv().unwrap();
        assert_eq!(request.command, RequestCommand::Loop);
        assert!(!f.store.get().await.ended);
    }

    #[tokio::test]
    async fn test_seeked_suppressed_during_scrub() {
        let mut f = fixture();
        f.flags.set_seeking_request(true);
        f.store.update(|s| s.seeking = true).await;

        f.state
            .handle(MediaEvent::new(EventPayload::Seeked { time: 5.0 }))
            .await;

        assert!(f.store.get().await.seeking);
        assert!(drain(&mut f.events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_burst_collapses_to_one_dispatch() {
        let mut f = fixture();

        for _ in 0..3 {
            f.state.handle(MediaEvent::new(EventPayload::Waiting)).await;
        }
        assert!(drain(&mut f.events).is_empty());

        tokio::time::sleep(Duration::from_millis(350)).await;

        let events = drain(&mut f.events);
        let waiting = events
            .iter()
            .filter(|e| e.kind() == EventKind::Waiting)
            .count();
        assert_eq!(waiting, 1);
        assert!(f.store.get().await.waiting);
        // The dispatch must join the tracked set for later trigger chains
        assert!(f.state.lock_tracked().contains_key(&EventKind::Waiting));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_cancelled_by_time_update() {
        let mut f = fixture();
        f.state.handle(MediaEvent::new(EventPayload::Waiting)).await;
        f.state
            .handle(MediaEvent::new(EventPayload::TimeUpdate { current_time: 2.0 }))
            .await;

        tokio::time::sleep(Duration::from_millis(350)).await;

        let events = drain(&mut f.events);
        assert!(events.iter().all(|e| e.kind() != EventKind::Waiting));
        assert!(!f.store.get().await.waiting);
    }

    #[tokio::test]
    async fn test_waiting_suppressed_during_pending_seek() {
        let mut f = fixture();
        f.pending.record(
            RequestKey::Seeked,
            MediaRequest::new(RequestCommand::Seek { time: 3.0 }),
        );

        f.state.handle(MediaEvent::new(EventPayload::Waiting)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(drain(&mut f.events).is_empty());
    }

    #[tokio::test]
    async fn test_non_initial_source_change_soft_resets() {
        let mut f = fixture();
        f.state
            .handle(MediaEvent::new(EventPayload::SourceChange {
                source: Source::new("https://example.com/a.mp4"),
            }))
            .await;
        f.store
            .update(|s| {
                s.current_time = 20.0;
                s.volume = 0.3;
                s.error = Some(MediaError::aborted("boom"));
                s.buffered = TimeRanges::from_ranges([(0.0, 10.0)]);
            })
            .await;

        f.state
            .handle(MediaEvent::new(EventPayload::SourceChange {
                source: Source::new("https://example.com/b.mp4"),
            }))
            .await;

        let state = f.store.get().await;
        assert_eq!(state.current_time, 0.0);
        assert!(state.buffered.is_empty());
        assert!(state.error.is_none());
        assert_eq!(state.volume, 0.3);
        assert_eq!(
            state.source.as_ref().map(|s| s.src.as_str()),
            Some("https://example.com/b.mp4")
        );
        drain(&mut f.events);
    }

    #[tokio::test]
    async fn test_volume_change_satisfies_pending_request() {
        let mut f = fixture();
        let request = MediaRequest::new(RequestCommand::SetVolume { volume: 0.8 });
        f.pending.record(RequestKey::Volume, request.clone());

        f.state
            .handle(MediaEvent::new(EventPayload::VolumeChange {
                volume: 0.8,
                muted: false,
            }))
            .await;

        let events = drain(&mut f.events);
        assert_eq!(events[0].request.as_ref().unwrap().id, request.id);
        assert_eq!(f.pending.len(), 0);
    }

    #[tokio::test]
    async fn test_live_edge_derivation() {
        let mut f = fixture();
        f.state
            .handle(MediaEvent::new(EventPayload::StreamTypeChange {
                stream_type: StreamType::Live,
            }))
            .await;
        f.state
            .handle(MediaEvent::new(EventPayload::Progress {
                buffered: TimeRanges::empty(),
                seekable: TimeRanges::from_ranges([(0.0, 90.0)]),
            }))
            .await;
        f.state
            .handle(MediaEvent::new(EventPayload::TimeUpdate { current_time: 85.0 }))
            .await;

        let state = f.store.get().await;
        assert!(state.live_edge);
        assert_eq!(state.live_sync_position, Some(90.0));
        assert_eq!(state.duration, 90.0);

        let events = drain(&mut f.events);
        assert!(events
            .iter()
            .any(|e| e.kind() == EventKind::LiveEdgeChange));
    }

    #[tokio::test]
    async fn test_detach_clears_pending_and_tracking() {
        let f = fixture();
        f.pending
            .record(RequestKey::Play, MediaRequest::new(RequestCommand::Play));
        f.flags.set_looping(true);

        f.state.on_provider_detach().await;

        assert_eq!(f.pending.len(), 0);
        assert!(!f.flags.is_looping());
        assert!(f.store.get().await.paused);
    }
}
