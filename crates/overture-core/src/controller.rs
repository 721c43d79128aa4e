//! Player controller
//!
//! Composition root wiring the store, state manager, request manager,
//! source selector, and remote control together. Owns the request inbox
//! task and the provider slot; providers are swapped through
//! [`PlayerController::set_sources`] without recreating the player.

use crate::{
    error::{Error, Result},
    events::{EventPayload, MediaEvent, MediaRequest, RequestCommand},
    provider::{FullscreenAdapter, MediaProvider, ScreenOrientationAdapter},
    remote::RemoteControl,
    request::{PendingRequests, PlaybackFlags, ProviderSlot, RequestManager},
    selector::{SourceLoader, SourceSelector},
    state::StateManager,
    store::{MediaState, MediaStore},
    types::{FullscreenTarget, PlayerConfig, Source},
};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Builder for [`PlayerController`]
#[derive(Default)]
pub struct PlayerBuilder {
    config: PlayerConfig,
    loaders: Vec<Arc<dyn SourceLoader>>,
    fullscreen: Option<Arc<dyn FullscreenAdapter>>,
    orientation: Option<Arc<dyn ScreenOrientationAdapter>>,
}

impl PlayerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a source loader. Registration order matters for selection
    /// only through candidate order, not loader order.
    pub fn loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Player-level fullscreen capability (e.g. the document shell).
    pub fn fullscreen_adapter(mut self, adapter: Arc<dyn FullscreenAdapter>) -> Self {
        self.fullscreen = Some(adapter);
        self
    }

    pub fn orientation_adapter(mut self, adapter: Arc<dyn ScreenOrientationAdapter>) -> Self {
        self.orientation = Some(adapter);
        self
    }

    pub fn build(self) -> PlayerController {
        PlayerController::new(self.config, self.loaders, self.fullscreen, self.orientation)
    }
}

/// Orchestrates playback over hot-swappable provider engines
pub struct PlayerController {
    config: PlayerConfig,
    store: MediaStore,
    state: Arc<StateManager>,
    requests: Arc<RequestManager>,
    selector: SourceSelector,
    provider: ProviderSlot,
    remote: RemoteControl,
    requests_tx: mpsc::UnboundedSender<MediaRequest>,
    inbox_task: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerController {
    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::new()
    }

    fn new(
        config: PlayerConfig,
        loaders: Vec<Arc<dyn SourceLoader>>,
        fullscreen: Option<Arc<dyn FullscreenAdapter>>,
        orientation: Option<Arc<dyn ScreenOrientationAdapter>>,
    ) -> Self {
        let store = MediaStore::new(MediaState::from_config(&config));
        let pending = Arc::new(PendingRequests::default());
        let flags = Arc::new(PlaybackFlags::default());
        let (events_tx, _) = broadcast::channel(256);
        let (requests_tx, mut requests_rx) = mpsc::unbounded_channel::<MediaRequest>();
        let provider: ProviderSlot = Arc::new(RwLock::new(None));

        let state = StateManager::create(
            config.clone(),
            store.clone(),
            Arc::clone(&pending),
            Arc::clone(&flags),
            events_tx,
            requests_tx.clone(),
        );

        let requests = Arc::new(RequestManager::new(
            config.clone(),
            store.clone(),
            pending,
            flags,
            Arc::clone(&provider),
            Arc::clone(&state),
            fullscreen,
            orientation,
        ));

        let inbox = Arc::clone(&requests);
        let inbox_task = tokio::spawn(async move {
            while let Some(request) = requests_rx.recv().await {
                let request_id = request.id;
                if let Err(err) = inbox.handle(request).await {
                    debug!(%request_id, error = %err, code = err.error_code(), "request rejected");
                }
            }
        });

        let remote = RemoteControl::new();
        remote.attach(requests_tx.clone());

        Self {
            config,
            store,
            state,
            requests,
            selector: SourceSelector::new(loaders),
            provider,
            remote,
            requests_tx,
            inbox_task: Mutex::new(Some(inbox_task)),
        }
    }

    /// Replace the candidate source list, selecting a loader and swapping
    /// the provider when the resolved source actually changed.
    #[instrument(skip(self, sources), fields(candidates = sources.len()))]
    pub async fn set_sources(&self, sources: Vec<Source>) -> Result<()> {
        let selection = self
            .selector
            .select(&sources)
            .ok_or(Error::NoPlayableSource)?;

        let unchanged = self
            .store
            .read(|s| {
                s.source.as_ref() == Some(&selection.source)
                    && s.loader.as_deref() == Some(selection.loader.name())
            })
            .await;
        self.store.update(|s| s.sources = sources).await;
        if unchanged {
            debug!("source unchanged, provider kept");
            return Ok(());
        }

        SourceSelector::preconnect(&selection.source);
        self.detach_provider().await;

        self.state
            .handle(MediaEvent::new(EventPayload::SourceChange {
                source: selection.source.clone(),
            }))
            .await;
        self.state
            .handle(MediaEvent::new(EventPayload::MediaTypeChange {
                media_type: selection.media_type,
            }))
            .await;
        self.state
            .handle(MediaEvent::new(EventPayload::ProviderLoaderChange {
                loader: selection.loader.name().to_string(),
            }))
            .await;

        let provider = selection.loader.load(&selection.source).await?;
        let kind = provider.kind();
        self.attach_provider(provider).await;
        self.state
            .handle(MediaEvent::new(EventPayload::ProviderChange {
                kind: Some(kind),
            }))
            .await;

        info!(source = %selection.source, loader = selection.loader.name(), %kind, "provider attached");
        Ok(())
    }

    /// Install a provider into the slot. Normally reached through
    /// [`set_sources`](Self::set_sources); exposed for programmatic engines.
    pub async fn attach_provider(&self, provider: Arc<dyn MediaProvider>) {
        *self.provider.write().await = Some(provider);
    }

    /// Remove and tear down the active provider, if any.
    pub async fn detach_provider(&self) {
        let detached = self.provider.write().await.take();
        if detached.is_some() {
            self.state.on_provider_detach().await;
            self.state
                .handle(MediaEvent::new(EventPayload::ProviderChange { kind: None }))
                .await;
        }
    }

    /// Feed a canonical engine event into the state machine.
    ///
    /// Providers call this (directly or through a channel) for everything
    /// they observe. After the media becomes playable, a configured
    /// autoplay attempt is made here.
    pub async fn handle_provider_event(&self, event: MediaEvent) {
        let try_autoplay = matches!(event.payload, EventPayload::CanPlay { .. })
            && self
                .store
                .read(|s| s.autoplay && s.paused && !s.started && s.autoplay_error.is_none())
                .await;

        self.state.handle(event).await;

        if try_autoplay {
            self.attempt_autoplay().await;
        }
    }

    async fn attempt_autoplay(&self) {
        self.store.update(|s| s.attempting_autoplay = true).await;
        let request = MediaRequest::new(RequestCommand::Play);
        if let Err(err) = self.requests.play(request).await {
            let error = err.to_media_error();
            warn!(error = %error, "autoplay attempt rejected");
            self.state
                .handle(MediaEvent::new(EventPayload::AutoplayFail { error }))
                .await;
        }
    }

    /// Start playback. Unlike the fire-and-forget remote, this surfaces
    /// engine rejections to the caller.
    pub async fn play(&self) -> Result<()> {
        self.requests.play(MediaRequest::new(RequestCommand::Play)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.requests
            .pause(MediaRequest::new(RequestCommand::Pause))
            .await
    }

    pub async fn seek(&self, time: f64) -> Result<()> {
        self.requests
            .seek(MediaRequest::new(RequestCommand::Seek { time }), time)
            .await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        self.requests
            .set_volume(
                MediaRequest::new(RequestCommand::SetVolume { volume }),
                volume,
            )
            .await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        let command = if muted {
            RequestCommand::Mute
        } else {
            RequestCommand::Unmute
        };
        self.requests
            .set_muted(MediaRequest::new(command), muted)
            .await
    }

    pub async fn enter_fullscreen(&self, target: FullscreenTarget) -> Result<()> {
        self.requests
            .enter_fullscreen(
                MediaRequest::new(RequestCommand::EnterFullscreen { target }),
                target,
            )
            .await
    }

    pub async fn exit_fullscreen(&self, target: FullscreenTarget) -> Result<()> {
        self.requests
            .exit_fullscreen(
                MediaRequest::new(RequestCommand::ExitFullscreen { target }),
                target,
            )
            .await
    }

    pub async fn start_loading(&self) -> Result<()> {
        self.requests
            .start_loading(MediaRequest::new(RequestCommand::StartLoading))
            .await
    }

    /// Snapshot of the current playback state
    pub async fn state(&self) -> MediaState {
        self.store.get().await
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Subscribe to state snapshots published after each transition
    pub fn subscribe_state(&self) -> watch::Receiver<MediaState> {
        self.store.subscribe()
    }

    /// Subscribe to the canonical event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<MediaEvent> {
        self.state.subscribe()
    }

    /// A cloneable request handle for UI layers
    pub fn remote(&self) -> RemoteControl {
        self.remote.clone()
    }

    /// Sender half of the request inbox, for embedding layers that route
    /// requests themselves
    pub fn request_sender(&self) -> mpsc::UnboundedSender<MediaRequest> {
        self.requests_tx.clone()
    }

    /// Tear the player down: detach the provider, stop the inbox task, and
    /// drop buffered remote requests.
    pub async fn destroy(&self) {
        self.remote.reset();
        self.detach_provider().await;
        if let Some(task) = self
            .inbox_task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            task.abort();
        }
        info!("player destroyed");
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        if let Some(task) = self
            .inbox_task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            task.abort();
        }
    }
}
