//! Remote control surface
//!
//! A cloneable handle UI layers use to issue playback requests without
//! holding the controller. Requests issued before a provider is attached
//! are buffered per category (newest wins) and replayed in order once the
//! player becomes ready.

use crate::{
    events::{MediaRequest, RequestCommand, RequestKey},
    queue::RequestQueue,
    types::FullscreenTarget,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::trace;

/// Issues playback requests, buffering them until the player is ready
#[derive(Clone)]
pub struct RemoteControl {
    queue: Arc<RequestQueue<RequestKey>>,
    target: Arc<Mutex<Option<mpsc::UnboundedSender<MediaRequest>>>>,
}

impl RemoteControl {
    pub(crate) fn new() -> Self {
        Self {
            queue: Arc::new(RequestQueue::new()),
            target: Arc::new(Mutex::new(None)),
        }
    }

    /// Bind the remote to a live request inbox and flush buffered requests.
    pub(crate) fn attach(&self, sender: mpsc::UnboundedSender<MediaRequest>) {
        *self.lock_target() = Some(sender);
        self.queue.start();
    }

    /// Discard buffered requests and release waiters.
    pub(crate) fn reset(&self) {
        *self.lock_target() = None;
        self.queue.reset();
    }

    /// Resolves once buffered requests have been flushed to the player.
    pub fn wait_for_ready(&self) -> impl std::future::Future<Output = ()> {
        self.queue.wait_for_flush()
    }

    pub fn play(&self) {
        self.dispatch(RequestCommand::Play);
    }

    pub fn pause(&self) {
        self.dispatch(RequestCommand::Pause);
    }

    /// Commit a seek to `time` seconds.
    pub fn seek(&self, time: f64) {
        self.dispatch(RequestCommand::Seek { time });
    }

    /// Report a scrub-in-progress position. Callers throttle this.
    pub fn seeking(&self, time: f64) {
        self.dispatch(RequestCommand::Seeking { time });
    }

    pub fn set_volume(&self, volume: f64) {
        self.dispatch(RequestCommand::SetVolume { volume });
    }

    pub fn mute(&self) {
        self.dispatch(RequestCommand::Mute);
    }

    pub fn unmute(&self) {
        self.dispatch(RequestCommand::Unmute);
    }

    pub fn enter_fullscreen(&self, target: FullscreenTarget) {
        self.dispatch(RequestCommand::EnterFullscreen { target });
    }

    pub fn exit_fullscreen(&self, target: FullscreenTarget) {
        self.dispatch(RequestCommand::ExitFullscreen { target });
    }

    pub fn enter_picture_in_picture(&self) {
        self.dispatch(RequestCommand::EnterPictureInPicture);
    }

    pub fn exit_picture_in_picture(&self) {
        self.dispatch(RequestCommand::ExitPictureInPicture);
    }

    pub fn set_rate(&self, rate: f64) {
        self.dispatch(RequestCommand::SetRate { rate });
    }

    /// Select a rendition by index, or `None` for automatic selection.
    pub fn select_quality(&self, quality: Option<usize>) {
        self.dispatch(RequestCommand::SelectQuality { quality });
    }

    pub fn select_audio_track(&self, track: usize) {
        self.dispatch(RequestCommand::SelectAudioTrack { track });
    }

    pub fn start_loading(&self) {
        self.dispatch(RequestCommand::StartLoading);
    }

    pub fn resume_user_idle(&self) {
        self.dispatch(RequestCommand::ResumeUserIdle);
    }

    pub fn pause_user_idle(&self) {
        self.dispatch(RequestCommand::PauseUserIdle);
    }

    pub fn show_poster(&self) {
        self.dispatch(RequestCommand::ShowPoster);
    }

    pub fn hide_poster(&self) {
        self.dispatch(RequestCommand::HidePoster);
    }

    fn dispatch(&self, command: RequestCommand) {
        let request = MediaRequest::new(command);
        let key = request.key();
        let target = Arc::clone(&self.target);
        self.queue.enqueue(key, move || {
            let sender = target.lock().unwrap_or_else(|p| p.into_inner());
            match sender.as_ref() {
                Some(sender) => {
                    let _ = sender.send(request);
                }
                None => trace!(?key, "request dropped: no player attached"),
            }
        });
    }

    fn lock_target(
        &self,
    ) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<MediaRequest>>> {
        self.target.lock().unwrap_or_else(|p| p.into_inner())
    }
}
