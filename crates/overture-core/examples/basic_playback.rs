//! Basic playback orchestration example
//!
//! Drives the player controller with an in-memory provider that echoes
//! requests back as engine events, the way a real engine bridge would.
//!
//! Run with: cargo run -p overture-core --example basic_playback

use async_trait::async_trait;
use overture_core::{
    EventPayload, MediaEvent, MediaProvider, MediaType, PlayerController, ProviderKind, Result,
    Source, SourceLoader, TimeRanges,
};
use std::sync::Arc;

/// A provider that accepts every command; the example script feeds the
/// matching engine events by hand.
struct EchoProvider;

#[async_trait]
impl MediaProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    async fn paused(&self) -> bool {
        true
    }

    async fn muted(&self) -> bool {
        false
    }

    async fn volume(&self) -> f64 {
        1.0
    }

    async fn current_time(&self) -> f64 {
        0.0
    }

    async fn play(&self) -> Result<()> {
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        Ok(())
    }

    async fn set_current_time(&self, _time: f64) -> Result<()> {
        Ok(())
    }

    async fn set_volume(&self, _volume: f64) -> Result<()> {
        Ok(())
    }

    async fn set_muted(&self, _muted: bool) -> Result<()> {
        Ok(())
    }

    async fn set_playback_rate(&self, _rate: f64) -> Result<()> {
        Ok(())
    }
}

struct EchoLoader;

#[async_trait]
impl SourceLoader for EchoLoader {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn can_play(&self, source: &Source) -> bool {
        source.extension().as_deref() == Some("mp4")
    }

    fn media_type(&self, _source: &Source) -> MediaType {
        MediaType::Video
    }

    async fn load(&self, _source: &Source) -> Result<Arc<dyn MediaProvider>> {
        Ok(Arc::new(EchoProvider))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overture_core=debug".into()),
        )
        .init();

    overture_core::init();

    println!("Overture Core - Basic Playback Example");
    println!("======================================\n");

    let player = PlayerController::builder()
        .loader(Arc::new(EchoLoader))
        .build();
    let mut events = player.subscribe_events();

    player
        .set_sources(vec![Source::new("https://cdn.example.com/movie.mp4")])
        .await?;

    // The engine reports readiness
    player
        .handle_provider_event(MediaEvent::new(EventPayload::LoadedMetadata { duration: 60.0 }))
        .await;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::Progress {
            buffered: TimeRanges::from_ranges([(0.0, 60.0)]),
            seekable: TimeRanges::from_ranges([(0.0, 60.0)]),
        }))
        .await;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::CanPlay { duration: 60.0 }))
        .await;

    player.play().await?;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::Play))
        .await;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::Playing))
        .await;

    player.seek(30.0).await?;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::Seeked { time: 30.0 }))
        .await;

    player.pause().await?;
    player
        .handle_provider_event(MediaEvent::new(EventPayload::Pause))
        .await;

    println!("Canonical event stream:");
    println!("-----------------------");
    while let Ok(event) = events.try_recv() {
        let cause = match &event.request {
            Some(request) => format!("request {}", request.id),
            None => match &event.trigger {
                Some(trigger) => format!("triggered by {:?}", trigger.kind()),
                None => "engine".to_string(),
            },
        };
        println!("  {:<22} <- {}", format!("{:?}", event.kind()), cause);
    }

    let state = player.state().await;
    println!("\nFinal state:");
    println!("------------");
    println!("  paused:       {}", state.paused);
    println!("  started:      {}", state.started);
    println!("  current_time: {}", state.current_time);
    println!("  duration:     {}", state.duration);

    player.destroy().await;
    Ok(())
}
