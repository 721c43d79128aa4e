//! Overture Core - Media Player Orchestration Library
//!
//! This crate provides the state and request orchestration layer of a media
//! player:
//! - Canonical event normalization over heterogeneous playback engines
//! - Request queueing with per-category replay and causality correlation
//! - A single observable state store driven only by canonical events
//! - Source selection and provider hot-swapping
//! - Live-edge tracking, waiting debounce, and loop/replay semantics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Overture Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Remote    │  │   Request    │  │    State     │          │
//! │  │   Control    │─▶│   Manager    │  │   Manager    │          │
//! │  └──────────────┘  └──────┬───────┘  └──────┬───────┘          │
//! │                           │                 │                   │
//! │                    ┌──────┴──────┐   ┌──────┴──────┐           │
//! │                    │   Player    │   │    Media    │           │
//! │                    │ Controller  │   │    Store    │           │
//! │                    └──────┬──────┘   └─────────────┘           │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │    Source    │  │   Provider  │  │  Live-Edge   │           │
//! │  │   Selector   │  │   Adapters  │  │   Tracker    │           │
//! │  └──────────────┘  └─────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod controller;
pub mod error;
pub mod events;
pub mod live;
pub mod provider;
pub mod queue;
pub mod remote;
pub mod selector;
pub mod state;
pub mod store;
pub mod time_ranges;
pub mod types;

mod request;

pub use controller::{PlayerBuilder, PlayerController};
pub use error::{Error, MediaError, Result};
pub use events::{EventKind, EventPayload, MediaEvent, MediaRequest, RequestCommand, RequestKey};
pub use live::{LiveEdgeSample, LiveEdgeTracker};
pub use provider::{
    FullscreenAdapter, MediaProvider, PictureInPictureAdapter, ProviderKind,
    ScreenOrientationAdapter,
};
pub use queue::RequestQueue;
pub use remote::RemoteControl;
pub use selector::{Selection, SourceLoader, SourceSelector};
pub use state::StateManager;
pub use store::{MediaState, MediaStore};
pub use time_ranges::{TimeRange, TimeRanges};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Overture Core initialized");
}
