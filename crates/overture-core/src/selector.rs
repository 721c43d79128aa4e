//! Source selection
//!
//! Resolves which loader/provider pair should play the current source list.
//! Precedence is last-wins: a later candidate that any loader can play
//! overrides earlier matches, so callers can append a more specific entry
//! to override a generic one. This is intentional, not incidental.

use crate::{
    error::Result,
    provider::MediaProvider,
    types::{MediaType, Source},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Capability probe and factory for one family of playback engine
#[async_trait]
pub trait SourceLoader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this loader can play the given source
    fn can_play(&self, source: &Source) -> bool;

    /// Media category the loader resolves this source to
    fn media_type(&self, source: &Source) -> MediaType;

    /// Instantiate a provider for the source. May suspend (e.g. a lazy
    /// engine import).
    async fn load(&self, source: &Source) -> Result<Arc<dyn MediaProvider>>;
}

/// The resolved `(source, loader)` pair
#[derive(Clone)]
pub struct Selection {
    pub source: Source,
    pub loader: Arc<dyn SourceLoader>,
    pub media_type: MediaType,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("source", &self.source)
            .field("loader", &self.loader.name())
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// Chooses a playable `(source, loader)` pair from prioritized candidates
pub struct SourceSelector {
    loaders: Vec<Arc<dyn SourceLoader>>,
}

impl SourceSelector {
    pub fn new(loaders: Vec<Arc<dyn SourceLoader>>) -> Self {
        Self { loaders }
    }

    /// Pick the last candidate some loader reports it can play.
    pub fn select(&self, sources: &[Source]) -> Option<Selection> {
        let mut selected = None;

        for source in sources {
            for loader in &self.loaders {
                if loader.can_play(source) {
                    selected = Some(Selection {
                        source: source.clone(),
                        loader: Arc::clone(loader),
                        media_type: loader.media_type(source),
                    });
                    break;
                }
            }
        }

        if let Some(selection) = &selected {
            debug!(
                source = %selection.source,
                loader = selection.loader.name(),
                media_type = %selection.media_type,
                "source selected"
            );
        }

        selected
    }

    /// Emit a connection warm-up hint for the source origin. Best effort:
    /// malformed or non-URL sources are skipped silently.
    pub fn preconnect(source: &Source) {
        match Url::parse(&source.src) {
            Ok(url) => {
                if let Some(host) = url.host_str() {
                    debug!(scheme = url.scheme(), host, "preconnect hint");
                }
            }
            Err(_) => debug!(src = %source.src, "skipping preconnect for non-URL source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct ExtensionLoader {
        name: &'static str,
        extension: &'static str,
    }

    #[async_trait]
    impl SourceLoader for ExtensionLoader {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_play(&self, source: &Source) -> bool {
            source.extension().as_deref() == Some(self.extension)
        }

        fn media_type(&self, _source: &Source) -> MediaType {
            MediaType::Video
        }

        async fn load(&self, _source: &Source) -> Result<Arc<dyn MediaProvider>> {
            Err(Error::NoProvider)
        }
    }

    fn loaders() -> Vec<Arc<dyn SourceLoader>> {
        vec![
            Arc::new(ExtensionLoader {
                name: "video",
                extension: "mp4",
            }),
            Arc::new(ExtensionLoader {
                name: "hls",
                extension: "m3u8",
            }),
        ]
    }

    #[test]
    fn test_later_candidate_overrides_earlier_match() {
        let selector = SourceSelector::new(loaders());
        let sources = vec![
            Source::new("https://cdn.example.com/video.mp4"),
            Source::new("https://cdn.example.com/stream.m3u8"),
        ];

        let selection = selector.select(&sources).unwrap();
        assert_eq!(selection.loader.name(), "hls");
        assert_eq!(selection.source.src, "https://cdn.example.com/stream.m3u8");
    }

    #[test]
    fn test_unplayable_candidates_are_skipped() {
        let selector = SourceSelector::new(loaders());
        let sources = vec![
            Source::new("https://cdn.example.com/video.mp4"),
            Source::new("https://cdn.example.com/notes.txt"),
        ];

        let selection = selector.select(&sources).unwrap();
        assert_eq!(selection.loader.name(), "video");
    }

    #[test]
    fn test_no_match_yields_none() {
        let selector = SourceSelector::new(loaders());
        let sources = vec![Source::new("https://cdn.example.com/notes.txt")];
        assert!(selector.select(&sources).is_none());
    }

    #[test]
    fn test_preconnect_tolerates_malformed_urls() {
        SourceSelector::preconnect(&Source::new("::not a url::"));
        SourceSelector::preconnect(&Source::new("https://cdn.example.com/a.mp4"));
    }
}
