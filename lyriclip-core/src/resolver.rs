//! Resolves a [`LyricsStrategy`] into a timed lyric sequence.

use crate::error::CoreError;
use crate::lrc::TimedLyrics;
use crate::provider::LyricsSource;
use crate::request::LyricsStrategy;
use tracing::{debug, info};

/// Turns any lyrics strategy into a single [`TimedLyrics`] sequence.
pub struct LyricsResolver<'a> {
    source: &'a dyn LyricsSource,
}

impl<'a> LyricsResolver<'a> {
    pub fn new(source: &'a dyn LyricsSource) -> Self {
        Self { source }
    }

    /// Resolve lyrics for a strategy.
    ///
    /// Returns `Ok(None)` when no usable synced transcript exists: the lookup
    /// found nothing, no search result carried synced lyrics, or the document
    /// contained no timed lines.
    ///
    /// # Errors
    ///
    /// Returns an error only if the lyrics source itself fails.
    pub async fn resolve(&self, strategy: &LyricsStrategy) -> Result<Option<TimedLyrics>, CoreError> {
        let lyrics = match strategy {
            LyricsStrategy::Document(document) => {
                info!("Using pasted LRC document");
                Some(TimedLyrics::parse(document))
            }
            LyricsStrategy::Lookup(id) => {
                info!("Fetching lyrics from {} by ID: {}", self.source.name(), id);
                self.source
                    .get(*id)
                    .await?
                    .and_then(|record| record.timed_lyrics())
            }
            LyricsStrategy::Search { title, artist } => {
                let query = format!("{title} {artist}");
                info!("Searching {} for lyrics: {}", self.source.name(), query);
                let results = self.source.search(&query).await?;
                debug!("Search returned {} results", results.len());

                // First synced result in source order; no relevance ranking
                results.into_iter().find(|r| r.has_synced()).and_then(|record| {
                    info!(
                        "Found lyrics for: {} - {} (id: {})",
                        record.artist_name, record.track_name, record.id
                    );
                    record.timed_lyrics()
                })
            }
        };

        Ok(lyrics.filter(|lyrics| !lyrics.is_empty()))
    }
}
