use crate::error::CoreError;
use crate::lrc::TimedLyrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A lyrics record as returned by a lyrics source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricRecord {
    /// Source-specific record ID
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    /// Track duration in seconds
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    /// LRC document with line timings
    pub synced_lyrics: Option<String>,
}

impl LyricRecord {
    /// The synced transcript, if the record carries a non-blank one.
    #[must_use]
    pub fn synced(&self) -> Option<&str> {
        self.synced_lyrics
            .as_deref()
            .filter(|lyrics| !lyrics.trim().is_empty())
    }

    /// Check if the record carries a usable synced transcript
    #[must_use]
    pub fn has_synced(&self) -> bool {
        self.synced().is_some()
    }

    /// Parse the synced transcript, if any
    #[must_use]
    pub fn timed_lyrics(&self) -> Option<TimedLyrics> {
        self.synced().map(TimedLyrics::parse)
    }
}

/// Trait for lyrics sources (search and lookup by ID)
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Free-text search. Results keep the order the source returned them in.
    async fn search(&self, query: &str) -> Result<Vec<LyricRecord>, CoreError>;

    /// Fetch a single record by its source ID, `None` if it does not exist.
    async fn get(&self, id: i64) -> Result<Option<LyricRecord>, CoreError>;
}
