//! Generation requests and the validated plans built from them.

use crate::clock::parse_clock_time;
use crate::error::ValidationError;
use crate::window::Window;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A generation request as received from a client.
///
/// Which of the optional source fields are set decides how lyrics and audio
/// are obtained; [`GenerationRequest::into_plan`] settles that once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub song: String,
    pub artist: String,
    pub start_time: String,
    pub end_time: String,
    /// Video locator for audio acquisition (e.g. a `YouTube` video ID)
    #[serde(default)]
    pub video_id: Option<String>,
    /// Lyrics source record ID
    #[serde(default)]
    pub lyrics_id: Option<i64>,
    /// Pasted LRC document
    #[serde(default)]
    pub manual_lrc: Option<String>,
    #[serde(default, rename = "fontsize")]
    pub font_size: Option<u32>,
    #[serde(default, rename = "bgcolor")]
    pub background_color: Option<String>,
    #[serde(default, rename = "lofi")]
    pub intensity: Option<u32>,
}

/// How to obtain the lyric transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsStrategy {
    /// Parse a document supplied with the request
    Document(String),
    /// Look up a single record by source ID
    Lookup(i64),
    /// Search by title and artist, first synced result wins
    Search { title: String, artist: String },
}

impl LyricsStrategy {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Document(_) => "document",
            Self::Lookup(_) => "lookup",
            Self::Search { .. } => "search",
        }
    }
}

/// How to obtain the audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStrategy {
    /// Download from a caller-supplied locator
    Locator(String),
    /// Search for the track and download the first hit
    Search(String),
}

/// Options passed through to the video renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Maximum font size in pixels
    pub font_size: u32,
    /// Background color as `#RRGGBB` or `#RRGGBBAA`
    pub background_color: String,
    /// Lo-fi pixelation factor, 1 = crisp
    pub intensity: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_size: 400,
            background_color: "#FFFFFF".to_string(),
            intensity: 1,
        }
    }
}

/// A validated request, ready for the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    pub song: String,
    pub artist: String,
    pub window: Window,
    pub lyrics: LyricsStrategy,
    pub audio: AudioStrategy,
    pub render: RenderOptions,
}

impl GenerationRequest {
    /// Validate the request and resolve its source strategies.
    ///
    /// Lyrics priority: pasted document, then lookup by ID, then search.
    /// Audio priority: video locator, then search. Blank optional strings
    /// count as absent, as does a zero lyrics ID. Missing render options come from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed clock times, an inverted
    /// window, a malformed color, or a zero font size or intensity.
    pub fn into_plan(self, defaults: &RenderOptions) -> Result<GenerationPlan, ValidationError> {
        let start = parse_clock_time(&self.start_time)?;
        let end = parse_clock_time(&self.end_time)?;
        let window = Window::new(start, end)?;

        let lyrics_id = self.lyrics_id.filter(|&id| id != 0);
        let lyrics = match (non_blank(self.manual_lrc), lyrics_id) {
            (Some(document), _) => LyricsStrategy::Document(document),
            (None, Some(id)) => LyricsStrategy::Lookup(id),
            (None, None) => LyricsStrategy::Search {
                title: self.song.clone(),
                artist: self.artist.clone(),
            },
        };

        let audio = match non_blank(self.video_id) {
            Some(locator) => AudioStrategy::Locator(locator.trim().to_string()),
            None => AudioStrategy::Search(format!("{} - {} audio", self.artist, self.song)),
        };

        let render = RenderOptions {
            font_size: self.font_size.unwrap_or(defaults.font_size),
            background_color: self
                .background_color
                .unwrap_or_else(|| defaults.background_color.clone()),
            intensity: self.intensity.unwrap_or(defaults.intensity),
        };
        validate_render(&render)?;

        debug!(
            "Planned generation for {} - {}: lyrics via {}, window {}s..{}s",
            self.artist,
            self.song,
            lyrics.label(),
            window.start(),
            window.end()
        );

        Ok(GenerationPlan {
            song: self.song,
            artist: self.artist,
            window,
            lyrics,
            audio,
            render,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_render(render: &RenderOptions) -> Result<(), ValidationError> {
    if render.font_size == 0 {
        return Err(ValidationError::NotPositive { field: "fontsize" });
    }
    if render.intensity == 0 {
        return Err(ValidationError::NotPositive { field: "lofi" });
    }
    if parse_color(&render.background_color).is_none() {
        return Err(ValidationError::MalformedColor {
            value: render.background_color.clone(),
        });
    }
    Ok(())
}

/// Parse a hex color string to an RGBA tuple
#[must_use]
pub fn parse_color(hex: &str) -> Option<(u8, u8, u8, u8)> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        6 => Some((channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Some((channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}
