use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Infrastructure errors: configuration, storage, network and external tools.
#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created with default values.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Lyrics source errors
    #[error("Lyrics source {source_name} failed: {reason}")]
    LyricsSourceFailed { source_name: String, reason: String },

    // History store errors
    #[error("History database error: {0}")]
    HistoryError(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // External tool errors
    #[error("Required command not found: {program}")]
    CommandMissing { program: String },

    #[error("Command `{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A malformed or inconsistent generation request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid clock time {value:?}: expected ss, mm:ss or hh:mm:ss")]
    MalformedTime { value: String },

    #[error("Time {value} must be a finite, non-negative number of seconds")]
    TimeOutOfRange { value: f64 },

    #[error("Start time {start}s is after end time {end}s")]
    InvertedWindow { start: f64, end: f64 },

    #[error("Invalid background color {value:?}: expected #RRGGBB or #RRGGBBAA")]
    MalformedColor { value: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// Pipeline stage a [`GenerateError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Request,
    Lyrics,
    Window,
    Audio,
    Video,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Lyrics => "lyrics",
            Self::Window => "window",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one generation request.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lyrics not found")]
    LyricsNotFound,

    #[error("No lyrics between {start}s and {end}s")]
    EmptyWindow { start: f64, end: f64 },

    #[error("Failed to write lyric window: {reason}")]
    WindowWrite { reason: String },

    #[error("Lyrics error: {reason}")]
    LyricsUnavailable { reason: String },

    #[error("Audio download failed: {reason}")]
    Acquisition { reason: String },

    #[error("Audio trim failed: {reason}")]
    Trim { reason: String },

    #[error("Video generation failed: {reason}")]
    Synthesis { reason: String },

    #[error("Generation cancelled before the {stage} stage")]
    Cancelled { stage: Stage },
}

impl GenerateError {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Request,
            Self::LyricsNotFound | Self::LyricsUnavailable { .. } => Stage::Lyrics,
            Self::EmptyWindow { .. } | Self::WindowWrite { .. } => Stage::Window,
            Self::Acquisition { .. } | Self::Trim { .. } => Stage::Audio,
            Self::Synthesis { .. } => Stage::Video,
            Self::Cancelled { stage } => *stage,
        }
    }

    /// Whether the caller can fix the failure by changing the request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::LyricsNotFound | Self::EmptyWindow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tags() {
        assert_eq!(GenerateError::LyricsNotFound.stage(), Stage::Lyrics);
        assert_eq!(
            GenerateError::EmptyWindow {
                start: 5.0,
                end: 6.0
            }
            .stage(),
            Stage::Window
        );
        assert_eq!(
            GenerateError::WindowWrite {
                reason: "disk full".into()
            }
            .stage(),
            Stage::Window
        );
        assert_eq!(
            GenerateError::Trim {
                reason: "boom".into()
            }
            .stage(),
            Stage::Audio
        );
        assert_eq!(
            GenerateError::Synthesis {
                reason: "boom".into()
            }
            .stage(),
            Stage::Video
        );
    }

    #[test]
    fn test_not_found_and_empty_window_are_distinct_client_errors() {
        let not_found = GenerateError::LyricsNotFound;
        let empty = GenerateError::EmptyWindow {
            start: 5.0,
            end: 6.0,
        };
        assert!(not_found.is_client_error());
        assert!(empty.is_client_error());
        assert_ne!(not_found.to_string(), empty.to_string());
        assert_ne!(not_found.stage(), empty.stage());
    }

    #[test]
    fn test_downstream_failures_are_server_errors() {
        let err = GenerateError::Acquisition {
            reason: "no file".into(),
        };
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Audio download failed: no file");
    }
}
