//! Output artifact naming.
//!
//! Every request gets a base name `<sanitized title>_<YYYYmmdd_HHMMSS>` from
//! which its lyric window, trimmed audio and video paths are derived. Names
//! are reserved for the lifetime of the request so that two requests for the
//! same title within the same second still write to disjoint files.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Extension of the lyric window document
pub const LYRICS_EXTENSION: &str = "json";
/// Extension of the trimmed audio
pub const AUDIO_EXTENSION: &str = "mp3";
/// Extension of the rendered video
pub const VIDEO_EXTENSION: &str = "mp4";

/// Keep letters, digits, space, hyphen and underscore; trim the result.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Base name for a title at a given time, before collision handling.
#[must_use]
pub fn base_name<Tz: TimeZone>(title: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", sanitize_title(title), now.format("%Y%m%d_%H%M%S"))
}

/// The durable outputs of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationArtifact {
    pub base_name: String,
    pub lyrics_path: PathBuf,
    pub audio_path: PathBuf,
    pub video_path: PathBuf,
}

impl GenerationArtifact {
    #[must_use]
    pub fn new(output_dir: &Path, base_name: &str) -> Self {
        let path = |ext: &str| output_dir.join(format!("{base_name}.{ext}"));
        Self {
            base_name: base_name.to_string(),
            lyrics_path: path(LYRICS_EXTENSION),
            audio_path: path(AUDIO_EXTENSION),
            video_path: path(VIDEO_EXTENSION),
        }
    }

    /// File name of the rendered video, as referenced by clients and history
    #[must_use]
    pub fn video_file_name(&self) -> String {
        format!("{}.{VIDEO_EXTENSION}", self.base_name)
    }

    /// Name handed to the audio acquirer for the transient download
    #[must_use]
    pub fn transient_audio_name(&self) -> String {
        format!("temp_{}", self.base_name)
    }

    fn any_exists(&self) -> bool {
        [&self.lyrics_path, &self.audio_path, &self.video_path]
            .iter()
            .any(|p| p.exists())
    }
}

/// Process-wide set of base names currently in use.
#[derive(Debug, Clone, Default)]
pub struct NameReservations {
    reserved: Arc<Mutex<HashSet<String>>>,
}

impl NameReservations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a free base name for `title` in `output_dir`.
    ///
    /// Appends `_2`, `_3`, ... when the plain name is held by another
    /// in-flight request or already has artifacts on disk.
    pub fn reserve<Tz: TimeZone>(
        &self,
        output_dir: &Path,
        title: &str,
        now: &DateTime<Tz>,
    ) -> Reservation
    where
        Tz::Offset: std::fmt::Display,
    {
        let base = base_name(title, now);
        let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);

        let mut suffix = 1u32;
        let artifact = loop {
            let candidate = if suffix == 1 {
                base.clone()
            } else {
                format!("{base}_{suffix}")
            };
            let artifact = GenerationArtifact::new(output_dir, &candidate);
            if !reserved.contains(&candidate) && !artifact.any_exists() {
                break artifact;
            }
            suffix += 1;
        };

        reserved.insert(artifact.base_name.clone());
        Reservation {
            artifact,
            reserved: Arc::clone(&self.reserved),
        }
    }

    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

/// A reserved base name; released on drop.
#[derive(Debug)]
pub struct Reservation {
    artifact: GenerationArtifact,
    reserved: Arc<Mutex<HashSet<String>>>,
}

impl Reservation {
    #[must_use]
    pub const fn artifact(&self) -> &GenerationArtifact {
        &self.artifact
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.artifact.base_name);
    }
}
