//! Audio download and video search through yt-dlp.

use crate::process;
use crate::remove::FsRemover;
use async_trait::async_trait;
use lyriclip_core::{AudioAcquirer, CoreError, TempFileRemover};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Number of results returned by [`YtDlp::search_videos`]
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// A video search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoResult {
    pub id: String,
    pub title: String,
    pub channel: Option<String>,
    pub duration: Option<f64>,
}

/// One line of `--dump-json` output in flat-playlist mode
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl From<FlatEntry> for VideoResult {
    fn from(entry: FlatEntry) -> Self {
        Self {
            title: entry.title.unwrap_or_else(|| entry.id.clone()),
            id: entry.id,
            channel: entry.channel.or(entry.uploader),
            duration: entry.duration,
        }
    }
}

/// Drives the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    temp_dir: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            temp_dir: temp_dir.into(),
        }
    }

    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Search for videos matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if yt-dlp is missing or fails.
    pub async fn search_videos(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, CoreError> {
        info!("Searching videos: {}", query);
        let output = process::run(&self.program, &search_args(query, limit)).await?;
        let results = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        debug!("Video search returned {} results", results.len());
        Ok(results)
    }

    async fn download(&self, target: &str, out_name: &str) -> Result<Option<PathBuf>, CoreError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let template = self.temp_dir.join(format!("{out_name}.%(ext)s"));
        process::run(&self.program, &download_args(target, &template)).await?;

        let expected = self.temp_dir.join(format!("{out_name}.mp3"));
        if tokio::fs::try_exists(&expected).await? {
            info!("Downloaded audio to {}", expected.display());
            Ok(Some(expected))
        } else {
            warn!("yt-dlp finished but {} was not produced", expected.display());
            Ok(None)
        }
    }
}

#[async_trait]
impl AudioAcquirer for YtDlp {
    async fn acquire(&self, query: &str, out_name: &str) -> Result<Option<PathBuf>, CoreError> {
        self.download(&format!("ytsearch1:{query}"), out_name).await
    }

    async fn acquire_by_locator(
        &self,
        locator: &str,
        out_name: &str,
    ) -> Result<Option<PathBuf>, CoreError> {
        self.download(&locator_url(locator), out_name).await
    }

    /// Removes `<out_name>.*` from the temp dir, which covers yt-dlp's
    /// `.part` files and pre-conversion downloads.
    fn discard(&self, out_name: &str) {
        let prefix = format!("{out_name}.");
        let entries = match std::fs::read_dir(&self.temp_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Nothing to discard in {}: {}", self.temp_dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                FsRemover.remove(&entry.path());
            }
        }
    }
}

/// Bare video IDs become watch URLs; anything that already looks like a URL
/// is passed through.
fn locator_url(locator: &str) -> String {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        locator.to_string()
    } else {
        format!("{WATCH_URL}{locator}")
    }
}

fn download_args(target: &str, template: &Path) -> Vec<String> {
    vec![
        "--extract-audio".into(),
        "--audio-format".into(),
        "mp3".into(),
        "--no-playlist".into(),
        "--quiet".into(),
        "--no-warnings".into(),
        "--output".into(),
        template.to_string_lossy().into_owned(),
        target.into(),
    ]
}

fn search_args(query: &str, limit: u32) -> Vec<String> {
    vec![
        "--flat-playlist".into(),
        "--dump-json".into(),
        "--no-warnings".into(),
        format!("ytsearch{limit}:{query}"),
    ]
}

fn parse_search_output(stdout: &str) -> Vec<VideoResult> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<FlatEntry>(line) {
            Ok(entry) => Some(entry.into()),
            Err(e) => {
                warn!("Skipping unparseable search entry: {}", e);
                None
            }
        })
        .collect()
}
