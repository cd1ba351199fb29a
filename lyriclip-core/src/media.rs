//! Contracts for the external media tools the generator drives.
//!
//! Implementations live outside the core; the generator only sees these
//! traits, which keeps it testable with in-memory fakes.

use crate::error::CoreError;
use crate::request::RenderOptions;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Downloads audio into a transient file.
#[async_trait]
pub trait AudioAcquirer: Send + Sync {
    /// Search for `query` and download the first hit as `out_name`.
    ///
    /// Returns the path of the downloaded file, or `None` if nothing was
    /// downloaded.
    async fn acquire(&self, query: &str, out_name: &str) -> Result<Option<PathBuf>, CoreError>;

    /// Download from an explicit locator (video ID or URL) as `out_name`.
    async fn acquire_by_locator(
        &self,
        locator: &str,
        out_name: &str,
    ) -> Result<Option<PathBuf>, CoreError>;

    /// Release anything a download as `out_name` left behind, finished or
    /// partial. Best-effort, like [`TempFileRemover::remove`].
    fn discard(&self, out_name: &str);
}

/// Cuts `[start, end]` seconds out of an audio file.
#[async_trait]
pub trait AudioTrimmer: Send + Sync {
    /// Returns `false` if the trim did not produce an output file.
    async fn trim(&self, input: &Path, output: &Path, start: f64, end: f64) -> Result<bool, CoreError>;
}

/// Everything the renderer needs for one video.
#[derive(Debug, Clone)]
pub struct SynthesisJob<'a> {
    pub audio: &'a Path,
    /// JSON lyric window document (`[{"start": .., "text": ..}]`)
    pub lyrics: &'a Path,
    pub output: &'a Path,
    pub options: &'a RenderOptions,
}

/// Renders the lyric video.
#[async_trait]
pub trait VideoSynthesizer: Send + Sync {
    async fn synthesize(&self, job: &SynthesisJob<'_>) -> Result<(), CoreError>;
}

/// Releases transient files. Best-effort: failures are logged, never returned.
pub trait TempFileRemover: Send + Sync {
    fn remove(&self, path: &Path);
}

/// A transient file that is released when the guard goes out of scope.
///
/// Held across the stage that consumes the file so release happens on every
/// exit path: success, error return, timeout or a dropped future.
pub struct TransientFile {
    path: PathBuf,
    remover: Arc<dyn TempFileRemover>,
}

impl TransientFile {
    pub fn new(path: PathBuf, remover: Arc<dyn TempFileRemover>) -> Self {
        Self { path, remover }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        debug!("Releasing transient file {}", self.path.display());
        self.remover.remove(&self.path);
    }
}

/// Discards an acquisition's output when dropped.
///
/// Taken before the download starts, so partial files are swept even when
/// the acquirer fails or its future is dropped on timeout.
pub struct PendingDownload<'a> {
    acquirer: &'a dyn AudioAcquirer,
    out_name: &'a str,
}

impl<'a> PendingDownload<'a> {
    #[must_use]
    pub fn new(acquirer: &'a dyn AudioAcquirer, out_name: &'a str) -> Self {
        Self { acquirer, out_name }
    }
}

impl Drop for PendingDownload<'_> {
    fn drop(&mut self) {
        debug!("Discarding download output for {}", self.out_name);
        self.acquirer.discard(self.out_name);
    }
}
