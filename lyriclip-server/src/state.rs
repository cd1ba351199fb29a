use async_trait::async_trait;
use lyriclip_core::{CoreError, Generator, LyricsSource, RenderOptions};
use lyriclip_media::{VideoResult, YtDlp};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Video search used by the `/search/video` endpoint.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search_videos(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, CoreError>;
}

#[async_trait]
impl VideoSearch for YtDlp {
    async fn search_videos(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, CoreError> {
        Self::search_videos(self, query, limit).await
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    pub lyrics: Arc<dyn LyricsSource>,
    pub videos: Arc<dyn VideoSearch>,
    /// Bounds the number of generations running at once
    pub jobs: Arc<Semaphore>,
    pub render_defaults: RenderOptions,
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        generator: Arc<Generator>,
        lyrics: Arc<dyn LyricsSource>,
        videos: Arc<dyn VideoSearch>,
        max_concurrent_jobs: usize,
        render_defaults: RenderOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generator,
            lyrics,
            videos,
            jobs: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            render_defaults,
            cancel,
        }
    }
}
