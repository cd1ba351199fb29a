use async_trait::async_trait;
use lyriclip_core::{CoreError, LyricRecord, LyricsConfig, LyricsSource};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyriclip::lyrics::lrclib";

/// LRCLIB.net lyrics source
pub struct LrclibClient {
    client: ClientWithMiddleware,
    api_url: String,
}

impl LrclibClient {
    /// Create a client with the configured base URL, timeout and retry count.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &LyricsConfig) -> Result<Self, CoreError> {
        // Base client with timeout
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("LyriClip/0.1 (https://github.com/kvnxiao/lyriclip)")
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={}", self.api_url, urlencoding::encode(query))
    }

    fn get_url(&self, id: i64) -> String {
        format!("{}/get/{id}", self.api_url)
    }

    fn failure(&self, status: reqwest::StatusCode) -> CoreError {
        warn!(target: LOG_TARGET, "LRCLIB returned status: {}", status);
        CoreError::LyricsSourceFailed {
            source_name: self.name().to_string(),
            reason: format!("LRCLIB returned status: {status}"),
        }
    }
}

/// Record shape shared by the `/search` and `/get` endpoints
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    #[serde(rename = "trackName", default)]
    track_name: String,
    #[serde(rename = "artistName", default)]
    artist_name: String,
    #[serde(rename = "albumName")]
    album_name: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl From<LrclibResponse> for LyricRecord {
    fn from(response: LrclibResponse) -> Self {
        Self {
            id: response.id,
            track_name: response.track_name,
            artist_name: response.artist_name,
            album_name: response.album_name,
            duration: response.duration,
            instrumental: response.instrumental,
            plain_lyrics: response.plain_lyrics,
            synced_lyrics: response.synced_lyrics,
        }
    }
}

#[async_trait]
impl LyricsSource for LrclibClient {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, query: &str) -> Result<Vec<LyricRecord>, CoreError> {
        let url = self.search_url(query);
        debug!(target: LOG_TARGET, "LRCLIB request URL (search): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(self.failure(response.status()));
        }

        let results: Vec<LrclibResponse> = response.json().await?;
        info!(target: LOG_TARGET, "LRCLIB search returned {} results", results.len());
        Ok(results.into_iter().map(LyricRecord::from).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<LyricRecord>, CoreError> {
        let url = self.get_url(id);
        debug!(target: LOG_TARGET, "LRCLIB request URL (get): {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!(target: LOG_TARGET, "LRCLIB has no record with id {}", id);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.failure(response.status()));
        }

        let result: LrclibResponse = response.json().await?;
        info!(target: LOG_TARGET, "LRCLIB found record with id: {}", result.id);
        Ok(Some(result.into()))
    }
}
