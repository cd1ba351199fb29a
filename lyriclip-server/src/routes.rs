use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use lyriclip_core::{GenerateError, GenerationRequest, HistoryRecord, LyricRecord, Stage};
use lyriclip_media::{VideoResult, DEFAULT_SEARCH_LIMIT};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/history", get(history))
        .route("/search/lyrics", get(search_lyrics))
        .route("/search/video", get(search_video))
        .route("/generated/{file}", get(generated_file))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub video_url: String,
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!("Received generation request: {} - {}", request.artist, request.song);

    let plan = request
        .into_plan(&state.render_defaults)
        .map_err(GenerateError::from)?;

    let permit = tokio::select! {
        permit = Arc::clone(&state.jobs).acquire_owned() => permit
            .map_err(|_| GenerateError::Cancelled { stage: Stage::Request })?,
        () = state.cancel.cancelled() => {
            return Err(GenerateError::Cancelled { stage: Stage::Request }.into());
        }
    };

    // Detached so a dropped connection does not abandon a stage midway
    let generator = Arc::clone(&state.generator);
    let cancel = state.cancel.clone();
    let job = tokio::spawn(async move {
        let _permit = permit;
        generator.generate(&plan, &cancel).await
    });

    let artifact = job
        .await
        .map_err(|e| ApiError::Internal(format!("generation task failed: {e}")))??;

    Ok(Json(GenerateResponse {
        video_url: format!("/generated/{}", artifact.video_file_name()),
    }))
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let records = state
        .generator
        .list_history()
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read history: {e}")))?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

impl SearchParams {
    fn query(&self) -> Result<&str, ApiError> {
        let q = self.q.trim();
        if q.is_empty() {
            return Err(ApiError::BadRequest("Query parameter `q` is required".into()));
        }
        Ok(q)
    }
}

/// A lyrics search hit, as shown to the song picker
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LyricsHit {
    pub id: i64,
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<f64>,
    #[serde(rename = "syncedLyrics")]
    pub synced_lyrics: String,
    #[serde(rename = "plainLyrics")]
    pub plain_lyrics: Option<String>,
}

impl LyricsHit {
    /// `None` unless the record carries synced lyrics
    fn from_record(record: LyricRecord) -> Option<Self> {
        let synced = record.synced()?.to_string();
        Some(Self {
            id: record.id,
            name: record.track_name,
            artist: record.artist_name,
            album: record.album_name,
            duration: record.duration,
            synced_lyrics: synced,
            plain_lyrics: record.plain_lyrics,
        })
    }
}

async fn search_lyrics(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<LyricsHit>>, ApiError> {
    let query = params.query()?;
    let records = state.lyrics.search(query).await?;
    let hits: Vec<_> = records.into_iter().filter_map(LyricsHit::from_record).collect();
    debug!("Lyrics search for {:?} returned {} synced hits", query, hits.len());
    Ok(Json(hits))
}

async fn search_video(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<VideoResult>>, ApiError> {
    let query = params.query()?;
    Ok(Json(state.videos.search_videos(query, DEFAULT_SEARCH_LIMIT).await?))
}

/// Only bare file names are served; anything that could leave the output
/// directory is rejected.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

async fn generated_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_safe_file_name(&file) {
        return Err(ApiError::BadRequest(format!("Invalid file name: {file}")));
    }

    let path = state.generator.output_dir().join(&file);
    let read_error = |e: std::io::Error| match e.kind() {
        ErrorKind::NotFound => ApiError::NotFound,
        _ => ApiError::Internal(format!("failed to read {file}: {e}")),
    };
    let handle = tokio::fs::File::open(&path).await.map_err(read_error)?;
    let len = handle.metadata().await.map_err(read_error)?.len();

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&file).to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(ReaderStream::new(handle)),
    ))
}
