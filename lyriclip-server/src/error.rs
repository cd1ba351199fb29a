use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lyriclip_core::{CoreError, GenerateError, Stage};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("{0}")]
    BadRequest(String),

    #[error("File not found")]
    NotFound,

    #[error("Upstream service failed: {0}")]
    Upstream(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Generate(e) => generate_status(e),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Generate(e) => Some(e.stage()),
            _ => None,
        }
    }
}

const fn generate_status(error: &GenerateError) -> StatusCode {
    match error {
        GenerateError::Validation(_) | GenerateError::EmptyWindow { .. } => StatusCode::BAD_REQUEST,
        GenerateError::LyricsNotFound => StatusCode::NOT_FOUND,
        GenerateError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GenerateError::LyricsUnavailable { .. }
        | GenerateError::WindowWrite { .. }
        | GenerateError::Acquisition { .. }
        | GenerateError::Trim { .. }
        | GenerateError::Synthesis { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
            stage: self.stage(),
        };
        (status, Json(body)).into_response()
    }
}
