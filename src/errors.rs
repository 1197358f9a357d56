use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Failures raised by the cache-aside flow.
///
/// Metadata fetch/upload failures are fatal to the request (or to one batch
/// item); image failures are caught by the orchestrator and degrade to a
/// nulled URL. `MissingImagePath` is never surfaced to callers at all — it
/// only short-circuits handling of the one image that has no reference.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("upstream request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream returned {status} for {url}")]
    FetchStatus {
        url: String,
        status: StatusCode,
    },
    #[error("upload of `{path}` failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upload of `{path}` rejected with status {status}")]
    UploadRejected {
        path: String,
        status: StatusCode,
    },
    #[error("image reference missing from metadata")]
    MissingImagePath,
    #[error("metadata serialization failed")]
    Serialize(#[from] serde_json::Error),
}

/// A lightweight wrapper for HTTP-facing errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Callers only ever see a generic message for 500-class failures; the
/// detailed error is logged server-side where it occurs.
impl From<CacheError> for AppError {
    fn from(_: CacheError) -> Self {
        AppError::internal("Failed to fetch and upload data.")
    }
}
