//! Error types and the JSON response envelope they render to

use crate::api::models::ResponseEnvelope;
use crate::batch::BatchResult;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced by the proxy
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Input directory {0} doesn't exist")]
    DirectoryNotFound(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Unprocessed files: {}", .0.failed_list())]
    BatchIncomplete(BatchResult),

    /// The model server answered, but not with 200
    #[error("{0}")]
    UpstreamStatus(StatusCode),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Upstream unreachable: {0}")]
    Proxy(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_)
            | AppError::DirectoryNotFound(_)
            | AppError::BatchIncomplete(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Proxy(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamStatus(_)
            | AppError::HttpClient(_)
            | AppError::ImageDecode(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }

        let mut envelope = ResponseEnvelope::new(status, self.to_string());
        if let AppError::BatchIncomplete(result) = &self {
            envelope = envelope.with_batch(result);
        }

        (status, Json(envelope)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
