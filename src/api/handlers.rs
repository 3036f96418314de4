//! HTTP request handlers

use crate::api::models::{BatchRequest, ResponseEnvelope};
use crate::error::AppError;
use crate::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Proxy is alive", body = String))
)]
pub async fn alive() -> &'static str {
    "Alive!"
}

/// Model server status
#[utoipa::path(
    get,
    path = "/status",
    tag = "Health",
    responses(
        (status = 200, description = "Model server is up", body = ResponseEnvelope),
        (status = 500, description = "Model server unreachable or not ready", body = ResponseEnvelope),
    )
)]
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResponseEnvelope>, AppError> {
    let upstream = state.backend.status().await?;

    Ok(Json(ResponseEnvelope::new(
        StatusCode::OK,
        upstream.to_string(),
    )))
}

/// Run inference over every file of a directory
#[utoipa::path(
    post,
    path = "/run",
    tag = "Batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "All files processed", body = ResponseEnvelope),
        (status = 400, description = "Invalid request, missing input directory, or unprocessed files", body = ResponseEnvelope),
    )
)]
pub async fn run_batch(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ResponseEnvelope>, AppError> {
    // Decoded regardless of Content-Type
    let request: BatchRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid request body: {}", e)))?;
    request.validate()?;

    info!(
        job_type = %request.job_type,
        input = %request.input,
        output = %request.output,
        "Received batch request"
    );

    let result = state
        .orchestrator
        .run(Path::new(&request.input), Path::new(&request.output))
        .await?;

    if !result.is_complete() {
        return Err(AppError::BatchIncomplete(result));
    }

    let message = format!("Processed files: {}", result.processed_list());
    Ok(Json(
        ResponseEnvelope::new(StatusCode::OK, message).with_batch(&result),
    ))
}

/// Trigger a graceful shutdown
#[utoipa::path(
    post,
    path = "/shutdown",
    tag = "Health",
    responses((status = 202, description = "Shutdown started"))
)]
pub async fn shutdown(State(state): State<Arc<AppState>>) -> StatusCode {
    info!("Shutdown requested over HTTP");
    state.shutdown.trigger();
    StatusCode::ACCEPTED
}
