//! Handlers for routes forwarded verbatim to the model server

use crate::error::AppError;
use crate::upstream::{resolve_redirect, PassthroughRoute};
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use std::sync::Arc;

async fn redirect(
    state: &AppState,
    route: PassthroughRoute,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    let target = resolve_redirect(route, &state.routes, uri.query(), &headers);
    state.forwarder.forward(method, target, body).await
}

pub async fn models(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    redirect(&state, PassthroughRoute::Models, method, uri, headers, body).await
}

pub async fn model_status(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    redirect(&state, PassthroughRoute::Status, method, uri, headers, body).await
}

pub async fn model_infer(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    redirect(&state, PassthroughRoute::Infer, method, uri, headers, body).await
}

pub async fn model_explain(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    redirect(&state, PassthroughRoute::Explain, method, uri, headers, body).await
}
