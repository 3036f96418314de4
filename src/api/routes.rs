//! HTTP route definitions

use crate::api::handlers;
use crate::api::models::*;
use crate::api::passthrough;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "KFServing Proxy API",
        version = "0.3.1",
        description = "Modzy-facing proxy for a KFServing model server, with directory batch inference.",
        license(name = "MIT"),
    ),
    paths(
        handlers::alive,
        handlers::status,
        handlers::run_batch,
        handlers::shutdown,
    ),
    components(schemas(BatchRequest, ResponseEnvelope)),
    tags(
        (name = "Batch", description = "Directory batch inference"),
        (name = "Health", description = "Liveness, status and lifecycle endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::alive))
        .route("/v2/health/live", get(handlers::alive))
        .route("/status", get(handlers::status))
        .route("/run", post(handlers::run_batch))
        .route("/shutdown", post(handlers::shutdown))
        // Forwarded verbatim to the model server
        .route("/v2/models", get(passthrough::models).post(passthrough::models))
        .route("/v2/models/", get(passthrough::models).post(passthrough::models))
        .route("/v2/models/:name/status", get(passthrough::model_status))
        .route("/v2/models/:name/infer", post(passthrough::model_infer))
        .route(
            "/v2/models/:name/explain",
            get(passthrough::model_explain).post(passthrough::model_explain),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
