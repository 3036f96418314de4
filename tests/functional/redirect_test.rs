//! Functional tests for passthrough routes against a stub model server

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use kfserving_proxy::{
    api::routes::create_router, config::Settings, server::ShutdownSignal, AppState,
};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

/// Replies with the headers it received, as JSON
struct EchoHeaders;

impl Respond for EchoHeaders {
    fn respond(&self, request: &MockRequest) -> ResponseTemplate {
        let headers: serde_json::Map<String, serde_json::Value> = request
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    serde_json::Value::String(value.to_str().unwrap_or_default().to_string()),
                )
            })
            .collect();

        ResponseTemplate::new(200)
            .insert_header("x-upstream", "kfserving")
            .set_body_json(serde_json::Value::Object(headers))
    }
}

fn create_test_app(port: u16) -> Router {
    create_test_app_with_limit(port, 100 * 1024 * 1024)
}

fn create_test_app_with_limit(port: u16, max_request_bytes: usize) -> Router {
    let mut settings = Settings::default();
    settings.upstream.port = port;
    settings.upstream.model_name = "mnist".to_string();
    settings.upstream.timeout_ms = 5000;
    settings.upstream.max_request_bytes = max_request_bytes;

    let state = AppState::from_settings(settings, ShutdownSignal::new()).unwrap();
    create_router(Arc::new(state))
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_status_redirect_preserves_headers() {
    let upstream = MockServer::start().await;
    let port = upstream.address().port();
    Mock::given(method("GET"))
        .and(path("/v2/models/mnist/status"))
        .respond_with(EchoHeaders)
        .mount(&upstream)
        .await;

    let app = create_test_app(port);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v2/models/x/status")
                .header("x-request-id", "abc-123")
                .header(header::AUTHORIZATION, "Bearer token")
                .header(header::HOST, "modzy.example:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-upstream").unwrap(), "kfserving");

    let echoed: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(echoed["x-request-id"], "abc-123");
    assert_eq!(echoed["authorization"], "Bearer token");
    assert_eq!(echoed["host"], format!("127.0.0.1:{}", port));
}

#[tokio::test]
async fn test_infer_forwards_body_verbatim() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/models/mnist/infer"))
        .and(header_eq("content-type", "application/json"))
        .and(body_string(r#"{"inputs":[{"name":"x","data":[1]}]}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"outputs":[]}"#))
        .mount(&upstream)
        .await;

    let app = create_test_app(upstream.address().port());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v2/models/anything/infer")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"inputs":[{"name":"x","data":[1]}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, br#"{"outputs":[]}"#.to_vec());
}

#[tokio::test]
async fn test_upstream_errors_pass_through_unchanged() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/models/mnist/explain"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model has no explainer"))
        .mount(&upstream)
        .await;

    let app = create_test_app(upstream.address().port());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v2/models/mnist/explain")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_body(response).await, b"model has no explainer".to_vec());
}

#[tokio::test]
async fn test_models_root_keeps_query() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/models/"))
        .and(query_param("verbose", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"models":["mnist"]}"#))
        .mount(&upstream)
        .await;

    let app = create_test_app(upstream.address().port());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v2/models/?verbose=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, br#"{"models":["mnist"]}"#.to_vec());
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let app = create_test_app(port);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v2/models/mnist/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(json["statusCode"], 502);
}

#[tokio::test]
async fn test_oversized_infer_body_is_payload_too_large() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = create_test_app_with_limit(upstream.address().port(), 16);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v2/models/mnist/infer")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"inputs":[{"name":"x","data":[1,2,3]}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: serde_json::Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(json["statusCode"], 413);
}
