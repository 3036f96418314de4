//! Batch endpoint integration tests against a stubbed model server

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb, RgbImage};
use kfserving_proxy::{
    api::routes::create_router,
    config::{ColorMode, Settings},
    server::ShutdownSignal,
    AppState,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_app(port: u16, color_mode: ColorMode) -> Router {
    let mut settings = Settings::default();
    settings.upstream.port = port;
    settings.upstream.model_name = "mnist".to_string();
    settings.upstream.timeout_ms = 5000;
    settings.inference.color_mode = color_mode;

    let state = AppState::from_settings(settings, ShutdownSignal::new()).unwrap();
    create_router(Arc::new(state))
}

async fn upstream_returning(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/models/mnist/infer"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

async fn run(app: Router, input: &Path, output: &Path) -> (StatusCode, Value) {
    let body = json!({
        "type": "file",
        "input": input.to_string_lossy(),
        "output": output.to_string_lossy(),
    });
    post_run(app, body.to_string()).await
}

async fn post_run(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/run")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn names(value: &Value) -> HashSet<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_json_processed_and_text_rejected() {
    let upstream = upstream_returning(r#"{"result":1}"#).await;
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("a.json"), r#"{"instances": [[1, 2]]}"#).unwrap();
    std::fs::write(input.join("b.txt"), "just some notes").unwrap();

    let app = create_test_app(upstream.address().port(), ColorMode::Grayscale);
    let (status, json) = run(app, &input, &output).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["status"], "Bad Request");
    assert_eq!(json["message"], "Unprocessed files: b.txt");
    assert_eq!(json["processed"], json!(["a.json"]));
    assert_eq!(json["failed"], json!(["b.txt"]));
    assert_eq!(
        std::fs::read_to_string(output.join("a.json.json")).unwrap(),
        r#"{"result":1}"#
    );
    assert!(!output.join("b.txt.json").exists());
}

#[tokio::test]
async fn test_all_processed_is_success() {
    let upstream = upstream_returning(r#"{"predictions":[3]}"#).await;
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("one.json"), "{}").unwrap();
    std::fs::write(input.join("two.json"), "{}").unwrap();

    let app = create_test_app(upstream.address().port(), ColorMode::Grayscale);
    let (status, json) = run(app, &input, &tmp.path().join("out")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["statusCode"], 200);
    assert_eq!(
        names(&json["processed"]),
        HashSet::from(["one.json".to_string(), "two.json".to_string()])
    );
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("Processed files: "));
    assert!(message.contains("one.json") && message.contains("two.json"));
}

#[tokio::test]
async fn test_images_are_sent_as_tensors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/models/mnist/infer"))
        .and(body_string(r#"{"instances":[[77,150]]}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut img: RgbImage = ImageBuffer::new(2, 1);
    img.put_pixel(0, 0, Rgb([255, 0, 0]));
    img.put_pixel(1, 0, Rgb([0, 255, 0]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut png, ImageOutputFormat::Png)
        .unwrap();

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("digit.png"), png.into_inner()).unwrap();

    let app = create_test_app(server.address().port(), ColorMode::Grayscale);
    let (status, json) = run(app, &input, &tmp.path().join("out")).await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["processed"], json!(["digit.png"]));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("out/digit.png.json")).unwrap(),
        "ok"
    );
}

#[tokio::test]
async fn test_color_mode_sends_rgb_triples() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/models/mnist/infer"))
        .and(body_string(r#"{"instances":[[[255,0,0],[0,255,0]]]}"#))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut img: RgbImage = ImageBuffer::new(2, 1);
    img.put_pixel(0, 0, Rgb([255, 0, 0]));
    img.put_pixel(1, 0, Rgb([0, 255, 0]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut png, ImageOutputFormat::Png)
        .unwrap();

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("digit.png"), png.into_inner()).unwrap();

    let app = create_test_app(server.address().port(), ColorMode::Color);
    let (status, json) = run(app, &input, &tmp.path().join("out")).await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["processed"], json!(["digit.png"]));
}

#[tokio::test]
async fn test_hidden_files_and_subdirectories_fail() {
    let upstream = upstream_returning("{}").await;
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join(".secret.json"), "{}").unwrap();
    std::fs::create_dir(input.join("nested")).unwrap();
    std::fs::write(input.join("ok.json"), "{}").unwrap();

    let app = create_test_app(upstream.address().port(), ColorMode::Grayscale);
    let (status, json) = run(app, &input, &tmp.path().join("out")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(names(&json["processed"]), HashSet::from(["ok.json".to_string()]));
    assert_eq!(
        names(&json["failed"]),
        HashSet::from([".secret.json".to_string(), "nested".to_string()])
    );
}

#[tokio::test]
async fn test_upstream_failure_is_per_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("a.json"), "{}").unwrap();
    std::fs::write(input.join("b.json"), "{}").unwrap();

    let app = create_test_app(server.address().port(), ColorMode::Grayscale);
    let (status, json) = run(app, &input, &tmp.path().join("out")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["processed"], json!([]));
    assert_eq!(
        names(&json["failed"]),
        HashSet::from(["a.json".to_string(), "b.json".to_string()])
    );
}

#[tokio::test]
async fn test_empty_directory_succeeds() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    let output = tmp.path().join("does/not/exist/yet");

    let app = create_test_app(1, ColorMode::Grayscale);
    let (status, json) = run(app, &input, &output).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Processed files: ");
    assert_eq!(json["processed"], json!([]));
    assert_eq!(json["failed"], json!([]));
    assert!(output.is_dir());
}

#[tokio::test]
async fn test_missing_input_directory() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("missing");
    let output = tmp.path().join("out");

    let app = create_test_app(1, ColorMode::Grayscale);
    let (status, json) = run(app, &input, &output).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        format!("Input directory {} doesn't exist", input.display())
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn test_body_without_content_type_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    std::fs::create_dir(&input).unwrap();
    let body = json!({
        "type": "file",
        "input": input.to_string_lossy(),
        "output": tmp.path().join("out").to_string_lossy(),
    });

    let app = create_test_app(1, ColorMode::Grayscale);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/run")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["message"], "Processed files: ");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_test_app(1, ColorMode::Grayscale);

    let (status, json) = post_run(app.clone(), "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["statusCode"], 400);

    let (status, _) = post_run(app.clone(), r#"{"type": "file", "input": "/in"}"#.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) =
        post_run(app, r#"{"type": "", "input": "/in", "output": "/out"}"#.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Field 'type' is required");
}
