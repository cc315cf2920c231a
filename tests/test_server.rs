//! Integration test: Server API endpoints

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use morosidad::server::{create_router, AppState, ServerConfig};
use morosidad::training::{TrainEngine, TrainingConfig};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;

/// One trained model shared by every test in this file
fn trained_models_dir() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainingConfig::new()
            .with_target("moroso")
            .with_n_estimators(40)
            .with_cv_folds(3)
            .with_optimize(false)
            .with_output_dir(dir.path());
        TrainEngine::new(config)
            .run(&common::credit_dataset(400, 21))
            .unwrap();
        dir
    })
    .path()
}

fn config_for(dir: &Path) -> ServerConfig {
    ServerConfig::default()
        .with_host("127.0.0.1")
        .with_port(0)
        .with_models_dir(dir.to_string_lossy())
}

fn app_with_model() -> (Arc<AppState>, axum::Router) {
    let state = Arc::new(AppState::load(config_for(trained_models_dir())));
    (Arc::clone(&state), create_router(state))
}

fn app_without_model() -> axum::Router {
    let empty = std::env::temp_dir().join("morosidad-test-no-models");
    let state = Arc::new(AppState::new(config_for(&empty)));
    create_router(state)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(&app_without_model(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);

    let (_, app) = app_with_model();
    let (_, body) = send(&app, get("/api/health")).await;
    assert_eq!(body["model_loaded"], true);
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let app = app_without_model();
    let (status, body) = send(&app, post_json("/api/predict", &common::good_applicant())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], true);

    let (status, _) = send(&app, get("/api/model")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_known_good_and_bad_applicants() {
    let (_, app) = app_with_model();

    let (status, good) = send(&app, post_json("/api/predict", &common::good_applicant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(good["prediction"], 0);
    assert_eq!(good["prediction_label"], "NO DEFAULT");
    let risk = good["risk_level"].as_str().unwrap();
    assert!(risk == "LOW" || risk == "MEDIUM", "risk {}", risk);

    let (status, bad) = send(&app, post_json("/predecir", &common::bad_applicant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bad["prediction"], 1);
    assert_eq!(bad["prediction_label"], "DEFAULT");
    let risk = bad["risk_level"].as_str().unwrap();
    assert!(risk == "HIGH" || risk == "VERY HIGH", "risk {}", risk);

    let p0 = bad["probability_no_default"].as_f64().unwrap();
    let p1 = bad["probability_default"].as_f64().unwrap();
    assert!((p0 + p1 - 1.0).abs() < 1e-12);
    assert!(bad["request_id"].is_string());
    assert!(bad["recommendation"].is_string());
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let (_, app) = app_with_model();
    let mut body = common::good_applicant();
    body.as_object_mut().unwrap().remove("ingresos");

    let (status, response) = send(&app, post_json("/api/predict", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], true);
    assert_eq!(response["message"], "missing required field(s): ingresos");
}

#[tokio::test]
async fn test_non_numeric_field_is_rejected() {
    let (_, app) = app_with_model();
    let mut body = common::good_applicant();
    body["score_crediticio"] = json!("alto");

    let (status, response) = send(&app, post_json("/api/predict", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"].as_str().unwrap().contains("score_crediticio"));
}

#[tokio::test]
async fn test_numeric_strings_and_unseen_categories_are_scored() {
    let (_, app) = app_with_model();
    let mut body = common::good_applicant();
    body["edad"] = json!("45");
    body["zona"] = json!("Periurbana");

    let (status, response) = send(&app, post_json("/api/predict", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response["probability_default"].is_number());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let (_, app) = app_with_model();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_stats_count_predictions() {
    let (_, app) = app_with_model();
    send(&app, post_json("/api/predict", &common::good_applicant())).await;
    send(&app, post_json("/api/predict", &common::bad_applicant())).await;

    let (status, body) = send(&app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total"], 2);
    assert_eq!(body["stats"]["defaults"], 1);
    assert_eq!(body["stats"]["non_defaults"], 1);
    assert!(body["stats"]["last_prediction"].is_string());
}

#[tokio::test]
async fn test_options_endpoint() {
    let (status, body) = send(&app_without_model(), get("/api/options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categorical_options"]["zona"], json!(["Urbana", "Rural"]));
    assert_eq!(body["required_fields"].as_array().unwrap().len(), 17);
}

#[tokio::test]
async fn test_model_info_and_reload() {
    let (_, app) = app_with_model();
    let (status, body) = send(&app, get("/api/model")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["manifest"]["version"], 1);
    let name = body["model"]["name"].as_str().unwrap().to_string();

    let reload = Request::builder()
        .method("POST")
        .uri("/api/model/reload")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, reload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"]["name"], name);
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_model() {
    // private copy, since the model file gets corrupted
    let dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(trained_models_dir()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
    }
    let state = Arc::new(AppState::load(config_for(dir.path())));
    let app = create_router(Arc::clone(&state));
    assert!(state.scorer().await.is_some());

    let manifest: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("manifest.json")).unwrap()).unwrap();
    let model_file = manifest["model_file"].as_str().unwrap();
    std::fs::write(dir.path().join(model_file), b"{}").unwrap();

    let reload = Request::builder()
        .method("POST")
        .uri("/api/model/reload")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, reload).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], true);

    let (status, _) = send(&app, post_json("/api/predict", &common::good_applicant())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (status, body) = send(&app_without_model(), get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_wrong_method_returns_json_405() {
    let (status, body) = send(&app_without_model(), get("/api/predict")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], true);
}
