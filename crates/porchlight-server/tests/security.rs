use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use porchlight_core::config::Config;
use porchlight_duckdb::DuckDbStore;
use porchlight_server::app::build_app;
use porchlight_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/porchlight-test".to_string(),
        api_key: None,
        rate_limit_max: 50,
        rate_limit_window_secs: 900,
        rate_limit_disable: true,
        duckdb_memory_limit: "1GB".to_string(),
    }
}

fn setup_with(config: Config) -> axum::Router {
    let store = DuckDbStore::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(Arc::new(store), config));
    build_app(state)
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON body")
}

fn track_request(api_key: Option<&str>, ip: &str) -> Request<Body> {
    let body = json!({
        "page": "/",
        "sessionId": "session_1700000000000_abc123def",
        "deviceType": "desktop",
        "browser": "Firefox",
    });
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/analytics/track")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

#[tokio::test]
async fn missing_api_key_is_rejected_when_configured() {
    let app = setup_with(Config {
        api_key: Some("hunter2".to_string()),
        ..test_config()
    });

    let response = app
        .clone()
        .oneshot(track_request(None, "1.2.3.4"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("UNAUTHORIZED"));

    let response = app
        .oneshot(track_request(Some("wrong"), "1.2.3.4"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correct_api_key_passes_the_gate() {
    let app = setup_with(Config {
        api_key: Some("hunter2".to_string()),
        ..test_config()
    });

    let response = app
        .oneshot(track_request(Some("hunter2"), "1.2.3.4"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn no_configured_key_leaves_routes_open() {
    let app = setup_with(test_config());

    let response = app
        .oneshot(track_request(None, "1.2.3.4"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_needs_no_api_key() {
    let app = setup_with(Config {
        api_key: Some("hunter2".to_string()),
        ..test_config()
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn rate_limit_rejects_the_overflowing_request() {
    let app = setup_with(Config {
        rate_limit_disable: false,
        rate_limit_max: 2,
        ..test_config()
    });

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(track_request(None, "1.2.3.4"))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(track_request(None, "1.2.3.4"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert_eq!(body["code"], json!("RATE_LIMIT_EXCEEDED"));
    assert_eq!(
        body["error"],
        json!("Too many requests from this IP, please try again later.")
    );

    // A different client IP has its own window.
    let response = app
        .oneshot(track_request(None, "5.6.7.8"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
}
