use super::*;
use crate::manager::test_helpers::{self, TestFetcher};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;


/// Manager wrapped in Arc plus the fetcher serving its downloads
async fn create_test_manager() -> (
    Arc<AttachmentManager>,
    tempfile::TempDir,
    Arc<TestFetcher>,
) {
    let (manager, temp_dir, fetcher) =
        test_helpers::create_test_manager_with(TestFetcher::new()).await;
    (Arc::new(manager), temp_dir, fetcher)
}

/// Router over `manager` with its own configuration
fn router_for(manager: &Arc<AttachmentManager>) -> Router {
    create_router(manager.clone(), manager.get_config())
}

/// Send a request and decode the JSON body (`Value::Null` when empty)
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (manager, _temp_dir, _fetcher) = create_test_manager().await;

    let mut config = (*manager.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let manager = manager.clone();
        let config = config.clone();
        async move { start_api_server(manager, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (manager, _temp_dir, _fetcher) = create_test_manager().await;

    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(manager, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (manager, _temp_dir, _fetcher) = create_test_manager().await;

    let mut config = (*manager.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(manager, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (manager, _temp_dir, _fetcher) = create_test_manager().await;
    let app = router_for(&manager);

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_authentication_with_api_key() {
    let (manager, _temp_dir, _fetcher) = create_test_manager().await;

    let mut config = (*manager.get_config()).clone();
    config.server.api.api_key = Some("test-secret-key".to_string());
    let app = create_router(manager, Arc::new(config));

    let request = |key: Option<&str>| {
        let builder = Request::builder().uri("/notifications");
        let builder = match key {
            Some(key) => builder.header("X-Api-Key", key),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request(Some("wrong-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request(Some("test-secret-key")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health probes stay reachable without a key
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let temp_dir = tempfile::tempdir().unwrap();

    // The default bind address may be taken, so spawn on an OS-assigned port
    let mut config = test_helpers::test_config(temp_dir.path());
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let (manager, _fetcher) =
        test_helpers::open_manager(config, Arc::new(TestFetcher::new())).await;
    let manager = Arc::new(manager);

    let api_handle = manager.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished());
    api_handle.abort();
}
