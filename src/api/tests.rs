use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let app = create_router(AppState::new("Test Downloader"));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn index_reports_running() {
    let (status, body) = get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "✅ Test Downloader Bot is Running!"
    );
}

#[tokio::test]
async fn health_returns_status_bot_and_version() {
    let (status, body) = get("/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "alive");
    assert_eq!(json["bot"], "Test Downloader");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["uptime_secs"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let (status, _) = get("/downloads").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_stops_on_shutdown() {
    let config = HealthConfig {
        enabled: true,
        bind_address: "127.0.0.1:0".parse().unwrap(),
    };
    let shutdown = CancellationToken::new();

    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { start_health_server(&config, "Test Downloader", shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
