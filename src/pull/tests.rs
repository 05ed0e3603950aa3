use super::*;
use crate::config::{PullConfig, RelayConfig};
use crate::pose::{PosePayload, RawLandmark};
use crate::state::PoseStateStore;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn test_config() -> PullConfig {
    let mut config = RelayConfig::default().pull;
    config.port = 0;
    config
}

fn sample_payload() -> PosePayload {
    let raw: Vec<RawLandmark> = (0..33)
        .map(|i| RawLandmark::new(0.25, i as f64 / 40.0, 0.0, 0.9))
        .collect();
    PosePayload::from_landmarks(&raw, 1_700_000_000_000)
}

fn create_router() -> (Router, Arc<PoseStateStore>) {
    let store = Arc::new(PoseStateStore::new());
    let server = PoseServer::new(test_config(), Arc::clone(&store));
    (server.router(), store)
}

async fn request(router: Router, method: Method, uri: &str) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

#[test]
fn test_pose_server_builder() {
    let server = PoseServerBuilder::new()
        .config(test_config())
        .store(Arc::new(PoseStateStore::new()))
        .build()
        .unwrap();

    assert_eq!(server.config.path, "/pose");
    assert_eq!(server.config.ip, "127.0.0.1");
}

#[test]
fn test_builder_rejects_route_patterns() {
    for path in ["/pose/*", "/po*se", "/:id", "/{id}", "/health"] {
        let mut config = test_config();
        config.path = path.to_string();
        let result = PoseServerBuilder::new()
            .config(config)
            .store(Arc::new(PoseStateStore::new()))
            .build();

        assert!(
            matches!(
                result,
                Err(crate::error::RelayError::Pull(crate::error::PullError::InvalidPath { .. }))
            ),
            "path {}",
            path
        );
    }
}

#[test]
fn test_builder_requires_store() {
    assert!(PoseServerBuilder::new().config(test_config()).build().is_err());
}

#[tokio::test]
async fn test_health() {
    let (router, _) = create_router();
    let (status, headers, body) = request(router, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "ok": true }));
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_pose_empty_returns_503() {
    let (router, _) = create_router();
    let (status, headers, body) = request(router, Method::GET, "/pose").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body), serde_json::json!({ "error": "No pose data yet" }));
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_pose_returns_latest_snapshot() {
    let (router, store) = create_router();
    let updated_ms = store.set(sample_payload());

    let (status, _, body) = request(router, Method::GET, "/pose").await;
    let body = json(&body);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["updated_ms"], updated_ms);
    assert_eq!(body["pose"]["timestamp_ms"], 1_700_000_000_000i64);
    assert_eq!(body["pose"]["landmarks"].as_object().unwrap().len(), 33);
    assert_eq!(body["pose"]["landmarks"]["nose"]["visibility"], 0.9);
    assert_eq!(
        body["pose"]["segments"]["shoulders"]["start_name"],
        "left_shoulder"
    );
}

#[tokio::test]
async fn test_custom_pose_path() {
    let store = Arc::new(PoseStateStore::new());
    let mut config = test_config();
    config.path = "/api/landmarks".to_string();
    let router = PoseServer::new(config, Arc::clone(&store)).router();
    store.set(sample_payload());

    let (status, _, _) = request(router.clone(), Method::GET, "/api/landmarks").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = request(router, Method::GET, "/pose").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["path"], "/pose");
}

#[tokio::test]
async fn test_unknown_path_returns_json_404() {
    let (router, _) = create_router();
    let (status, headers, body) = request(router, Method::GET, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json(&body),
        serde_json::json!({ "error": "Not Found", "path": "/nope" })
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_options_preflight_on_any_path() {
    for path in ["/pose", "/health", "/anything/else"] {
        let (router, _) = create_router();
        let (status, headers, body) = request(router, Method::OPTIONS, path).await;

        assert_eq!(status, StatusCode::NO_CONTENT, "path {}", path);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_some());
    }
}

#[tokio::test]
async fn test_post_on_known_path_is_method_not_allowed() {
    let (router, _) = create_router();
    let (status, headers, _) = request(router, Method::POST, "/pose").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_viewer_polls_configured_path() {
    let (router, _) = create_router();
    let (status, headers, body) = request(router, Method::GET, "/viewer").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("fetch(\"/pose\""));
    assert!(page.contains("strokeStyle = \"#4af\""));
    assert!(page.trim_end().ends_with("</html>"));
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let store = Arc::new(PoseStateStore::new());
    let server = PoseServer::new(test_config(), Arc::clone(&store));
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = reqwest::Client::new();
    let url = format!("http://{}/pose", addr);

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "No pose data yet" }));

    let updated_ms = store.set(sample_payload());

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["updated_ms"], updated_ms);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("server should stop on shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_bind_conflict_reports_address() {
    let first = PoseServer::new(test_config(), Arc::new(PoseStateStore::new()));
    let listener = first.bind().await.unwrap();

    let mut config = test_config();
    config.port = listener.local_addr().unwrap().port();
    let second = PoseServer::new(config, Arc::new(PoseStateStore::new()));

    match second.bind().await {
        Err(crate::error::PullError::BindFailed { address, .. }) => {
            assert!(address.ends_with(&listener.local_addr().unwrap().port().to_string()))
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("second bind should fail"),
    }
}
