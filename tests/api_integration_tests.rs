//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cache_aside::cache::{CacheEngine, StatsRecorder};
use cache_aside::store::{BackingStore, StoreError, StoreResult};
use cache_aside::{api::create_router, AppState, EngineConfig};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    let (state, _) = AppState::in_memory(&EngineConfig::default());
    create_router(state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Store whose every call is refused.
struct UnreachableStore;

#[async_trait]
impl BackingStore for UnreachableStore {
    async fn get_raw(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn set_raw(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn delete_raw(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn delete_prefix(&self, _prefix: &str) -> StoreResult<u64> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn flush_all(&self) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

fn create_unreachable_app() -> Router {
    let config = EngineConfig {
        retry_delay_ms: 1,
        ..EngineConfig::default()
    };
    let stats = Arc::new(StatsRecorder::new());
    let engine = CacheEngine::new(Arc::new(UnreachableStore), &config, stats.clone());
    create_router(AppState::new(engine, stats))
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(r#"{"key":"test_key","value":{"nested":[1,2,3]}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "test_key");
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_null_value_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(r#"{"key":"k","value":null}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_zero_ttl_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(r#"{"key":"k","value":1,"ttl":0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json(r#"{"key":"user:42","value":{"name":"Ada"}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/get/user:42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "user:42");
    assert_eq!(json["value"]["name"], "Ada");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(request("GET", "/get/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(r#"{"key":"to_delete","value":"v"}"#))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("DELETE", "/del/to_delete"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(request("GET", "/get/to_delete")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_key_succeeds() {
    let app = create_test_app();

    let response = app.oneshot(request("DELETE", "/del/never_set")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint_flushes_everything() {
    let app = create_test_app();
    for body in [
        r#"{"key":"a:1","value":1}"#,
        r#"{"key":"b:1","value":2}"#,
    ] {
        app.clone().oneshot(put_json(body)).await.unwrap();
    }

    let response = app.clone().oneshot(request("DELETE", "/clear")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for uri in ["/get/a:1", "/get/b:1"] {
        let response = app.clone().oneshot(request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_clear_endpoint_with_prefix() {
    let app = create_test_app();
    for body in [
        r#"{"key":"tenant-a:1","value":1}"#,
        r#"{"key":"tenant-a:2","value":2}"#,
        r#"{"key":"tenant-b:1","value":3}"#,
    ] {
        app.clone().oneshot(put_json(body)).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(request("DELETE", "/clear?prefix=tenant-a:"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert_eq!(json["prefix"], "tenant-a:");

    let response = app.oneshot(request("GET", "/get/tenant-b:1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(r#"{"key":"k","value":"v"}"#))
        .await
        .unwrap();
    app.clone().oneshot(request("GET", "/get/k")).await.unwrap();
    app.clone().oneshot(request("GET", "/get/missing")).await.unwrap();

    let response = app.oneshot(request("GET", "/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["sets"], 1);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["errors"], 0);
    assert_eq!(json["hit_rate"], 0.5);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.oneshot(request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["circuit"], "closed");
    assert_eq!(json["store"], "memory");
    assert!(json.get("timestamp").is_some());
}

// == Backing Store Outage Tests ==

#[tokio::test]
async fn test_unreachable_store_returns_503_then_degraded() {
    let app = create_unreachable_app();

    let response = app.clone().oneshot(request("GET", "/get/k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Breaker is now open and the next call fails fast
    let response = app.clone().oneshot(request("GET", "/get/k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.clone().oneshot(request("GET", "/health")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["circuit"], "open");

    let response = app.oneshot(request("GET", "/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["errors"], 2);
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app.oneshot(put_json(r#"{"invalid json"#)).await.unwrap();

    // Axum returns 400 or 422 for JSON parsing errors
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(r#"{"key":"","value":"test"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == TTL Expiration via API Tests ==

#[tokio::test(start_paused = true)]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json(r#"{"key":"ttl_test","value":"expires_soon","ttl":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(request("GET", "/get/ttl_test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::advance(Duration::from_millis(1100)).await;

    let response = app.oneshot(request("GET", "/get/ttl_test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
