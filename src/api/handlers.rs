//! API Handlers
//!
//! HTTP request handlers exposing the cache engine. The facade is a plain
//! caller of the engine and adds no caching semantics of its own.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheEngine, StatsRecorder};
use crate::config::EngineConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearQuery, ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::store::MemoryStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache engine
    pub engine: Arc<CacheEngine>,
    /// Counters fed by the engine's recorder
    pub stats: Arc<StatsRecorder>,
}

impl AppState {
    /// Creates a new AppState around an engine and the recorder it reports to.
    pub fn new(engine: CacheEngine, stats: Arc<StatsRecorder>) -> Self {
        Self {
            engine: Arc::new(engine),
            stats,
        }
    }

    /// Builds an engine over a fresh in-memory store.
    ///
    /// The store is returned as well so the caller can run the purge task.
    pub fn in_memory(config: &EngineConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let stats = Arc::new(StatsRecorder::new());
        let engine = CacheEngine::new(store.clone(), config, stats.clone());
        (Self::new(engine, stats), store)
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL. Key, value and TTL
/// are validated by the engine.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    state.engine.set(&req.key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key; a miss is a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value: Value = state
        .engine
        .get(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache. Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.engine.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /clear
///
/// Flushes the store, or only keys under `?prefix=` when given.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>> {
    match query.prefix {
        Some(prefix) => {
            let removed = state.engine.clear_prefix(&prefix).await?;
            Ok(Json(ClearResponse::scoped(prefix, removed)))
        }
        None => {
            state.engine.clear().await?;
            Ok(Json(ClearResponse::flushed()))
        }
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.stats.snapshot()))
}

/// Handler for GET /health
///
/// Reports the circuit breaker state and the backing store in use.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        state.engine.circuit_state(),
        state.engine.store_name(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        AppState::in_memory(&EngineConfig::default()).0
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: json!({"name": "Ada"}),
            ttl: None,
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: json!("value"),
            ttl: None,
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clear_handler_with_prefix() {
        let state = state();
        for key in ["a:1", "a:2", "b:1"] {
            state.engine.set(key, &1, None).await.unwrap();
        }

        let query = ClearQuery {
            prefix: Some("a:".to_string()),
        };
        let response = clear_handler(State(state.clone()), Query(query)).await.unwrap();

        assert_eq!(response.removed, Some(2));
        assert!(state.engine.get::<i32>("b:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(state())).await;
        assert_eq!(response.stats.hits, 0);
        assert_eq!(response.stats.misses, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.store, "memory");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("value"),
            ttl: None,
        };
        let state = state();
        let result = set_handler(State(state.clone()), Json(req)).await;

        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
        assert_eq!(state.stats.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_set_null_value_is_invalid_value() {
        let req = SetRequest {
            key: "k".to_string(),
            value: Value::Null,
            ttl: Some(60),
        };
        let state = state();
        let result = set_handler(State(state.clone()), Json(req)).await;

        assert!(matches!(result, Err(CacheError::InvalidValue(_))));
        assert_eq!(state.stats.snapshot().errors, 1);
    }
}
