//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::cache::CodecError;
use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for engine callers.
///
/// A cache miss is not an error, and neither is a corrupt entry: both come
/// back as `Ok(None)` from [`crate::cache::CacheEngine::get`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty key or prefix
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Absent value or non-positive TTL
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The value could not be serialized
    #[error("Encoding failed: {0}")]
    Encoding(#[source] CodecError),

    /// The backing store failed on every attempt
    #[error("Cache unavailable: {operation} failed after {attempts} attempt(s): {source}")]
    CacheUnavailable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The circuit breaker is open; the backing store was not contacted
    #[error("Cache service unavailable: circuit breaker is open")]
    ServiceUnavailable,

    /// Key not present, raised by the HTTP facade only
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// True for the two variants a caller should treat as "no cache, go to
    /// the source of truth".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CacheError::CacheUnavailable { .. } | CacheError::ServiceUnavailable
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            CacheError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::CacheUnavailable { .. } | CacheError::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
