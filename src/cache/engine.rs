//! Cache Engine Module
//!
//! The component callers talk to. Every operation follows the same gate
//! sequence:
//!
//! ```text
//! validate -> circuit breaker -> retry(timeout(backing store)) -> codec
//! ```
//!
//! and emits exactly one outcome event to the recorder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::codec::{Codec, CodecError};
use crate::cache::recorder::{CacheEvent, Recorder};
use crate::config::EngineConfig;
use crate::error::{CacheError, Result};
use crate::resilience::{CircuitBreaker, CircuitState, RetryPolicy};
use crate::store::{BackingStore, StoreError, StoreResult};

/// Largest TTL accepted by [`CacheEngine::set`], about 136 years.
pub const MAX_TTL_SECONDS: u64 = u32::MAX as u64;

// == Cache Engine ==
/// Cache-aside layer over a [`BackingStore`].
///
/// Safe to share between tasks behind an `Arc`; the circuit breaker is the
/// only mutable state.
pub struct CacheEngine {
    store: Arc<dyn BackingStore>,
    codec: Codec,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    recorder: Arc<dyn Recorder>,
    default_ttl: u64,
    operation_timeout: Duration,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("store", &self.store.name())
            .field("codec", &self.codec)
            .field("breaker", &self.breaker)
            .field("retry", &self.retry)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl CacheEngine {
    // == Constructor ==
    pub fn new(
        store: Arc<dyn BackingStore>,
        config: &EngineConfig,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            store,
            codec: Codec::new(config.max_uncompressed_size).with_recorder(recorder.clone()),
            breaker: CircuitBreaker::new(config.breaker_config()),
            retry: config.retry_policy(),
            recorder,
            default_ttl: config.default_ttl,
            operation_timeout: config.operation_timeout(),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    // == Get ==
    /// Returns the cached value for `key`, or `None` on a miss.
    ///
    /// An entry that fails to decode is reported as a `corrupt` event and
    /// served as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.validate_key(key)?;

        let raw = self
            .call_store("get", key, || self.store.get_raw(key))
            .await?;

        let raw = match raw {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                debug!(key = key, "Cache MISS");
                self.recorder.record(CacheEvent::Miss, key, None);
                return Ok(None);
            }
        };

        match self.codec.decode(&raw) {
            Ok(Some(value)) => {
                debug!(key = key, size = raw.len(), "Cache HIT");
                self.recorder
                    .record(CacheEvent::Hit, key, Some(raw.len() as f64));
                Ok(Some(value))
            }
            Ok(None) => {
                self.recorder.record(CacheEvent::Miss, key, None);
                Ok(None)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Corrupt cache entry, treating as miss");
                self.recorder
                    .record(CacheEvent::Corrupt, key, Some(raw.len() as f64));
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_seconds`, or the default TTL.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        self.validate_key(key)?;

        let ttl = ttl_seconds.unwrap_or(self.default_ttl);
        if ttl == 0 {
            return Err(self.reject(key, CacheError::InvalidValue("TTL must be positive".to_string())));
        }
        if ttl > MAX_TTL_SECONDS {
            return Err(self.reject(
                key,
                CacheError::InvalidValue(format!("TTL must not exceed {} seconds", MAX_TTL_SECONDS)),
            ));
        }

        let encoded = match self.codec.encode(value) {
            Ok(encoded) => encoded,
            Err(CodecError::AbsentValue) => {
                return Err(self.reject(
                    key,
                    CacheError::InvalidValue("absent values can not be cached".to_string()),
                ));
            }
            Err(e) => return Err(self.reject(key, CacheError::Encoding(e))),
        };

        self.call_store("set", key, || self.store.set_raw(key, &encoded, ttl))
            .await?;

        debug!(key = key, ttl = ttl, size = encoded.len(), "Cache SET");
        self.recorder
            .record(CacheEvent::Set, key, Some(encoded.len() as f64));
        Ok(())
    }

    // == Delete ==
    /// Removes `key`. Deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.validate_key(key)?;

        self.call_store("delete", key, || self.store.delete_raw(key))
            .await?;

        debug!(key = key, "Cache DEL");
        self.recorder.record(CacheEvent::Delete, key, None);
        Ok(())
    }

    // == Clear ==
    /// Flushes the whole backing-store keyspace.
    ///
    /// This also removes keys written by other users of the same store;
    /// prefer [`CacheEngine::clear_prefix`] on shared stores.
    pub async fn clear(&self) -> Result<()> {
        self.call_store("clear", "*", || self.store.flush_all())
            .await?;

        warn!(store = self.store.name(), "Cache flushed");
        self.recorder.record(CacheEvent::Clear, "*", None);
        Ok(())
    }

    // == Clear Prefix ==
    /// Removes every key starting with `prefix`, returning how many were removed.
    pub async fn clear_prefix(&self, prefix: &str) -> Result<u64> {
        if prefix.is_empty() {
            return Err(self.reject(
                prefix,
                CacheError::InvalidKey("prefix must not be empty".to_string()),
            ));
        }

        let removed = self
            .call_store("clear", prefix, || self.store.delete_prefix(prefix))
            .await?;

        debug!(prefix = prefix, removed = removed, "Cache prefix cleared");
        self.recorder
            .record(CacheEvent::Clear, prefix, Some(removed as f64));
        Ok(removed)
    }

    // == Gate ==
    /// Runs one backing-store call behind the breaker, with retry and a
    /// per-attempt deadline. Cancelling the returned future mid-call records
    /// no outcome and frees a HalfOpen trial slot.
    async fn call_store<T, F, Fut>(&self, operation: &'static str, label: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let permit = match self.breaker.acquire() {
            Some(permit) => permit,
            None => {
                debug!(operation = operation, label = label, "Circuit open, failing fast");
                return Err(self.reject(label, CacheError::ServiceUnavailable));
            }
        };

        let timeout = self.operation_timeout;
        let result = self
            .retry
            .execute(|| {
                let attempt = call();
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(StoreError::Timeout(timeout.as_millis() as u64)),
                    }
                }
            })
            .await;

        match result {
            Ok(value) => {
                permit.succeed();
                Ok(value)
            }
            Err(exhausted) => {
                permit.fail();
                error!(
                    operation = operation,
                    label = label,
                    store = self.store.name(),
                    attempts = exhausted.attempts,
                    error = %exhausted.last,
                    "Backing store call failed"
                );
                self.recorder
                    .record(CacheEvent::Error, label, Some(exhausted.attempts as f64));
                Err(CacheError::CacheUnavailable {
                    operation,
                    attempts: exhausted.attempts,
                    source: exhausted.last,
                })
            }
        }
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(self.reject(key, CacheError::InvalidKey("key must not be empty".to_string())));
        }
        Ok(())
    }

    /// Records the `error` outcome for a call that never reached the store.
    fn reject(&self, label: &str, error: CacheError) -> CacheError {
        self.recorder.record(CacheEvent::Error, label, None);
        error
    }
}
