//! Backing Store Module
//!
//! The primary key-value store sitting behind the cache engine. Any client
//! offering get / set-with-TTL / delete / flush can be plugged in.

mod memory;
mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

// == Store Error ==
/// Transport-level failures raised by a backing store.
///
/// A missing key is never a `StoreError`; it is reported as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or the connection dropped
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The call did not complete within its deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// The store answered with an error reply
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Convenience Result type for backing store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Backing Store Trait ==
/// Raw string operations the engine needs from its backing store.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetches the raw payload for `key`, `None` when the key is absent.
    async fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key` for `ttl_seconds`.
    async fn set_raw(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete_raw(&self, key: &str) -> StoreResult<()>;

    /// Removes every key beginning with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;

    /// Removes every key in the store.
    async fn flush_all(&self) -> StoreResult<()>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}
