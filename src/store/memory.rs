//! In-Memory Store Module
//!
//! A process-local backing store with per-entry TTL. Serves as the test double
//! for the engine and as the fallback when no Redis URL is configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{BackingStore, StoreResult};

// == Stored Entry ==
/// A raw payload together with its expiry deadline.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    /// `None` when the TTL reaches past what the clock can represent
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn new(value: String, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(Duration::from_secs(ttl_seconds)),
        }
    }

    /// An entry is expired once the current time reaches its deadline.
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(deadline) if Instant::now() >= deadline)
    }
}

// == Memory Store ==
/// HashMap-backed store. Expired entries are invisible to reads and are
/// physically removed by [`MemoryStore::cleanup_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let entry = StoredEntry::new(value.to_string(), ttl_seconds);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = (before - entries.len()) as u64;
        debug!(prefix = prefix, removed = removed, "Memory store prefix delete");
        Ok(removed)
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
