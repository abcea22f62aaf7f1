//! Cache Statistics Module
//!
//! A [`Recorder`] that counts engine outcomes with atomic counters, so it can
//! be shared by every concurrent caller without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::recorder::{CacheEvent, Recorder};

// == Cache Stats ==
/// Point-in-time snapshot of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub clears: u64,
    pub errors: u64,
    /// Entries that failed to decode and were served as misses
    pub corrupt: u64,
    /// Non-outcome warnings, e.g. compression fallbacks
    pub warnings: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses + corrupt), or 0.0 if no reads were made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.corrupt;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    clears: AtomicU64,
    errors: AtomicU64,
    corrupt: AtomicU64,
    warnings: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
        }
    }

    fn counter(&self, event: CacheEvent) -> &AtomicU64 {
        match event {
            CacheEvent::Hit => &self.hits,
            CacheEvent::Miss => &self.misses,
            CacheEvent::Set => &self.sets,
            CacheEvent::Delete => &self.deletes,
            CacheEvent::Clear => &self.clears,
            CacheEvent::Error => &self.errors,
            CacheEvent::Corrupt => &self.corrupt,
        }
    }
}

impl Recorder for StatsRecorder {
    fn record(&self, event: CacheEvent, _label: &str, _value: Option<f64>) {
        self.counter(event).fetch_add(1, Ordering::Relaxed);
    }

    fn warn(&self, _label: &str, _message: &str) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }
}
