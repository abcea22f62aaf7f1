//! Recorder Module
//!
//! The observability sink the engine reports to. The engine emits exactly one
//! outcome event per public call; backends decide what to do with it.

use serde::Serialize;
use tracing::{debug, warn};

// == Cache Event ==
/// Outcome of a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEvent {
    Hit,
    Miss,
    Set,
    Delete,
    Clear,
    Error,
    /// A stored payload could not be decoded and was served as a miss
    Corrupt,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Hit => "hit",
            CacheEvent::Miss => "miss",
            CacheEvent::Set => "set",
            CacheEvent::Delete => "delete",
            CacheEvent::Clear => "clear",
            CacheEvent::Error => "error",
            CacheEvent::Corrupt => "corrupt",
        }
    }
}

impl std::fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Recorder Trait ==
/// Sink for engine events.
///
/// `label` is usually the cache key; `value` carries an optional measurement
/// such as payload size or attempt count.
pub trait Recorder: Send + Sync {
    fn record(&self, event: CacheEvent, label: &str, value: Option<f64>);

    /// Non-outcome diagnostics, e.g. a compression fallback.
    fn warn(&self, _label: &str, _message: &str) {}
}

// == Noop Recorder ==
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn record(&self, _event: CacheEvent, _label: &str, _value: Option<f64>) {}
}

// == Tracing Recorder ==
/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&self, event: CacheEvent, label: &str, value: Option<f64>) {
        debug!(event = %event, label = label, value = ?value, "Cache event");
    }

    fn warn(&self, label: &str, message: &str) {
        warn!(label = label, "{}", message);
    }
}
