//! Cache Module
//!
//! The cache-aside engine and its building blocks: the wire codec, the
//! recorder contract and a counting recorder.

mod codec;
mod engine;
mod recorder;
mod stats;


// Re-export public types
pub use codec::{Codec, CodecError, COMPRESSION_MARKER, DEFAULT_MAX_UNCOMPRESSED_SIZE};
pub use engine::{CacheEngine, MAX_TTL_SECONDS};
pub use recorder::{CacheEvent, NoopRecorder, Recorder, TracingRecorder};
pub use stats::{CacheStats, StatsRecorder};
