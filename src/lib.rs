//! Cache Aside - A resilient caching layer in front of a key-value store
//!
//! Provides JSON serialization with size-triggered compression, bounded
//! retry, a circuit breaker and TTL-scoped entries over Redis or memory.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheEngine;
pub use config::{Config, EngineConfig};
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;
