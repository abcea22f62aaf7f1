//! Resilience Module
//!
//! Fault-tolerance primitives wrapped around every backing-store call:
//! a bounded [`RetryPolicy`] per call and a shared [`CircuitBreaker`] that
//! fails fast once the store is known to be down.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{Backoff, RetryError, RetryPolicy};
