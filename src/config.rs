//! Configuration Module
//!
//! Handles loading engine and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_UNCOMPRESSED_SIZE;
use crate::resilience::{Backoff, CircuitBreakerConfig, RetryPolicy};

// == Backoff Kind ==
/// Retry delay schedule selected by `RETRY_BACKOFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    /// Exponential with jitter
    Exponential,
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(format!("unknown backoff kind: {}", other)),
        }
    }
}

// == Engine Config ==
/// Options recognized by the cache engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// TTL in seconds applied when a set omits one
    pub default_ttl: u64,
    /// JSON payloads larger than this many bytes are compressed
    pub max_uncompressed_size: usize,
    /// Attempts per backing-store call, including the first
    pub max_retry_attempts: u32,
    /// Fixed delay, or initial delay for exponential backoff
    pub retry_delay_ms: u64,
    pub retry_backoff: BackoffKind,
    /// Cap for exponential backoff
    pub retry_max_delay_ms: u64,
    /// Exhausted operations that open the circuit breaker
    pub circuit_failure_threshold: u32,
    /// Time the breaker stays open before a trial call; 0 disables recovery
    pub circuit_reset_timeout_ms: u64,
    /// Deadline for each individual backing-store attempt
    pub operation_timeout_ms: u64,
}

impl EngineConfig {
    /// Loads engine options from the environment.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `MAX_UNCOMPRESSED_SIZE` - Compression threshold in bytes (default: 1 MiB)
    /// - `MAX_RETRY_ATTEMPTS` - Attempts per store call (default: 3)
    /// - `RETRY_DELAY_MS` - Delay between attempts (default: 1000)
    /// - `RETRY_BACKOFF` - `fixed` or `exponential` (default: fixed)
    /// - `RETRY_MAX_DELAY_MS` - Exponential backoff cap (default: 10000)
    /// - `CIRCUIT_FAILURE_THRESHOLD` - Failures before opening (default: 1)
    /// - `CIRCUIT_RESET_TIMEOUT_MS` - Open duration before a trial (default: 30000)
    /// - `OPERATION_TIMEOUT_MS` - Per-attempt deadline (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            max_uncompressed_size: env_or("MAX_UNCOMPRESSED_SIZE", defaults.max_uncompressed_size),
            max_retry_attempts: env_or("MAX_RETRY_ATTEMPTS", defaults.max_retry_attempts),
            retry_delay_ms: env_or("RETRY_DELAY_MS", defaults.retry_delay_ms),
            retry_backoff: env_or("RETRY_BACKOFF", defaults.retry_backoff),
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            circuit_failure_threshold: env_or(
                "CIRCUIT_FAILURE_THRESHOLD",
                defaults.circuit_failure_threshold,
            ),
            circuit_reset_timeout_ms: env_or(
                "CIRCUIT_RESET_TIMEOUT_MS",
                defaults.circuit_reset_timeout_ms,
            ),
            operation_timeout_ms: env_or("OPERATION_TIMEOUT_MS", defaults.operation_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_millis(self.retry_delay_ms);
        let backoff = match self.retry_backoff {
            BackoffKind::Fixed => Backoff::Fixed(delay),
            BackoffKind::Exponential => Backoff::Exponential {
                initial: delay,
                max: Duration::from_millis(self.retry_max_delay_ms),
                jitter: true,
            },
        };
        RetryPolicy::new(self.max_retry_attempts, backoff)
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_failure_threshold.max(1),
            reset_timeout: match self.circuit_reset_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            max_uncompressed_size: DEFAULT_MAX_UNCOMPRESSED_SIZE,
            max_retry_attempts: 3,
            retry_delay_ms: 1000,
            retry_backoff: BackoffKind::Fixed,
            retry_max_delay_ms: 10_000,
            circuit_failure_threshold: 1,
            circuit_reset_timeout_ms: 30_000,
            operation_timeout_ms: 2000,
        }
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Redis connection URL; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// In-memory store purge interval in seconds
    pub cleanup_interval: u64,
    pub engine: EngineConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REDIS_URL` - Redis URL (default: unset, in-memory store)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 1)
    /// - plus everything read by [`EngineConfig::from_env`]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            engine: EngineConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            redis_url: None,
            cleanup_interval: 1,
            engine: EngineConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
