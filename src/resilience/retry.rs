//! Retry Policy
//!
//! Bounded retry around a single backing-store call. A well-formed miss is a
//! successful result and never reaches this layer as an error.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

// == Backoff ==
/// Delay schedule between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// The same delay before every retry
    Fixed(Duration),
    /// `initial * 2^(retry - 1)`, capped at `max`. With `jitter` each delay is
    /// drawn uniformly from the upper half of that value.
    Exponential {
        initial: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Upper bound of the delay before retry number `retry` (1-based).
    pub fn ceiling(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { initial, max, .. } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                initial.saturating_mul(factor).min(*max)
            }
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry);
        match self {
            Backoff::Exponential { jitter: true, .. } if !ceiling.is_zero() => {
                let half = ceiling / 2;
                let spread = (ceiling - half).as_millis() as u64;
                half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
            }
            _ => ceiling,
        }
    }
}

// == Retry Error ==
/// All attempts failed; carries the last observed failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last: E,
}

// == Retry Policy ==
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(delay))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Worst-case time spent sleeping across one `execute` call.
    pub fn max_total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|retry| self.backoff.ceiling(retry)).sum()
    }

    // == Execute ==
    /// Runs `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// No lock is held by this policy while sleeping between attempts.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt = attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(1000))
    }
}
