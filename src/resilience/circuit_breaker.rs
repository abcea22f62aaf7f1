//! Circuit Breaker
//!
//! Guards the backing store during an outage. Three states:
//! Closed (calls pass), Open (calls fail fast), HalfOpen (one trial call
//! decides whether to close again or re-open).
//!
//! ```text
//! Closed   --failures >= threshold-->  Open
//! Open     --reset_timeout elapsed-->  HalfOpen
//! HalfOpen --trial succeeds------->   Closed
//! HalfOpen --trial fails---------->   Open (timer restarts)
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// == Circuit State ==
/// Operational mode of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, all calls pass through
    Closed,
    /// Failing fast, no calls reach the backing store
    Open,
    /// Probing recovery with a single trial call
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

// == Circuit Breaker Config ==
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive exhausted operations that trip the breaker
    pub failure_threshold: u32,
    /// Time spent Open before a trial is allowed; `None` latches Open until
    /// a success is recorded explicitly
    pub reset_timeout: Option<Duration>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 1,
            reset_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failed_attempts: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

// == Circuit Breaker ==
/// Shared failure guard. All transitions happen under one short-lived lock
/// that is never held across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failed_attempts: 0,
                last_failure: None,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state, without triggering the Open -> HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.inner.lock().failed_attempts
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.inner.lock().last_failure
    }

    // == Allow ==
    /// Returns whether a call may proceed.
    ///
    /// In HalfOpen only the first caller gets the trial slot; everyone else
    /// is rejected until that trial reports back. Callers that may be
    /// cancelled mid-call should use [`CircuitBreaker::acquire`] instead.
    pub fn allow(&self) -> bool {
        self.admit().is_some()
    }

    // == Acquire ==
    /// Like [`CircuitBreaker::allow`], but returns a permit that reports the
    /// outcome and hands the trial slot back if dropped unresolved.
    pub fn acquire(&self) -> Option<CallPermit<'_>> {
        self.admit().map(|trial| CallPermit {
            breaker: self,
            trial,
            resolved: false,
        })
    }

    /// Admission check. `Some(true)` means the caller holds the HalfOpen trial.
    fn admit(&self) -> Option<bool> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => {
                let elapsed = match (self.config.reset_timeout, inner.opened_at) {
                    (Some(timeout), Some(opened_at)) => opened_at.elapsed() >= timeout,
                    _ => false,
                };
                if elapsed {
                    info!("Circuit breaker half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Some(true)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(true)
                }
            }
        }
    }

    /// Frees the HalfOpen trial slot without recording an outcome.
    fn release_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen && inner.trial_in_flight {
            debug!("Circuit breaker trial abandoned, releasing slot");
            inner.trial_in_flight = false;
        }
    }

    // == Record Success ==
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!(previous = %inner.state, "Circuit breaker closed");
        }
        inner.state = CircuitState::Closed;
        inner.failed_attempts = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    // == Record Failure ==
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.failed_attempts = inner.failed_attempts.saturating_add(1);
        inner.last_failure = Some(now);

        match inner.state {
            CircuitState::HalfOpen => {
                warn!("Circuit breaker trial failed, re-opening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.trial_in_flight = false;
            }
            CircuitState::Closed if inner.failed_attempts >= self.config.failure_threshold => {
                warn!(
                    failed_attempts = inner.failed_attempts,
                    threshold = self.config.failure_threshold,
                    "Circuit breaker opened"
                );
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
            }
            _ => {
                debug!(failed_attempts = inner.failed_attempts, "Circuit breaker failure recorded");
            }
        }
    }
}

// == Call Permit ==
/// Admission handed out by [`CircuitBreaker::acquire`].
///
/// Resolve it with [`CallPermit::succeed`] or [`CallPermit::fail`]. A trial
/// permit dropped unresolved, for example because the caller's future was
/// cancelled, releases the trial slot so the next caller can probe.
#[must_use = "an unresolved permit records no outcome"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl CallPermit<'_> {
    /// True when this permit holds the HalfOpen trial slot.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn succeed(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    pub fn fail(mut self) {
        self.resolved = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.resolved {
            self.breaker.release_trial();
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
