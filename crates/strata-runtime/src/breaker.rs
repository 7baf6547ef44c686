//! Per-connection circuit breaker.
//!
//! Every edge of a composite's connection graph carries a
//! [`CircuitBreaker`]. After `failure_threshold` consecutive failures
//! the breaker opens and calls fail fast without reaching the target.
//! Once the cool-down has elapsed a single trial call is let through:
//! success closes the breaker, failure opens it again.
//!
//! ```text
//!            failures ≥ threshold
//!   Closed ───────────────────────► Open
//!     ▲                              │ cool-down elapsed
//!     │ trial ok                     ▼
//!     └────────────────────────── HalfOpen ──trial failed──► Open
//! ```
//!
//! The state, counters and timer share one lock, so a racing caller
//! can never see a re-opened breaker as closed or let a second trial
//! through while the first is in flight.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker. Values below 1 act as 1.
    pub failure_threshold: u32,
    /// Time an open breaker waits before allowing a trial call.
    pub cool_down_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cool_down_ms: 5_000,
        }
    }
}

impl BreakerConfig {
    #[must_use]
    pub fn new(failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            failure_threshold,
            cool_down_ms: u64::try_from(cool_down.as_millis()).unwrap_or(u64::MAX),
        }
    }

    #[must_use]
    pub fn cool_down(&self) -> Duration {
        Duration::from_millis(self.cool_down_ms)
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected until the cool-down elapses.
    Open,
    /// One trial call is allowed through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Counters reported by [`CircuitBreaker::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub trips: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    total_calls: u64,
    total_failures: u64,
    rejected_calls: u64,
    trips: u64,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
            total_calls: 0,
            total_failures: 0,
            rejected_calls: 0,
            trips: 0,
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_in_flight = false;
        self.trips += 1;
    }
}

/// Failure-tripped gate for one connection.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use strata_runtime::breaker::{BreakerConfig, CircuitBreaker, CircuitState};
///
/// let breaker = CircuitBreaker::new("a->b", BreakerConfig::new(2, Duration::from_secs(60)));
///
/// assert!(breaker.try_acquire());
/// breaker.record_failure();
/// assert!(breaker.try_acquire());
/// breaker.record_failure();
///
/// assert_eq!(breaker.state(), CircuitState::Open);
/// assert!(!breaker.try_acquire());
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    label: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(label: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            label: label.into(),
            config,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Current state. An open breaker stays `Open` here until a call
    /// arrives after the cool-down.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Asks to pass one call through.
    ///
    /// Returns `false` while open or while a half-open trial is in
    /// flight. A `true` answer must be followed by exactly one
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        let allowed = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cool_down());
                if cooled {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    debug!(breaker = %self.label, "cool-down elapsed, allowing trial call");
                }
                cooled
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
        };

        if allowed {
            inner.total_calls += 1;
        } else {
            inner.rejected_calls += 1;
        }
        allowed
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.trial_in_flight = false;
                inner.opened_at = None;
                info!(breaker = %self.label, "trial call succeeded, circuit closed");
            }
            CircuitState::Open => {
                debug!(breaker = %self.label, "success recorded while circuit open");
            }
        }
    }

    /// Records a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_failures += 1;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold.max(1) {
                    inner.open();
                    warn!(
                        breaker = %self.label,
                        failures = inner.consecutive_failures,
                        "circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.open();
                warn!(breaker = %self.label, "trial call failed, circuit re-opened");
            }
            CircuitState::Open => {}
        }
    }

    /// Closes the breaker and clears the failure streak.
    ///
    /// Lifetime counters are kept.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        info!(breaker = %self.label, "circuit reset");
    }

    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock();
        BreakerStats {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            rejected_calls: inner.rejected_calls,
            trips: inner.trips,
        }
    }
}
