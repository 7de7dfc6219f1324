use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::VenueId;

/// Runtime circuit state for one upstream venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Per-venue breaker. After `failure_threshold` consecutive failures calls are
/// short-circuited until `open_timeout` elapses; then one probe is let through
/// and other callers stay rejected until it reports back. A probe that never
/// reports (its caller was dropped) is replaced after another `open_timeout`.
#[derive(Debug)]
pub struct CircuitBreaker {
    venue: VenueId,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(venue: VenueId, config: CircuitBreakerConfig) -> Self {
        Self {
            venue,
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    // State stays consistent across a panicking holder, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        // In half-open, `opened_at` marks when the probe went out.
        let timer_elapsed = inner
            .opened_at
            .map(|since| since.elapsed() >= self.config.open_timeout)
            .unwrap_or(false);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open | CircuitState::HalfOpen if timer_elapsed => {
                inner.state = CircuitState::HalfOpen;
                inner.opened_at = Some(Instant::now());
                true
            }
            CircuitState::Open | CircuitState::HalfOpen => false,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let reopen = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if reopen && inner.state != CircuitState::Open {
            warn!(
                venue = %self.venue,
                failures = inner.consecutive_failures,
                "circuit breaker opened"
            );
        }
        if reopen {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn venue(&self) -> VenueId {
        self.venue
    }
}
