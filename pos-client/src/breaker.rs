//! Circuit breaker for outbound POS API calls
//!
//! Explicit stateful breaker composed around every HTTP call: after a run
//! of consecutive infrastructure failures the breaker opens and calls fail
//! fast without touching the network, then a single half-open trial decides
//! whether to close again. 4xx responses are legitimate answers from the
//! API and never count as failures.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Open after this many consecutive failures
const FAILURE_THRESHOLD: u32 = 5;
/// Stay open this long before allowing a trial call
const COOL_DOWN: Duration = Duration::from_secs(30);

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow normally
    Closed,
    /// Calls fail fast until the cool-down elapses
    Open,
    /// One trial call is allowed through
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open: bool,
}

/// Stateful circuit breaker shared by all requests of one client
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    threshold: u32,
    cool_down: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(FAILURE_THRESHOLD, COOL_DOWN)
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cool_down: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                consecutive_failures: 0,
                opened_at: None,
                half_open: false,
            }),
            threshold,
            cool_down,
        }
    }

    /// Current state, for observability and tests
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.opened_at {
            None => BreakerState::Closed,
            Some(at) if at.elapsed() >= self.cool_down || inner.half_open => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
        }
    }

    /// Ask permission to make a call.
    ///
    /// Returns false while open; while half-open, admits exactly one trial
    /// call until its outcome is recorded.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.opened_at {
            None => true,
            Some(at) if at.elapsed() >= self.cool_down => {
                if inner.half_open {
                    false
                } else {
                    inner.half_open = true;
                    true
                }
            }
            Some(_) => false,
        }
    }

    /// Record a successful call (or a definitive 4xx answer): closes the
    /// breaker and resets the failure run.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.half_open = false;
    }

    /// Record an infrastructure failure (network error, 5xx, 429)
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures += 1;
        if inner.opened_at.is_some() || inner.consecutive_failures >= self.threshold {
            // Failed trial or threshold reached: (re)open the cool-down
            inner.opened_at = Some(Instant::now());
            inner.half_open = false;
        }
    }
}
