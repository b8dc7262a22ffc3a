//! Circuit breaker guarding the simulated data-access path
//!
//! ```text
//!   closed --(threshold consecutive failures)--> open
//!   open   --(cooldown elapsed, next check)----> half_open (one trial)
//!   half_open --success--> closed
//!   half_open --failure--> open
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::HalfOpen => write!(f, "half_open"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    pub failure_threshold: u32,
    /// Time spent open before a trial call is admitted
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_transition: Instant,
    trial_in_flight: bool,
    times_opened: u64,
    rejected: u64,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_transition: Instant::now(),
                trial_in_flight: false,
                times_opened: 0,
                rejected: 0,
            }),
        }
    }

    /// Whether a call may proceed. Performs the open -> half_open transition.
    pub fn allow_request(&self) -> bool {
        self.allow_request_at(Instant::now())
    }

    pub fn allow_request_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        let since = now.saturating_duration_since(inner.last_transition);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open if since > self.config.cooldown => {
                inner.state = CircuitState::HalfOpen;
                inner.last_transition = now;
                inner.trial_in_flight = true;
                tracing::info!(breaker = %self.name, "Circuit breaker: open -> half_open");
                true
            }
            // A trial that never reported back (served from cache, dropped
            // connection) is released after another cooldown.
            CircuitState::HalfOpen if !inner.trial_in_flight || since > self.config.cooldown => {
                inner.trial_in_flight = true;
                inner.last_transition = now;
                true
            }
            CircuitState::Open | CircuitState::HalfOpen => {
                inner.rejected += 1;
                false
            }
        }
    }

    pub fn record_success(&self) {
        self.record_success_at(Instant::now())
    }

    pub fn record_success_at(&self, now: Instant) {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.trial_in_flight = false;
                inner.last_transition = now;
                tracing::info!(breaker = %self.name, "Circuit breaker: half_open -> closed");
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now())
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    Self::trip(&mut inner, now);
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        "Circuit breaker tripped: closed -> open"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.consecutive_failures += 1;
                Self::trip(&mut inner, now);
                tracing::warn!(
                    breaker = %self.name,
                    "Circuit breaker trial failed: half_open -> open"
                );
            }
            // Late failures from calls admitted before the trip do not extend the cooldown
            CircuitState::Open => {}
        }
    }

    fn trip(inner: &mut BreakerInner, now: Instant) {
        inner.state = CircuitState::Open;
        inner.last_transition = now;
        inner.trial_in_flight = false;
        inner.times_opened += 1;
    }

    /// Current state, without applying time-based transitions
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            cooldown_secs: self.config.cooldown.as_secs(),
            seconds_in_state: inner.last_transition.elapsed().as_secs(),
            times_opened: inner.times_opened,
            rejected: inner.rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub seconds_in_state: u64,
    pub times_opened: u64,
    pub rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("catalog-db", CircuitBreakerConfig::default())
    }

    fn trip(breaker: &CircuitBreaker, at: Instant) {
        for _ in 0..5 {
            breaker.record_failure_at(at);
        }
    }

    #[test]
    fn test_starts_closed() {
        let b = breaker();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
        assert!(b.allow_request());
    }

    #[test]
    fn test_opens_after_threshold() {
        let b = breaker();
        let now = Instant::now();

        for _ in 0..4 {
            b.record_failure_at(now);
            assert_eq!(b.state(), CircuitState::Closed);
        }
        b.record_failure_at(now);
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.allow_request_at(now));
    }

    #[test]
    fn test_success_resets_failures_when_closed() {
        let b = breaker();
        let now = Instant::now();

        for _ in 0..4 {
            b.record_failure_at(now);
        }
        b.record_success_at(now);
        assert_eq!(b.consecutive_failures(), 0);

        for _ in 0..4 {
            b.record_failure_at(now);
        }
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn test_rejects_until_cooldown_then_single_trial() {
        let b = breaker();
        let opened = Instant::now();
        trip(&b, opened);

        assert!(!b.allow_request_at(opened + Duration::from_secs(10)));
        assert!(!b.allow_request_at(opened + Duration::from_secs(30)));

        let after = opened + Duration::from_secs(31);
        assert!(b.allow_request_at(after));
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(!b.allow_request_at(after));
        assert!(!b.allow_request_at(after + Duration::from_secs(1)));

        assert_eq!(b.snapshot().rejected, 4);
    }

    #[test]
    fn test_half_open_success_closes() {
        let b = breaker();
        let opened = Instant::now();
        trip(&b, opened);

        let trial = opened + Duration::from_secs(31);
        assert!(b.allow_request_at(trial));
        b.record_success_at(trial);

        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
        assert!(b.allow_request_at(trial));
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let b = breaker();
        let opened = Instant::now();
        trip(&b, opened);

        let trial = opened + Duration::from_secs(31);
        assert!(b.allow_request_at(trial));
        b.record_failure_at(trial);

        assert_eq!(b.state(), CircuitState::Open);
        // Cooldown restarts from the failed trial
        assert!(!b.allow_request_at(trial + Duration::from_secs(20)));
        assert!(b.allow_request_at(trial + Duration::from_secs(31)));
        assert_eq!(b.snapshot().times_opened, 2);
    }

    #[test]
    fn test_unreported_trial_is_released() {
        let b = breaker();
        let opened = Instant::now();
        trip(&b, opened);

        let trial = opened + Duration::from_secs(31);
        assert!(b.allow_request_at(trial));
        assert!(!b.allow_request_at(trial + Duration::from_secs(5)));
        assert!(b.allow_request_at(trial + Duration::from_secs(31)));
        assert_eq!(b.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "closed");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
        assert_eq!(CircuitState::Open.to_string(), "open");
    }
}
