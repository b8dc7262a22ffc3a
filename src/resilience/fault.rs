//! Simulated latency and failure injection
//!
//! Every random decision made by the services goes through a [`FaultInjector`]
//! so that tests can seed it, or switch faults off entirely.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Decide whether an operation should fail with the given probability.
///
/// Probabilities at or below 0 never fail, at or above 1 always fail.
pub fn should_fail<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    rng.gen_bool(probability)
}

/// Inclusive latency range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draw a duration from the range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        if hi == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

/// Source of simulated latency, failures and other random choices
pub struct FaultInjector {
    rng: Mutex<StdRng>,
    enabled: bool,
}

impl FaultInjector {
    /// Create an injector; a seed makes every draw reproducible
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            enabled: true,
        }
    }

    /// An injector that never sleeps and never fails.
    ///
    /// Non-fault randomness (carrier choice, review text) still works.
    pub fn disabled(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            enabled: false,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Roll for an injected failure
    pub fn should_fail(&self, probability: f64) -> bool {
        if !self.enabled {
            return false;
        }
        should_fail(&mut *self.rng.lock(), probability)
    }

    /// Draw a latency without sleeping
    pub fn latency(&self, range: LatencyRange) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        range.sample(&mut *self.rng.lock())
    }

    /// Sleep for a latency drawn from the range and return it
    pub async fn delay(&self, range: LatencyRange) -> Duration {
        let latency = self.latency(range);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        latency
    }

    /// Run a closure with exclusive access to the random source
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.lock())
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new(None)
    }
}
