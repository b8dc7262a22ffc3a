//! Fixed-window rate limiting per client key

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Fixed-window counter per client key.
///
/// Rejected requests still count, so a client that keeps hammering stays
/// rejected until its window rolls over.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    config: RateLimitConfig,
    allowed: AtomicU64,
    rejected: AtomicU64,
    sweeping: Arc<AtomicBool>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
            allowed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            sweeping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Count a request for `client_key` and report whether it may proceed
    pub fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }

    pub fn allow_at(&self, client_key: &str, now: Instant) -> bool {
        let allowed = {
            let mut window = self
                .windows
                .entry(client_key.to_string())
                .or_insert(RateWindow {
                    count: 0,
                    window_start: now,
                });

            if now.saturating_duration_since(window.window_start) > self.config.window {
                window.count = 0;
                window.window_start = now;
            }

            window.count = window.count.saturating_add(1);
            window.count <= self.config.max_requests
        };

        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    /// Requests left in the current window for a key
    pub fn remaining_at(&self, client_key: &str, now: Instant) -> u32 {
        match self.windows.get(client_key) {
            Some(window)
                if now.saturating_duration_since(window.window_start) <= self.config.window =>
            {
                self.config.max_requests.saturating_sub(window.count)
            }
            _ => self.config.max_requests,
        }
    }

    /// Drop windows that have rolled over. Returns how many were removed.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) <= window);
        before.saturating_sub(self.windows.len())
    }

    /// Start a background task that purges expired windows
    pub fn start_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.sweeping.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Rate window sweeper started with interval {:?}", interval);

            let mut ticker = tokio::time::interval(interval);

            while self.sweeping.load(Ordering::SeqCst) {
                ticker.tick().await;

                let purged = self.purge_expired_at(Instant::now());
                if purged > 0 {
                    tracing::debug!("Purged {} expired rate windows", purged);
                }
            }

            tracing::info!("Rate window sweeper stopped");
        })
    }

    pub fn stop_sweeper(&self) {
        self.sweeping.store(false, Ordering::SeqCst);
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_clients: self.windows.len(),
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            max_requests: self.config.max_requests,
            window_secs: self.config.window.as_secs(),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RateLimitStats {
    pub tracked_clients: usize,
    pub allowed: u64,
    pub rejected: u64,
    pub max_requests: u32,
    pub window_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::default();
        let now = Instant::now();

        for n in 1..=100 {
            assert!(limiter.allow_at("client-a", now), "request {} rejected", n);
        }
        assert!(!limiter.allow_at("client-a", now));
        assert!(!limiter.allow_at("client-a", now));

        let stats = limiter.stats();
        assert_eq!(stats.allowed, 100);
        assert_eq!(stats.rejected, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        });
        let now = Instant::now();

        assert!(limiter.allow_at("a", now));
        assert!(limiter.allow_at("a", now));
        assert!(!limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
    }

    #[test]
    fn test_window_rollover_restarts_count() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
        });
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.allow_at("a", start));
        }
        assert!(!limiter.allow_at("a", start + Duration::from_secs(30)));
        // Still the same window at exactly the boundary
        assert!(!limiter.allow_at("a", start + Duration::from_secs(60)));

        let later = start + Duration::from_secs(61);
        assert!(limiter.allow_at("a", later));
        assert_eq!(limiter.remaining_at("a", later), 2);
    }

    #[test]
    fn test_purge_expired_windows() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        limiter.allow_at("old", start);
        limiter.allow_at("fresh", start + Duration::from_secs(50));

        let purged = limiter.purge_expired_at(start + Duration::from_secs(70));
        assert_eq!(purged, 1);
        assert_eq!(limiter.stats().tracked_clients, 1);
        assert_eq!(
            limiter.remaining_at("old", start + Duration::from_secs(70)),
            100
        );
    }
}
