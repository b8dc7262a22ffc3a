//! In-process resilience primitives used by the products service
//!
//! Request path: rate limiter -> circuit breaker -> response cache -> data access.

pub mod cache;
pub mod circuit_breaker;
pub mod fault;
pub mod rate_limit;

pub use cache::{CacheStats, ResponseCache};
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use fault::{should_fail, FaultInjector, LatencyRange};
pub use rate_limit::{RateLimitConfig, RateLimitStats, RateLimiter};
