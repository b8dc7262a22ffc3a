//! Service configuration
//!
//! Everything is read from environment variables; unset or unparsable
//! values fall back to the defaults below.

use std::time::Duration;

use crate::resilience::{CircuitBreakerConfig, LatencyRange, RateLimitConfig};

/// Tunables for the products service
#[derive(Debug, Clone)]
pub struct ProductsConfig {
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
    pub rate_limit: RateLimitConfig,
    pub breaker: CircuitBreakerConfig,
    /// Latency of the simulated database lookup
    pub data_latency: LatencyRange,
    /// Probability that the simulated database lookup fails
    pub data_failure_rate: f64,
    pub payment_latency: LatencyRange,
    /// Probability that the payment step is declined
    pub payment_failure_rate: f64,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            cache_max_entries: 10_000,
            rate_limit: RateLimitConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            data_latency: LatencyRange::new(20, 150),
            data_failure_rate: 0.02,
            payment_latency: LatencyRange::new(50, 300),
            payment_failure_rate: 0.05,
        }
    }
}

impl ProductsConfig {
    /// No latency, no injected failures
    pub fn quiet() -> Self {
        Self {
            data_latency: LatencyRange::zero(),
            data_failure_rate: 0.0,
            payment_latency: LatencyRange::zero(),
            payment_failure_rate: 0.0,
            ..Default::default()
        }
    }
}

/// Server configuration for all three services
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub products_port: u16,
    pub orders_port: u16,
    pub shipping_port: u16,
    /// Base URL Orders uses to reach Products
    pub products_url: String,
    /// Base URL Orders uses to reach Shipping
    pub shipping_url: String,
    pub products: ProductsConfig,
    pub faults_enabled: bool,
    pub seed: Option<u64>,
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            products_port: 3001,
            orders_port: 5001,
            shipping_port: 8080,
            products_url: "http://127.0.0.1:3001".to_string(),
            shipping_url: "http://127.0.0.1:8080".to_string(),
            products: ProductsConfig::default(),
            faults_enabled: true,
            seed: None,
            sweep_interval_secs: 60,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl ServerConfig {
    /// Build a config from environment variables
    ///
    /// STOREFRONT_HOST=0.0.0.0
    /// PRODUCTS_PORT=3001 ORDERS_PORT=5001 SHIPPING_PORT=8080
    /// PRODUCTS_URL=http://127.0.0.1:3001 SHIPPING_URL=http://127.0.0.1:8080
    /// STOREFRONT_CACHE_TTL_SECS=30
    /// STOREFRONT_RATE_LIMIT=100 STOREFRONT_RATE_WINDOW_SECS=60
    /// STOREFRONT_BREAKER_THRESHOLD=5 STOREFRONT_BREAKER_COOLDOWN_SECS=30
    /// STOREFRONT_FAULTS=on|off
    /// STOREFRONT_SEED=1234
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("STOREFRONT_HOST").unwrap_or(defaults.host);
        let products_port = env_parse("PRODUCTS_PORT").unwrap_or(defaults.products_port);
        let orders_port = env_parse("ORDERS_PORT").unwrap_or(defaults.orders_port);
        let shipping_port = env_parse("SHIPPING_PORT").unwrap_or(defaults.shipping_port);

        let products_url = std::env::var("PRODUCTS_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{}", products_port));
        let shipping_url = std::env::var("SHIPPING_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{}", shipping_port));

        let mut products = ProductsConfig::default();
        if let Some(secs) = env_parse::<u64>("STOREFRONT_CACHE_TTL_SECS") {
            products.cache_ttl = Duration::from_secs(secs.max(1));
        }
        if let Some(max) = env_parse::<u32>("STOREFRONT_RATE_LIMIT") {
            products.rate_limit.max_requests = max;
        }
        if let Some(secs) = env_parse::<u64>("STOREFRONT_RATE_WINDOW_SECS") {
            products.rate_limit.window = Duration::from_secs(secs.max(1));
        }
        if let Some(threshold) = env_parse::<u32>("STOREFRONT_BREAKER_THRESHOLD") {
            products.breaker.failure_threshold = threshold.max(1);
        }
        if let Some(secs) = env_parse::<u64>("STOREFRONT_BREAKER_COOLDOWN_SECS") {
            products.breaker.cooldown = Duration::from_secs(secs);
        }

        let faults_enabled = std::env::var("STOREFRONT_FAULTS")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "off" | "false" | "0"))
            .unwrap_or(true);

        Self {
            host,
            products_port,
            orders_port,
            shipping_port,
            products_url,
            shipping_url,
            products,
            faults_enabled,
            seed: env_parse("STOREFRONT_SEED"),
            sweep_interval_secs: defaults.sweep_interval_secs,
        }
    }
}
