//! Storefront Server
//!
//! Run with: cargo run
//!
//! Starts the Products, Orders and Shipping services in one process.
//!
//! Environment variables:
//! - STOREFRONT_HOST: Bind address (default: 0.0.0.0)
//! - PRODUCTS_PORT / ORDERS_PORT / SHIPPING_PORT: Ports (default: 3001 / 5001 / 8080)
//! - PRODUCTS_URL / SHIPPING_URL: Upstreams used by Orders (default: the local services)
//! - STOREFRONT_CACHE_TTL_SECS: Response cache TTL (default: 30)
//! - STOREFRONT_RATE_LIMIT / STOREFRONT_RATE_WINDOW_SECS: Requests per window (default: 100 per 60s)
//! - STOREFRONT_BREAKER_THRESHOLD / STOREFRONT_BREAKER_COOLDOWN_SECS: Circuit breaker (default: 5, 30s)
//! - STOREFRONT_FAULTS: Set to `off` to disable injected latency and failures
//! - STOREFRONT_SEED: Seed for injected randomness
//! - RUST_LOG: Log level (default: info)

use storefront::config::ServerConfig;
use storefront::run_server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let products = &config.products;

    tracing::info!("Storefront configuration:");
    tracing::info!("  Host: {}", config.host);
    tracing::info!(
        "  Ports: products={} orders={} shipping={}",
        config.products_port,
        config.orders_port,
        config.shipping_port
    );
    tracing::info!("  Upstreams: products={} shipping={}", config.products_url, config.shipping_url);
    tracing::info!("  Cache TTL: {} seconds", products.cache_ttl.as_secs());
    tracing::info!(
        "  Rate limit: {} requests per {} seconds",
        products.rate_limit.max_requests,
        products.rate_limit.window.as_secs()
    );
    tracing::info!(
        "  Circuit breaker: {} failures, {} second cooldown",
        products.breaker.failure_threshold,
        products.breaker.cooldown.as_secs()
    );
    tracing::info!(
        "  Fault injection: {}",
        if config.faults_enabled { "ENABLED" } else { "DISABLED" }
    );
    if let Some(seed) = config.seed {
        tracing::info!("  Seed: {}", seed);
    }

    println!(
        r#"
  ____  _                  __                 _
 / ___|| |_ ___  _ __ ___ / _|_ __ ___  _ __ | |_
 \___ \| __/ _ \| '__/ _ \ |_| '__/ _ \| '_ \| __|
  ___) | || (_) | | |  __/  _| | | (_) | | | | |_
 |____/ \__\___/|_|  \___|_| |_|  \___/|_| |_|\__|

 Simulated storefront: products, orders, shipping
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
