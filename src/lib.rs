//! Storefront: a simulated e-commerce backend for observability demos
//!
//! Three small HTTP services share one process:
//!
//! - **Products** (catalog, search, reviews, purchase) guarded by a fixed-window
//!   rate limiter, a circuit breaker and a TTL response cache
//! - **Orders**, which places orders by calling Products and Shipping over HTTP
//! - **Shipping**, with quotes, shipment creation and status tracking
//!
//! Latency and failures are injected on purpose so that dashboards have
//! something to show. The `traffic` binary drives all three services with
//! weighted random shopper scenarios.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront::api::{build_products_router, ProductsState};
//! use storefront::config::ProductsConfig;
//! use storefront::resilience::FaultInjector;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let state = Arc::new(ProductsState::new(
//!     ProductsConfig::default(),
//!     Arc::new(FaultInjector::new(None)),
//! ));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, build_products_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod resilience;
pub mod shipping;
pub mod telemetry;
pub mod traffic;

// Re-export commonly used types
pub use api::{run_server, ApiError};
pub use catalog::{CatalogError, CatalogStore, Product};
pub use config::{ProductsConfig, ServerConfig};
pub use resilience::{CircuitBreaker, FaultInjector, RateLimiter, ResponseCache};
pub use traffic::{TrafficConfig, TrafficGenerator, TrafficRunStats};
