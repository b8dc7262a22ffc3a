//! Synthetic traffic generator
//!
//! Each iteration draws a weighted random [`Scenario`] and issues the matching
//! HTTP calls against the Products, Orders and Shipping services. Failures
//! are counted, never fatal.

pub mod client;
pub mod runner;
pub mod scenario;
pub mod stats;

pub use client::{Outcome, ServiceUrls, TrafficClient};
pub use runner::{RunMode, ServiceHealth, TrafficConfig, TrafficGenerator};
pub use scenario::{Scenario, ScenarioMix, DEFAULT_WEIGHTS};
pub use stats::{TrafficRunStats, TrafficStats};

#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Invalid scenario mix: {0}")]
    InvalidMix(String),

    #[error("No service reachable (products: {products}, orders: {orders}, shipping: {shipping})")]
    NoServiceReachable {
        products: String,
        orders: String,
        shipping: String,
    },
}
