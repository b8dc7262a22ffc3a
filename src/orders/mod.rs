//! Order placement and tracking on top of the Products and Shipping services

pub mod client;
pub mod model;
pub mod store;

pub use client::{UpstreamClient, UpstreamError};
pub use model::{CreateOrderRequest, NewOrder, Order, OrderStatus};
pub use store::OrderStore;
