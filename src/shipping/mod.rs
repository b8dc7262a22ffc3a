//! Shipping quotes, shipment creation and tracking

pub mod model;
pub mod service;

pub use model::{Shipment, ShipmentStatus, ShippingMethod, ShippingQuote, ShippingRequest};
pub use service::{calculate_cost, ShippingService};
