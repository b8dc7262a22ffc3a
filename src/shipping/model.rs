use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Overnight,
}

impl ShippingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingMethod::Standard => "standard",
            ShippingMethod::Express => "express",
            ShippingMethod::Overnight => "overnight",
        }
    }
}

/// Shipment lifecycle, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
}

impl ShipmentStatus {
    pub const SEQUENCE: [ShipmentStatus; 5] = [
        ShipmentStatus::Pending,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
    ];

    fn index(&self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// The following status, or `None` once delivered
    pub fn next(&self) -> Option<ShipmentStatus> {
        Self::SEQUENCE.get(self.index() + 1).copied()
    }

    pub fn location(&self) -> &'static str {
        const LOCATIONS: [&str; 5] = [
            "Distribution Center - New York",
            "Sorting Facility - Chicago",
            "Regional Hub - Los Angeles",
            "Local Delivery Center",
            "In Transit - Highway I-95",
        ];
        LOCATIONS[self.index().min(LOCATIONS.len() - 1)]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    #[serde(default)]
    pub destination_city: Option<String>,
    #[serde(default)]
    pub destination_country: Option<String>,
    #[serde(default)]
    pub destination_zip_code: Option<String>,
    #[serde(default)]
    pub total_weight: f64,
    #[serde(default)]
    pub item_count: u32,
    #[serde(default)]
    pub shipping_method: Option<ShippingMethod>,
}

impl ShippingRequest {
    pub fn method(&self) -> ShippingMethod {
        self.shipping_method.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub quote_id: String,
    pub order_id: Option<String>,
    pub cost: f64,
    pub currency: String,
    pub estimated_days: u32,
    pub carrier: String,
    pub shipping_method: ShippingMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub tracking_id: String,
    pub order_id: String,
    pub status: ShipmentStatus,
    pub current_location: String,
    pub last_update: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub carrier: String,
}
