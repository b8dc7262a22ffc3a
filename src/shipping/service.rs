use chrono::Utc;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

use super::model::{Shipment, ShipmentStatus, ShippingMethod, ShippingQuote, ShippingRequest};
use crate::catalog::round_cents;
use crate::resilience::{FaultInjector, LatencyRange};

const CARRIERS: [&str; 4] = ["FedEx", "UPS", "DHL", "USPS"];

/// Shipping cost in USD, rounded to cents
pub fn calculate_cost(request: &ShippingRequest) -> f64 {
    let weight = if request.total_weight > 0.0 {
        request.total_weight
    } else {
        1.0
    };
    let mut cost = 5.99 + weight * 0.50;

    cost *= match request.method() {
        ShippingMethod::Standard => 1.0,
        ShippingMethod::Express => 1.5,
        ShippingMethod::Overnight => 2.5,
    };

    let international = request
        .destination_country
        .as_deref()
        .map(|c| !c.eq_ignore_ascii_case("US") && !c.eq_ignore_ascii_case("USA"))
        .unwrap_or(false);
    if international {
        cost += 15.00;
    }

    round_cents(cost)
}

pub fn select_carrier<R: Rng + ?Sized>(method: ShippingMethod, rng: &mut R) -> &'static str {
    match method {
        ShippingMethod::Overnight => "FedEx",
        ShippingMethod::Express => {
            if rng.gen_bool(0.5) {
                "UPS"
            } else {
                "DHL"
            }
        }
        ShippingMethod::Standard => CARRIERS.choose(rng).copied().unwrap_or("USPS"),
    }
}

pub fn delivery_days<R: Rng + ?Sized>(method: ShippingMethod, rng: &mut R) -> u32 {
    match method {
        ShippingMethod::Overnight => 1,
        ShippingMethod::Express => rng.gen_range(2..=3),
        ShippingMethod::Standard => rng.gen_range(5..=7),
    }
}

/// Advance a shipment one step with probability 1/3. Returns true if it moved.
pub fn advance_status<R: Rng + ?Sized>(shipment: &mut Shipment, rng: &mut R) -> bool {
    let Some(next) = shipment.status.next() else {
        return false;
    };
    if !rng.gen_ratio(1, 3) {
        return false;
    }

    shipment.status = next;
    shipment.current_location = next.location().to_string();
    shipment.last_update = Utc::now();
    true
}

fn short_id(prefix: &str, len: usize) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", prefix, &id[..len])
}

/// Shipment registry with simulated processing delays
pub struct ShippingService {
    shipments: DashMap<String, Shipment>,
    faults: Arc<FaultInjector>,
}

impl ShippingService {
    pub fn new(faults: Arc<FaultInjector>) -> Self {
        Self {
            shipments: DashMap::new(),
            faults,
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn shipment_count(&self) -> usize {
        self.shipments.len()
    }

    pub async fn quote(&self, request: &ShippingRequest) -> ShippingQuote {
        self.faults.delay(LatencyRange::new(50, 200)).await;

        let method = request.method();
        let (carrier, days) = self
            .faults
            .with_rng(|rng| (select_carrier(method, rng), delivery_days(method, rng)));

        ShippingQuote {
            quote_id: short_id("QT", 8),
            order_id: request.order_id.clone(),
            cost: calculate_cost(request),
            currency: "USD".to_string(),
            estimated_days: days,
            carrier: carrier.to_string(),
            shipping_method: method,
        }
    }

    pub async fn create(&self, order_id: &str, request: &ShippingRequest) -> Shipment {
        self.faults.delay(LatencyRange::new(100, 300)).await;

        let method = request.method();
        let (carrier, days) = self
            .faults
            .with_rng(|rng| (select_carrier(method, rng), delivery_days(method, rng)));
        let now = Utc::now();

        let shipment = Shipment {
            tracking_id: short_id("TRK", 12),
            order_id: order_id.to_string(),
            status: ShipmentStatus::Pending,
            current_location: "Awaiting pickup".to_string(),
            last_update: now,
            estimated_delivery: now + chrono::Duration::days(days as i64),
            carrier: carrier.to_string(),
        };

        self.shipments
            .insert(shipment.tracking_id.clone(), shipment.clone());
        shipment
    }

    /// Look up a shipment, possibly advancing its status
    pub async fn track(&self, tracking_id: &str) -> Option<Shipment> {
        self.faults.delay(LatencyRange::new(20, 100)).await;

        let mut shipment = self.shipments.get_mut(tracking_id)?;
        self.faults.with_rng(|rng| advance_status(&mut shipment, rng));
        Some(shipment.clone())
    }

    pub async fn by_order(&self, order_id: &str) -> Option<Shipment> {
        self.faults.delay(LatencyRange::new(30, 150)).await;

        let mut shipment = self
            .shipments
            .iter_mut()
            .find(|entry| entry.order_id == order_id)?;
        self.faults.with_rng(|rng| advance_status(&mut shipment, rng));
        Some(shipment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(method: Option<ShippingMethod>, weight: f64, country: Option<&str>) -> ShippingRequest {
        ShippingRequest {
            order_id: Some("1001".into()),
            total_weight: weight,
            destination_country: country.map(String::from),
            shipping_method: method,
            ..Default::default()
        }
    }

    #[test]
    fn test_calculate_cost() {
        // 5.99 + 2 * 0.5
        assert_eq!(calculate_cost(&request(None, 2.0, Some("US"))), 6.99);
        // Weight defaults to 1.0
        assert_eq!(calculate_cost(&request(None, 0.0, None)), 6.49);
        // 5.99 + 0.02 * 0.5 = 6.00 before the method multiplier
        assert_eq!(
            calculate_cost(&request(Some(ShippingMethod::Express), 0.02, Some("usa"))),
            9.0
        );
        assert_eq!(
            calculate_cost(&request(Some(ShippingMethod::Overnight), 0.02, None)),
            15.0
        );
        // International surcharge
        assert_eq!(calculate_cost(&request(None, 2.0, Some("DE"))), 21.99);
    }

    #[test]
    fn test_carrier_and_days() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_eq!(select_carrier(ShippingMethod::Overnight, &mut rng), "FedEx");
            assert!(["UPS", "DHL"].contains(&select_carrier(ShippingMethod::Express, &mut rng)));
            assert!(CARRIERS.contains(&select_carrier(ShippingMethod::Standard, &mut rng)));

            assert_eq!(delivery_days(ShippingMethod::Overnight, &mut rng), 1);
            assert!((2..=3).contains(&delivery_days(ShippingMethod::Express, &mut rng)));
            assert!((5..=7).contains(&delivery_days(ShippingMethod::Standard, &mut rng)));
        }
    }

    #[test]
    fn test_status_progresses_to_delivered() {
        let mut rng = StdRng::seed_from_u64(8);
        let now = Utc::now();
        let mut shipment = Shipment {
            tracking_id: "TRK-TEST".into(),
            order_id: "1".into(),
            status: ShipmentStatus::Pending,
            current_location: "Awaiting pickup".into(),
            last_update: now,
            estimated_delivery: now,
            carrier: "UPS".into(),
        };

        let mut seen = vec![shipment.status];
        for _ in 0..500 {
            if advance_status(&mut shipment, &mut rng) {
                seen.push(shipment.status);
            }
        }

        assert_eq!(seen, ShipmentStatus::SEQUENCE.to_vec());
        assert!(!advance_status(&mut shipment, &mut rng));
        assert_eq!(shipment.current_location, "In Transit - Highway I-95");
    }

    #[tokio::test]
    async fn test_create_and_track() {
        let service = ShippingService::new(Arc::new(FaultInjector::disabled(1)));
        let shipment = service
            .create("1001", &request(Some(ShippingMethod::Overnight), 1.0, None))
            .await;

        assert!(shipment.tracking_id.starts_with("TRK-"));
        assert_eq!(shipment.tracking_id.len(), 16);
        assert_eq!(shipment.carrier, "FedEx");
        assert_eq!(shipment.status, ShipmentStatus::Pending);

        let tracked = service.track(&shipment.tracking_id).await.unwrap();
        assert_eq!(tracked.order_id, "1001");
        assert!(service.by_order("1001").await.is_some());
        assert!(service.track("TRK-UNKNOWN").await.is_none());
        assert!(service.by_order("9999").await.is_none());
    }

    #[tokio::test]
    async fn test_quote() {
        let service = ShippingService::new(Arc::new(FaultInjector::disabled(2)));
        let quote = service
            .quote(&request(Some(ShippingMethod::Express), 0.02, Some("US")))
            .await;

        assert!(quote.quote_id.starts_with("QT-"));
        assert_eq!(quote.quote_id.len(), 11);
        assert_eq!(quote.cost, 9.0);
        assert_eq!(quote.currency, "USD");
        assert!((2..=3).contains(&quote.estimated_days));
    }
}
