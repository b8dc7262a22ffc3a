//! Business telemetry signals for the products service
//!
//! Counters live in-process and are exposed at `GET /stats`; each signal is
//! also emitted as a structured tracing event.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a purchase did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    ProductNotFound,
    InvalidQuantity,
    InsufficientStock,
    PaymentDeclined,
    ServiceUnavailable,
    DatabaseError,
}

impl AbandonReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbandonReason::ProductNotFound => "product_not_found",
            AbandonReason::InvalidQuantity => "invalid_quantity",
            AbandonReason::InsufficientStock => "insufficient_stock",
            AbandonReason::PaymentDeclined => "payment_declined",
            AbandonReason::ServiceUnavailable => "service_unavailable",
            AbandonReason::DatabaseError => "database_error",
        }
    }
}

#[derive(Debug, Default)]
struct AbandonCounter {
    count: AtomicU64,
    value_cents: AtomicU64,
}

#[derive(Debug, Default)]
pub struct ShopMetrics {
    purchases: AtomicU64,
    units_sold: AtomicU64,
    revenue_cents: AtomicU64,
    abandonment: DashMap<AbandonReason, AbandonCounter>,
    rate_limited: AtomicU64,
    breaker_rejections: AtomicU64,
    injected_failures: AtomicU64,
}

fn to_cents(amount: f64) -> u64 {
    (amount.max(0.0) * 100.0).round() as u64
}

impl ShopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_purchase(&self, product_id: u32, quantity: u32, total: f64) {
        self.purchases.fetch_add(1, Ordering::Relaxed);
        self.units_sold.fetch_add(quantity as u64, Ordering::Relaxed);
        self.revenue_cents.fetch_add(to_cents(total), Ordering::Relaxed);
        tracing::info!(product_id, quantity, total, "Purchase completed");
    }

    /// Cart abandonment with the monetary value that was at risk
    pub fn record_abandonment(&self, reason: AbandonReason, product_id: u32, value_at_risk: f64) {
        let counter = self.abandonment.entry(reason).or_default();
        counter.count.fetch_add(1, Ordering::Relaxed);
        counter
            .value_cents
            .fetch_add(to_cents(value_at_risk), Ordering::Relaxed);
        tracing::warn!(
            reason = reason.as_str(),
            product_id,
            value_at_risk,
            "Cart abandoned"
        );
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breaker_rejection(&self) {
        self.breaker_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injected_failure(&self) {
        self.injected_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn abandonment_count(&self, reason: AbandonReason) -> u64 {
        self.abandonment
            .get(&reason)
            .map(|c| c.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let abandonment = self
            .abandonment
            .iter()
            .map(|entry| {
                (
                    entry.key().as_str().to_string(),
                    AbandonmentStats {
                        count: entry.count.load(Ordering::Relaxed),
                        value_at_risk: entry.value_cents.load(Ordering::Relaxed) as f64 / 100.0,
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            purchases: self.purchases.load(Ordering::Relaxed),
            units_sold: self.units_sold.load(Ordering::Relaxed),
            revenue: self.revenue_cents.load(Ordering::Relaxed) as f64 / 100.0,
            abandonment,
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            breaker_rejections: self.breaker_rejections.load(Ordering::Relaxed),
            injected_failures: self.injected_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AbandonmentStats {
    pub count: u64,
    pub value_at_risk: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub purchases: u64,
    pub units_sold: u64,
    pub revenue: f64,
    pub abandonment: BTreeMap<String, AbandonmentStats>,
    pub rate_limited: u64,
    pub breaker_rejections: u64,
    pub injected_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_counters() {
        let metrics = ShopMetrics::new();
        metrics.record_purchase(1, 2, 299.98);
        metrics.record_purchase(5, 1, 12.99);

        let snap = metrics.snapshot();
        assert_eq!(snap.purchases, 2);
        assert_eq!(snap.units_sold, 3);
        assert!((snap.revenue - 312.97).abs() < 1e-9);
    }

    #[test]
    fn test_abandonment_by_reason() {
        let metrics = ShopMetrics::new();
        metrics.record_abandonment(AbandonReason::InsufficientStock, 3, 39990.0);
        metrics.record_abandonment(AbandonReason::InsufficientStock, 3, 10.0);
        metrics.record_abandonment(AbandonReason::PaymentDeclined, 1, 149.99);

        assert_eq!(metrics.abandonment_count(AbandonReason::InsufficientStock), 2);
        assert_eq!(metrics.abandonment_count(AbandonReason::DatabaseError), 0);

        let snap = metrics.snapshot();
        let stock = &snap.abandonment["insufficient_stock"];
        assert_eq!(stock.count, 2);
        assert!((stock.value_at_risk - 40000.0).abs() < 1e-9);
        assert_eq!(snap.abandonment["payment_declined"].count, 1);
    }
}
