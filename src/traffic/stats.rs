use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for a traffic run
#[derive(Debug, Default)]
pub struct TrafficStats {
    iterations: AtomicU64,
    requests: AtomicU64,
    errors: AtomicU64,
    successful_orders: AtomicU64,
    failed_orders: AtomicU64,
    products_viewed: AtomicU64,
    searches: AtomicU64,
    health_checks: AtomicU64,
    bursts: AtomicU64,
}

impl TrafficStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a response; anything outside 2xx, including transport failures, is an error
    pub fn record_response(&self, success: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_order(&self, success: bool) {
        if success {
            self.successful_orders.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_orders.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_product_view(&self) {
        self.products_viewed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_check(&self) {
        self.health_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_burst(&self) {
        self.bursts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TrafficRunStats {
        TrafficRunStats {
            iterations: self.iterations.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            successful_orders: self.successful_orders.load(Ordering::Relaxed),
            failed_orders: self.failed_orders.load(Ordering::Relaxed),
            products_viewed: self.products_viewed.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            health_checks: self.health_checks.load(Ordering::Relaxed),
            bursts: self.bursts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficRunStats {
    pub iterations: u64,
    pub requests: u64,
    pub errors: u64,
    pub successful_orders: u64,
    pub failed_orders: u64,
    pub products_viewed: u64,
    pub searches: u64,
    pub health_checks: u64,
    pub bursts: u64,
}

impl TrafficRunStats {
    pub fn order_success_rate(&self) -> f64 {
        let total = self.successful_orders + self.failed_orders;
        if total == 0 {
            0.0
        } else {
            self.successful_orders as f64 / total as f64
        }
    }
}

impl fmt::Display for TrafficRunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Traffic summary")?;
        writeln!(f, "  Iterations:        {}", self.iterations)?;
        writeln!(f, "  Requests:          {}", self.requests)?;
        writeln!(f, "  Errors:            {}", self.errors)?;
        writeln!(f, "  Products viewed:   {}", self.products_viewed)?;
        writeln!(f, "  Searches:          {}", self.searches)?;
        writeln!(f, "  Bursts:            {}", self.bursts)?;
        writeln!(f, "  Health checks:     {}", self.health_checks)?;
        writeln!(f, "  Successful orders: {}", self.successful_orders)?;
        writeln!(f, "  Failed orders:     {}", self.failed_orders)?;
        write!(
            f,
            "  Order success:     {:.1}%",
            self.order_success_rate() * 100.0
        )
    }
}
