use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use super::client::{Outcome, ServiceUrls, TrafficClient};
use super::scenario::{Scenario, ScenarioMix};
use super::stats::{TrafficRunStats, TrafficStats};
use super::TrafficError;

const PRODUCT_IDS: RangeInclusive<u32> = 1..=12;
const USER_IDS: RangeInclusive<u32> = 1..=50;
const MISSING_PRODUCT_ID: u32 = 9999;
const MAX_TRACKED_ORDERS: usize = 100;

const SEARCH_TERMS: &[&str] = &[
    "wireless", "keyboard", "usb", "stand", "notebook", "monitor", "pen", "cable", "webcam",
    "electronics", "desk", "ergonomic",
];
const CATEGORIES: &[&str] = &["electronics", "accessories", "stationery"];
const SORTS: &[&str] = &["price_asc", "price_desc", "rating", "popularity", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Iterations(u64),
    /// Run until the shutdown future resolves
    Continuous,
}

#[derive(Debug, Clone)]
pub struct TrafficConfig {
    pub urls: ServiceUrls,
    pub mode: RunMode,
    /// Pause between iterations
    pub delay: Duration,
    pub verbose: bool,
    pub seed: Option<u64>,
    pub burst_size: usize,
    /// Health check and progress report every N iterations
    pub report_every: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            urls: ServiceUrls::default(),
            mode: RunMode::Iterations(50),
            delay: Duration::from_secs(1),
            verbose: false,
            seed: None,
            burst_size: 10,
            report_every: 10,
        }
    }
}

/// Reachability of each service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHealth {
    pub products: bool,
    pub orders: bool,
    pub shipping: bool,
}

impl ServiceHealth {
    pub fn any_up(&self) -> bool {
        self.products || self.orders || self.shipping
    }
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |up: bool| if up { "up" } else { "down" };
        write!(
            f,
            "products={} orders={} shipping={}",
            label(self.products),
            label(self.orders),
            label(self.shipping)
        )
    }
}

/// Drives weighted random shopper scenarios against the storefront
pub struct TrafficGenerator {
    client: TrafficClient,
    config: TrafficConfig,
    mix: ScenarioMix,
    rng: StdRng,
    stats: Arc<TrafficStats>,
    placed_orders: Vec<u64>,
}

impl TrafficGenerator {
    pub fn new(config: TrafficConfig) -> Result<Self, TrafficError> {
        let client = TrafficClient::new(config.urls.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            client,
            config,
            mix: ScenarioMix::default(),
            rng,
            stats: Arc::new(TrafficStats::new()),
            placed_orders: Vec::new(),
        })
    }

    pub fn with_mix(mut self, mix: ScenarioMix) -> Self {
        self.mix = mix;
        self
    }

    /// Shared counters, readable while the run is in progress
    pub fn stats(&self) -> Arc<TrafficStats> {
        Arc::clone(&self.stats)
    }

    pub async fn health_check(&self) -> ServiceHealth {
        let urls = self.client.urls();
        let (products, orders, shipping) = tokio::join!(
            self.client.is_healthy(&urls.products),
            self.client.is_healthy(&urls.orders),
            self.client.is_healthy(&urls.shipping),
        );

        let health = ServiceHealth {
            products,
            orders,
            shipping,
        };
        if products && orders && shipping {
            tracing::debug!(%health, "Health check passed");
        } else {
            tracing::warn!(%health, "Service health degraded");
        }
        health
    }

    /// Fail unless at least one service answers its health check
    pub async fn preflight(&self) -> Result<ServiceHealth, TrafficError> {
        let health = self.health_check().await;
        if health.any_up() {
            return Ok(health);
        }

        let urls = self.client.urls();
        Err(TrafficError::NoServiceReachable {
            products: urls.products.clone(),
            orders: urls.orders.clone(),
            shipping: urls.shipping.clone(),
        })
    }

    /// Run until the iteration budget is spent or `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F) -> TrafficRunStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut iteration: u64 = 0;

        tracing::info!(mode = ?self.config.mode, delay_ms = self.config.delay.as_millis() as u64, "Starting traffic");

        loop {
            if let RunMode::Iterations(limit) = self.config.mode {
                if iteration >= limit {
                    break;
                }
            }
            iteration += 1;
            self.stats.record_iteration();

            let scenario = self.mix.pick(&mut self.rng);
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(iteration, "Interrupted, stopping traffic");
                    break;
                }
                _ = self.run_scenario(scenario) => {}
            }

            if self.config.report_every > 0 && iteration % self.config.report_every == 0 {
                self.stats.record_health_check();
                self.health_check().await;
                self.report_progress(iteration);
            }

            if !self.config.delay.is_zero() {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::info!(iteration, "Interrupted, stopping traffic");
                        break;
                    }
                    _ = tokio::time::sleep(self.config.delay) => {}
                }
            }
        }

        self.stats.snapshot()
    }

    pub async fn run_scenario(&mut self, scenario: Scenario) {
        tracing::debug!(scenario = scenario.as_str(), "Running scenario");
        match scenario {
            Scenario::Browse => self.browse().await,
            Scenario::Search => self.search().await,
            Scenario::PlaceOrder => self.place_order().await,
            Scenario::CheckOrderStatus => self.check_order_status().await,
            Scenario::TriggerError => self.trigger_error().await,
            Scenario::Burst => self.burst().await,
        }
    }

    fn report_progress(&self, iteration: u64) {
        let snap = self.stats.snapshot();
        tracing::info!(
            iteration,
            requests = snap.requests,
            errors = snap.errors,
            successful_orders = snap.successful_orders,
            failed_orders = snap.failed_orders,
            "Progress"
        );
    }

    fn random_user(&mut self) -> String {
        format!("user-{}", self.rng.gen_range(USER_IDS))
    }

    fn record(&self, outcome: &Outcome) {
        self.stats.record_response(outcome.is_success());

        let latency_ms = outcome.latency.as_millis() as u64;
        if self.config.verbose {
            tracing::info!(
                method = outcome.method,
                url = %outcome.url,
                status = %outcome.status_label(),
                latency_ms,
                "Request"
            );
        } else {
            tracing::debug!(
                method = outcome.method,
                url = %outcome.url,
                status = %outcome.status_label(),
                latency_ms,
                "Request"
            );
        }
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    async fn browse(&mut self) {
        let user = self.random_user();
        let base = self.config.urls.products.clone();

        let mut params = Vec::new();
        if self.rng.gen_bool(0.5) {
            if let Some(category) = CATEGORIES.choose(&mut self.rng) {
                params.push(format!("category={}", category));
            }
        }
        if self.rng.gen_bool(0.5) {
            if let Some(sort) = SORTS.choose(&mut self.rng) {
                params.push(format!("sort={}", sort));
            }
        }
        let list_url = if params.is_empty() {
            format!("{}/api/products", base)
        } else {
            format!("{}/api/products?{}", base, params.join("&"))
        };
        let list = self.client.get(list_url, &user).await;
        self.record(&list);

        let id = self.rng.gen_range(PRODUCT_IDS);
        let detail = self
            .client
            .get(format!("{}/api/products/{}", base, id), &user)
            .await;
        self.record(&detail);
        if detail.is_success() {
            self.stats.record_product_view();
        }

        if self.rng.gen_bool(0.3) {
            let reviews = self
                .client
                .get(format!("{}/api/products/{}/reviews", base, id), &user)
                .await;
            self.record(&reviews);
        }
        if self.rng.gen_bool(0.2) {
            let recommendations = self
                .client
                .get(format!("{}/api/products/{}/recommendations", base, id), &user)
                .await;
            self.record(&recommendations);
        }
    }

    async fn search(&mut self) {
        let user = self.random_user();
        let term = SEARCH_TERMS.choose(&mut self.rng).copied().unwrap_or("wireless");
        let url = format!("{}/api/products/search?q={}", self.config.urls.products, term);

        self.stats.record_search();
        let outcome = self.client.get(url, &user).await;
        self.record(&outcome);
    }

    async fn place_order(&mut self) {
        let user = self.random_user();
        let product_id = self.rng.gen_range(PRODUCT_IDS);
        let quantity: u32 = self.rng.gen_range(1..=3);
        let body = serde_json::json!({
            "product_id": product_id,
            "quantity": quantity,
            "user_id": user,
        });

        let outcome = self
            .client
            .post(format!("{}/api/orders", self.config.urls.orders), &body, &user)
            .await;
        self.record(&outcome);

        let order_id = outcome
            .body
            .as_ref()
            .and_then(|b| b.get("id"))
            .and_then(|id| id.as_u64());

        match (outcome.is_success(), order_id) {
            (true, Some(order_id)) => {
                self.stats.record_order(true);
                self.placed_orders.push(order_id);
                if self.placed_orders.len() > MAX_TRACKED_ORDERS {
                    self.placed_orders.remove(0);
                }
                tracing::debug!(order_id, product_id, quantity, "Order placed");
            }
            (true, None) => self.stats.record_order(true),
            (false, _) => {
                self.stats.record_order(false);
                tracing::debug!(
                    product_id,
                    quantity,
                    status = %outcome.status_label(),
                    "Order failed"
                );
            }
        }
    }

    async fn check_order_status(&mut self) {
        let user = self.random_user();
        let base = self.config.urls.orders.clone();

        let url = match self.placed_orders.choose(&mut self.rng) {
            Some(order_id) => format!("{}/api/orders/{}/track", base, order_id),
            None => format!("{}/api/orders/user/{}", base, user),
        };
        let outcome = self.client.get(url, &user).await;
        self.record(&outcome);
    }

    /// Deliberately hit failure paths: unknown product, oversized purchase, failing endpoint
    async fn trigger_error(&mut self) {
        let user = self.random_user();
        let products = self.config.urls.products.clone();

        let outcome = match self.rng.gen_range(0..3) {
            0 => {
                self.client
                    .get(
                        format!("{}/api/products/{}", products, MISSING_PRODUCT_ID),
                        &user,
                    )
                    .await
            }
            1 => {
                let body = serde_json::json!({ "quantity": 10_000 });
                self.client
                    .post(format!("{}/api/products/3/purchase", products), &body, &user)
                    .await
            }
            _ => {
                self.client
                    .get(format!("{}/api/error", self.config.urls.shipping), &user)
                    .await
            }
        };
        self.record(&outcome);
    }

    /// Fire a batch of concurrent product reads from one client
    async fn burst(&mut self) {
        let user = self.random_user();
        let ids: Vec<u32> = (0..self.config.burst_size)
            .map(|_| self.rng.gen_range(PRODUCT_IDS))
            .collect();

        let requests = ids.iter().map(|id| {
            self.client.get(
                format!("{}/api/products/{}", self.config.urls.products, id),
                &user,
            )
        });
        let outcomes = join_all(requests).await;
        self.stats.record_burst();

        let mut ok = 0;
        for outcome in &outcomes {
            self.record(outcome);
            if outcome.is_success() {
                ok += 1;
                self.stats.record_product_view();
            }
        }
        tracing::info!(size = outcomes.len(), ok, "Burst complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        build_orders_router, build_products_router, build_shipping_router, OrdersState,
        ProductsState, ShippingState,
    };
    use crate::config::ProductsConfig;
    use crate::orders::UpstreamClient;
    use crate::resilience::FaultInjector;
    use crate::shipping::ShippingService;
    use axum::Router;
    use tokio::net::TcpListener;

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn storefront() -> (ServiceUrls, Arc<ProductsState>) {
        let faults = Arc::new(FaultInjector::disabled(3));
        let products = Arc::new(ProductsState::new(
            ProductsConfig::quiet(),
            Arc::clone(&faults),
        ));
        let products_url = spawn(build_products_router(Arc::clone(&products))).await;
        let shipping_url = spawn(build_shipping_router(Arc::new(ShippingState {
            service: ShippingService::new(Arc::clone(&faults)),
        })))
        .await;

        let upstream = UpstreamClient::new(&products_url, &shipping_url).unwrap();
        let orders_url =
            spawn(build_orders_router(Arc::new(OrdersState::new(upstream, faults)))).await;

        (
            ServiceUrls::new(&products_url, &orders_url, &shipping_url),
            products,
        )
    }

    fn config(urls: ServiceUrls, iterations: u64) -> TrafficConfig {
        TrafficConfig {
            urls,
            mode: RunMode::Iterations(iterations),
            delay: Duration::ZERO,
            seed: Some(42),
            ..Default::default()
        }
    }

    fn only(scenario: Scenario) -> ScenarioMix {
        ScenarioMix::new(&[(scenario, 1)]).unwrap()
    }

    #[tokio::test]
    async fn test_mixed_run() {
        let (urls, _) = storefront().await;
        let mut generator = TrafficGenerator::new(config(urls, 30)).unwrap();

        generator.preflight().await.unwrap();
        let stats = generator.run(std::future::pending()).await;

        assert_eq!(stats.iterations, 30);
        assert_eq!(stats.health_checks, 3);
        assert!(stats.requests >= 30);
        assert_eq!(stats, generator.stats().snapshot());
    }

    #[tokio::test]
    async fn test_orders_scenario() {
        let (urls, products) = storefront().await;
        let mut generator = TrafficGenerator::new(config(urls, 5))
            .unwrap()
            .with_mix(only(Scenario::PlaceOrder));

        let stats = generator.run(std::future::pending()).await;

        assert_eq!(stats.successful_orders, 5);
        assert_eq!(stats.failed_orders, 0);
        assert_eq!(stats.errors, 0);
        assert_eq!(products.metrics.snapshot().purchases, 5);
        assert_eq!(generator.placed_orders, vec![1001, 1002, 1003, 1004, 1005]);

        generator.run_scenario(Scenario::CheckOrderStatus).await;
        assert_eq!(generator.stats().snapshot().errors, 0);
    }

    #[tokio::test]
    async fn test_error_scenario_counts_failures() {
        let (urls, _) = storefront().await;
        let mut generator = TrafficGenerator::new(config(urls, 6))
            .unwrap()
            .with_mix(only(Scenario::TriggerError));

        let stats = generator.run(std::future::pending()).await;
        assert_eq!(stats.requests, 6);
        assert_eq!(stats.errors, 6);
    }

    #[tokio::test]
    async fn test_burst_scenario() {
        let (urls, _) = storefront().await;
        let mut generator = TrafficGenerator::new(config(urls, 2))
            .unwrap()
            .with_mix(only(Scenario::Burst));

        let stats = generator.run(std::future::pending()).await;
        assert_eq!(stats.bursts, 2);
        assert_eq!(stats.requests, 20);
        assert_eq!(stats.products_viewed, 20);
    }

    #[tokio::test]
    async fn test_continuous_run_stops_on_shutdown() {
        let (urls, _) = storefront().await;
        let mut generator = TrafficGenerator::new(TrafficConfig {
            mode: RunMode::Continuous,
            delay: Duration::from_millis(10),
            ..config(urls, 0)
        })
        .unwrap();

        let shutdown = tokio::time::sleep(Duration::from_millis(300));
        let stats = tokio::time::timeout(Duration::from_secs(10), generator.run(shutdown))
            .await
            .expect("run should stop after shutdown");
        assert_eq!(stats, generator.stats().snapshot());
    }

    #[tokio::test]
    async fn test_preflight_fails_when_nothing_is_up() {
        let urls = ServiceUrls::new("http://127.0.0.1:9", "http://127.0.0.1:9", "http://127.0.0.1:9");
        let generator = TrafficGenerator::new(config(urls, 1)).unwrap();

        let err = generator.preflight().await.unwrap_err();
        assert!(matches!(err, TrafficError::NoServiceReachable { .. }));
    }

    #[test]
    fn test_health_display() {
        let health = ServiceHealth {
            products: true,
            orders: false,
            shipping: true,
        };
        assert!(health.any_up());
        assert_eq!(health.to_string(), "products=up orders=down shipping=up");
    }
}
