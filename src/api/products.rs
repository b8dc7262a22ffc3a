use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiPath, ApiQuery};
use crate::catalog::query::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::catalog::{
    generate_reviews, CatalogError, CatalogStore, ListParams, Product, ProductQuery,
};
use crate::config::ProductsConfig;
use crate::resilience::{CircuitBreaker, CircuitState, FaultInjector, RateLimiter, ResponseCache};
use crate::telemetry::{AbandonReason, ShopMetrics};

const RECOMMENDATION_LIMIT: usize = 3;

/// Shared state of the products service
pub struct ProductsState {
    pub catalog: CatalogStore,
    pub cache: ResponseCache,
    pub limiter: Arc<RateLimiter>,
    pub breaker: CircuitBreaker,
    pub faults: Arc<FaultInjector>,
    pub metrics: ShopMetrics,
    pub config: ProductsConfig,
}

impl ProductsState {
    pub fn new(config: ProductsConfig, faults: Arc<FaultInjector>) -> Self {
        Self::with_catalog(CatalogStore::seeded(), config, faults)
    }

    pub fn with_catalog(
        catalog: CatalogStore,
        config: ProductsConfig,
        faults: Arc<FaultInjector>,
    ) -> Self {
        Self {
            catalog,
            cache: ResponseCache::with_config(config.cache_max_entries, config.cache_ttl),
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            breaker: CircuitBreaker::new("products-data", config.breaker.clone()),
            faults,
            metrics: ShopMetrics::new(),
            config,
        }
    }

    fn check_breaker(&self) -> Result<(), ApiError> {
        if self.breaker.allow_request() {
            return Ok(());
        }
        self.metrics.record_breaker_rejection();
        Err(ApiError::ServiceUnavailable(
            "Product service temporarily unavailable".to_string(),
        ))
    }

    /// Simulated database round trip; an injected failure counts against the breaker
    async fn simulate_data_access(&self) -> Result<(), ApiError> {
        self.faults.delay(self.config.data_latency).await;

        if self.faults.should_fail(self.config.data_failure_rate) {
            self.metrics.record_injected_failure();
            self.breaker.record_failure();
            return Err(ApiError::Internal("Database connection timeout".to_string()));
        }

        self.breaker.record_success();
        Ok(())
    }

    /// Breaker, then cache, then the simulated data layer
    async fn guarded_read<F>(&self, key: String, load: F) -> Result<Response, ApiError>
    where
        F: FnOnce(&ProductsState) -> Result<serde_json::Value, ApiError>,
    {
        self.check_breaker()?;

        if let Some(cached) = self.cache.get(&key) {
            return Ok(cache_response(cached, true));
        }

        self.simulate_data_access().await?;
        let value = load(self)?;
        self.cache.set(key, value.clone());
        Ok(cache_response(value, false))
    }

    fn abandon(&self, reason: AbandonReason, product_id: u32, value_at_risk: f64) {
        self.metrics
            .record_abandonment(reason, product_id, value_at_risk);
    }
}

fn cache_response(value: serde_json::Value, hit: bool) -> Response {
    let header = if hit { "HIT" } else { "MISS" };
    ([("x-cache", header)], Json(value)).into_response()
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Rate-limit key: explicit client id, then forwarded address, then peer address
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    header("x-client-id")
        .or_else(|| header("x-forwarded-for"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit(
    State(state): State<Arc<ProductsState>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(request.headers(), peer);

    if !state.limiter.allow(&key) {
        state.metrics.record_rate_limited();
        tracing::warn!(client = %key, "Rate limit exceeded");
        let config = state.limiter.config();
        return ApiError::TooManyRequests(format!(
            "Rate limit exceeded: {} requests per {}s",
            config.max_requests,
            config.window.as_secs()
        ))
        .into_response();
    }

    next.run(request).await
}

// ============================================================================
// Catalog reads
// ============================================================================

pub async fn list_products(
    State(state): State<Arc<ProductsState>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Response, ApiError> {
    let query = ProductQuery::try_from(params)?;
    let key = query.cache_key();

    state
        .guarded_read(key, move |s| to_json(&s.catalog.list(&query)))
        .await
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<Product>,
}

pub async fn search_products(
    State(state): State<Arc<ProductsState>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Response, ApiError> {
    let needle = params.q.unwrap_or_default().trim().to_lowercase();
    if needle.is_empty() {
        return Err(ApiError::BadRequest(
            "Query parameter 'q' is required".to_string(),
        ));
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let key = format!("products:search:{}:{}", needle, limit);

    state
        .guarded_read(key, move |s| {
            let results = s.catalog.search(&needle, limit);
            to_json(&SearchResponse {
                query: needle,
                count: results.len(),
                results,
            })
        })
        .await
}

pub async fn get_product(
    State(state): State<Arc<ProductsState>>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Response, ApiError> {
    state
        .guarded_read(format!("product:{}", id), move |s| {
            let product = s.catalog.get(id).ok_or(CatalogError::NotFound(id))?;
            to_json(&product)
        })
        .await
}

pub async fn product_reviews(
    State(state): State<Arc<ProductsState>>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Response, ApiError> {
    state
        .guarded_read(format!("reviews:{}", id), move |s| {
            let product = s.catalog.get(id).ok_or(CatalogError::NotFound(id))?;
            let summary = s.faults.with_rng(|rng| generate_reviews(&product, rng));
            to_json(&summary)
        })
        .await
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub product_id: u32,
    pub recommendations: Vec<Product>,
}

pub async fn product_recommendations(
    State(state): State<Arc<ProductsState>>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Response, ApiError> {
    state
        .guarded_read(format!("recommendations:{}", id), move |s| {
            let recommendations = s.catalog.recommendations(id, RECOMMENDATION_LIMIT)?;
            to_json(&RecommendationsResponse {
                product_id: id,
                recommendations,
            })
        })
        .await
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub product_id: u32,
    pub name: String,
    pub stock: u32,
    pub in_stock: bool,
}

pub async fn inventory(
    State(state): State<Arc<ProductsState>>,
    ApiPath(id): ApiPath<u32>,
) -> Result<Response, ApiError> {
    state
        .guarded_read(inventory_key(id), move |s| {
            let product = s.catalog.get(id).ok_or(CatalogError::NotFound(id))?;
            to_json(&InventoryResponse {
                product_id: product.id,
                in_stock: product.in_stock(),
                stock: product.stock,
                name: product.name,
            })
        })
        .await
}

fn inventory_key(id: u32) -> String {
    format!("inventory:{}", id)
}

// ============================================================================
// Purchase
// ============================================================================

/// Quantity named by a purchase body. An empty body or a missing `quantity`
/// means 1; anything else that is not an integer comes back as `Err` with
/// the offending text.
fn requested_quantity(body: &[u8]) -> Result<i64, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(1);
    }

    let request: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("malformed body ({})", e))?;
    let fields = request
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", request))?;

    match fields.get("quantity") {
        None | Some(serde_json::Value::Null) => Ok(1),
        Some(value) => value.as_i64().ok_or_else(|| value.to_string()),
    }
}

/// Body is parsed by hand so that a malformed quantity still reaches the
/// abandonment accounting below
pub async fn purchase(
    State(state): State<Arc<ProductsState>>,
    ApiPath(id): ApiPath<u32>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let requested = requested_quantity(&body);
    let value_at_risk = || {
        let quantity = requested.as_ref().map(|q| (*q).max(0)).unwrap_or(0);
        state
            .catalog
            .get(id)
            .map(|p| p.price * quantity as f64)
            .unwrap_or(0.0)
    };

    if let Err(err) = state.check_breaker() {
        state.abandon(AbandonReason::ServiceUnavailable, id, value_at_risk());
        return Err(err);
    }

    if let Err(err) = state.simulate_data_access().await {
        state.abandon(AbandonReason::DatabaseError, id, value_at_risk());
        return Err(err);
    }

    let Some(product) = state.catalog.get(id) else {
        state.abandon(AbandonReason::ProductNotFound, id, 0.0);
        return Err(CatalogError::NotFound(id).into());
    };

    let quantity = match &requested {
        Ok(q) => u32::try_from(*q).ok().filter(|q| *q >= 1),
        Err(_) => None,
    };
    let Some(quantity) = quantity else {
        state.abandon(AbandonReason::InvalidQuantity, id, 0.0);
        let shown = match requested {
            Ok(q) => q.to_string(),
            Err(raw) => raw,
        };
        return Err(ApiError::BadRequest(format!("Invalid quantity: {}", shown)));
    };
    let order_value = product.price * quantity as f64;

    if product.stock < quantity {
        state.abandon(AbandonReason::InsufficientStock, id, order_value);
        return Err(CatalogError::InsufficientStock {
            product_id: id,
            requested: quantity,
            available: product.stock,
        }
        .into());
    }

    state.faults.delay(state.config.payment_latency).await;
    if state.faults.should_fail(state.config.payment_failure_rate) {
        state.abandon(AbandonReason::PaymentDeclined, id, order_value);
        return Err(ApiError::PaymentDeclined(
            "Payment declined by processor".to_string(),
        ));
    }

    // Stock may have moved while the payment was in flight
    let receipt = match state.catalog.purchase(id, quantity) {
        Ok(receipt) => receipt,
        Err(err) => {
            state.abandon(AbandonReason::InsufficientStock, id, order_value);
            return Err(err.into());
        }
    };

    state.cache.invalidate(&format!("product:{}", id));
    state.cache.invalidate(&inventory_key(id));
    state
        .metrics
        .record_purchase(id, quantity, receipt.total_price);

    Ok(Json(receipt).into_response())
}

// ============================================================================
// Health & stats
// ============================================================================

pub async fn health(State(state): State<Arc<ProductsState>>) -> Json<serde_json::Value> {
    let breaker = state.breaker.snapshot();
    let status = if breaker.state == CircuitState::Closed {
        "healthy"
    } else {
        "degraded"
    };

    Json(serde_json::json!({
        "status": status,
        "service": "products",
        "products": state.catalog.len(),
        "dependencies": {
            "database": breaker,
            "cache": state.cache.stats(),
        },
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn stats(State(state): State<Arc<ProductsState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "cache": state.cache.stats(),
        "rate_limiter": state.limiter.stats(),
        "circuit_breaker": state.breaker.snapshot(),
        "business": state.metrics.snapshot(),
    }))
}
