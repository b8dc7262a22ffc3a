use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use crate::orders::{CreateOrderRequest, NewOrder, Order, OrderStore, UpstreamClient};
use crate::resilience::FaultInjector;
use crate::shipping::{Shipment, ShippingRequest};

pub struct OrdersState {
    pub orders: OrderStore,
    pub upstream: UpstreamClient,
    pub faults: Arc<FaultInjector>,
}

impl OrdersState {
    pub fn new(upstream: UpstreamClient, faults: Arc<FaultInjector>) -> Self {
        Self {
            orders: OrderStore::new(),
            upstream,
            faults,
        }
    }
}

/// Place an order: look up the product, purchase it, record the order and
/// try to book a shipment
pub async fn create_order(
    State(state): State<Arc<OrdersState>>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if request.quantity < 1 {
        return Err(ApiError::BadRequest(format!(
            "Invalid quantity: {}",
            request.quantity
        )));
    }
    let user_id = request.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }

    let product = state
        .upstream
        .get_product(request.product_id, &user_id)
        .await?;
    let receipt = state
        .upstream
        .purchase(product.id, request.quantity, &user_id)
        .await?;

    let order = state.orders.create(NewOrder {
        user_id: user_id.clone(),
        product_id: receipt.product_id,
        product_name: receipt.product_name,
        quantity: receipt.quantity,
        unit_price: receipt.unit_price,
        total_price: receipt.total_price,
    });
    tracing::info!(
        order_id = order.id,
        product_id = order.product_id,
        quantity = order.quantity,
        total = order.total_price,
        "Order created"
    );

    let shipping_request = ShippingRequest {
        order_id: Some(order.id.to_string()),
        user_id: Some(user_id),
        item_count: order.quantity,
        ..Default::default()
    };

    let order = match state.upstream.create_shipment(&shipping_request).await {
        Ok(shipment) => state
            .orders
            .attach_tracking(order.id, shipment.tracking_id)
            .unwrap_or(order),
        Err(e) => {
            tracing::warn!(order_id = order.id, error = %e, "Shipment creation failed");
            order
        }
    };

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<Arc<OrdersState>>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Order>, ApiError> {
    state
        .orders
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub order: Order,
    pub shipment: Option<Shipment>,
}

pub async fn track_order(
    State(state): State<Arc<OrdersState>>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<TrackResponse>, ApiError> {
    let order = state
        .faults
        .with_rng(|rng| state.orders.advance(id, rng))
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;

    let shipment = match order.tracking_id.as_deref() {
        Some(tracking_id) => match state.upstream.track_shipment(tracking_id).await {
            Ok(shipment) => Some(shipment),
            Err(e) => {
                tracing::warn!(order_id = id, error = %e, "Shipment lookup failed");
                None
            }
        },
        None => None,
    };

    Ok(Json(TrackResponse { order, shipment }))
}

#[derive(Debug, Serialize)]
pub struct UserOrdersResponse {
    pub user_id: String,
    pub count: usize,
    pub orders: Vec<Order>,
}

pub async fn user_orders(
    State(state): State<Arc<OrdersState>>,
    ApiPath(user_id): ApiPath<String>,
) -> Json<UserOrdersResponse> {
    let orders = state.orders.by_user(&user_id);
    Json(UserOrdersResponse {
        user_id,
        count: orders.len(),
        orders,
    })
}

pub async fn health(State(state): State<Arc<OrdersState>>) -> Json<serde_json::Value> {
    let (products, shipping) = tokio::join!(
        state.upstream.products_healthy(),
        state.upstream.shipping_healthy()
    );
    let status = if products { "healthy" } else { "degraded" };

    Json(serde_json::json!({
        "status": status,
        "service": "orders",
        "orders": state.orders.len(),
        "dependencies": {
            "products": products,
            "shipping": shipping,
        },
        "timestamp": chrono::Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::products::ProductsState;
    use crate::api::server::{build_orders_router, build_products_router, build_shipping_router};
    use crate::api::shipping::ShippingState;
    use crate::config::ProductsConfig;
    use crate::shipping::ShippingService;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tower::util::ServiceExt;

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    struct Harness {
        products: Arc<ProductsState>,
        app: Router,
    }

    async fn harness() -> Harness {
        let faults = Arc::new(FaultInjector::disabled(5));
        let products = Arc::new(ProductsState::new(
            ProductsConfig::quiet(),
            Arc::clone(&faults),
        ));
        let shipping = Arc::new(ShippingState {
            service: ShippingService::new(Arc::clone(&faults)),
        });

        let products_url = spawn(build_products_router(Arc::clone(&products))).await;
        let shipping_url = spawn(build_shipping_router(shipping)).await;

        let upstream = UpstreamClient::new(&products_url, &shipping_url).unwrap();
        let app = build_orders_router(Arc::new(OrdersState::new(upstream, faults)));
        Harness { products, app }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        )
    }

    fn place(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/orders")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_place_order() {
        let h = harness().await;

        let (status, order) = send(
            &h.app,
            place(serde_json::json!({ "product_id": 3, "quantity": 2, "user_id": "user-7" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["id"], 1001);
        assert_eq!(order["status"], "confirmed");
        assert_eq!(order["total_price"], 79.98);
        assert!(order["tracking_id"].as_str().unwrap().starts_with("TRK-"));
        assert_eq!(h.products.catalog.stock(3), Some(118));
        assert_eq!(h.products.metrics.snapshot().purchases, 1);
    }

    #[tokio::test]
    async fn test_upstream_rejections_are_propagated() {
        let h = harness().await;

        let (status, body) = send(
            &h.app,
            place(serde_json::json!({ "product_id": 3, "quantity": 1000, "user_id": "user-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "insufficient_stock");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Insufficient stock"));

        let (status, body) = send(
            &h.app,
            place(serde_json::json!({ "product_id": 404, "quantity": 1, "user_id": "user-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product 404 not found");
        assert_eq!(h.products.catalog.stock(3), Some(120));
    }

    #[tokio::test]
    async fn test_order_validation() {
        let h = harness().await;

        let (status, _) = send(
            &h.app,
            place(serde_json::json!({ "product_id": 1, "quantity": 0, "user_id": "user-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &h.app,
            place(serde_json::json!({ "product_id": 1, "quantity": 1, "user_id": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "user_id is required");

        let (status, body) = send(
            &h.app,
            place(serde_json::json!({ "product_id": "one", "quantity": 1, "user_id": "user-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));

        let (status, body) = send(&h.app, get("/api/orders/latest")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert_eq!(h.products.metrics.snapshot().purchases, 0);
    }

    #[tokio::test]
    async fn test_track_and_user_orders() {
        let h = harness().await;
        for product_id in [1, 5] {
            let (status, _) = send(
                &h.app,
                place(serde_json::json!({ "product_id": product_id, "quantity": 1, "user_id": "user-3" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, order) = send(&h.app, get("/api/orders/1001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["product_id"], 1);

        let (status, tracked) = send(&h.app, get("/api/orders/1002/track")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tracked["order"]["id"], 1002);
        assert_eq!(tracked["shipment"]["order_id"], "1002");

        let (status, mine) = send(&h.app, get("/api/orders/user/user-3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine["count"], 2);

        let (status, _) = send(&h.app, get("/api/orders/9999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&h.app, get("/api/orders/9999/track")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_products_is_bad_gateway() {
        let upstream = UpstreamClient::with_timeout(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            Duration::from_millis(500),
        )
        .unwrap();
        let app = build_orders_router(Arc::new(OrdersState::new(
            upstream,
            Arc::new(FaultInjector::disabled(1)),
        )));

        let (status, body) = send(
            &app,
            place(serde_json::json!({ "product_id": 1, "quantity": 1, "user_id": "user-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "bad_gateway");

        let (status, health) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["dependencies"]["products"], false);
    }
}
