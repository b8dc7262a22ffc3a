use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use crate::resilience::LatencyRange;
use crate::shipping::{Shipment, ShippingQuote, ShippingRequest, ShippingService};

const QUOTE_FAILURE_RATE: f64 = 1.0 / 20.0;
const CREATE_FAILURE_RATE: f64 = 1.0 / 25.0;
const SLOW_LATENCY: LatencyRange = LatencyRange::new(1000, 3000);

pub struct ShippingState {
    pub service: ShippingService,
}

pub async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "shipping",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/shipping/quote",
            "POST /api/shipping/create",
            "GET /api/shipping/track/:trackingId",
            "GET /api/shipping/order/:orderId",
            "GET /api/slow",
            "GET /api/error",
            "GET /api/health",
        ],
    }))
}

pub async fn quote(
    State(state): State<Arc<ShippingState>>,
    ApiJson(request): ApiJson<ShippingRequest>,
) -> Result<Json<ShippingQuote>, ApiError> {
    if state.service.faults().should_fail(QUOTE_FAILURE_RATE) {
        tracing::warn!(order_id = ?request.order_id, "Shipping quote service unavailable");
        return Err(ApiError::ServiceUnavailable(
            "Shipping quote service temporarily unavailable".to_string(),
        ));
    }

    let quote = state.service.quote(&request).await;
    tracing::info!(
        quote_id = %quote.quote_id,
        cost = quote.cost,
        carrier = %quote.carrier,
        "Shipping quote calculated"
    );
    Ok(Json(quote))
}

pub async fn create(
    State(state): State<Arc<ShippingState>>,
    ApiJson(request): ApiJson<ShippingRequest>,
) -> Result<(StatusCode, Json<Shipment>), ApiError> {
    let order_id = request
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::BadRequest("order_id is required".to_string()))?;

    if state.service.faults().should_fail(CREATE_FAILURE_RATE) {
        tracing::error!(order_id = %order_id, "Shipment creation failed");
        return Err(ApiError::Internal(
            "Failed to create shipment: carrier API error".to_string(),
        ));
    }

    let shipment = state.service.create(&order_id, &request).await;
    tracing::info!(
        tracking_id = %shipment.tracking_id,
        order_id = %order_id,
        carrier = %shipment.carrier,
        "Shipment created"
    );
    Ok((StatusCode::CREATED, Json(shipment)))
}

pub async fn track(
    State(state): State<Arc<ShippingState>>,
    ApiPath(tracking_id): ApiPath<String>,
) -> Result<Json<Shipment>, ApiError> {
    state
        .service
        .track(&tracking_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Shipment {} not found", tracking_id)))
}

pub async fn by_order(
    State(state): State<Arc<ShippingState>>,
    ApiPath(order_id): ApiPath<String>,
) -> Result<Json<Shipment>, ApiError> {
    state
        .service
        .by_order(&order_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No shipment for order {}", order_id)))
}

/// Deliberately slow endpoint for latency demos
pub async fn slow(State(state): State<Arc<ShippingState>>) -> Json<serde_json::Value> {
    let waited = state.service.faults().delay(SLOW_LATENCY).await;
    tracing::info!(delay_ms = waited.as_millis() as u64, "Slow endpoint responded");
    Json(serde_json::json!({
        "message": "Slow response",
        "delay_ms": waited.as_millis() as u64,
    }))
}

/// Always fails
pub async fn error() -> ApiError {
    tracing::error!("Simulated shipping error");
    ApiError::Internal("Simulated error for testing".to_string())
}

pub async fn health(State(state): State<Arc<ShippingState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shipping",
        "shipments": state.service.shipment_count(),
        "timestamp": chrono::Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::build_shipping_router;
    use crate::resilience::FaultInjector;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = Arc::new(ShippingState {
            service: ShippingService::new(Arc::new(FaultInjector::disabled(4))),
        });
        build_shipping_router(state)
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

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_quote() {
        let app = create_test_app();
        let (status, quote) = send(
            &app,
            post(
                "/api/shipping/quote",
                serde_json::json!({
                    "order_id": "1001",
                    "total_weight": 2.0,
                    "destination_country": "DE",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["cost"], 21.99);
        assert_eq!(quote["shipping_method"], "standard");
        assert!(quote["quote_id"].as_str().unwrap().starts_with("QT-"));
    }

    #[tokio::test]
    async fn test_create_then_track() {
        let app = create_test_app();
        let (status, shipment) = send(
            &app,
            post(
                "/api/shipping/create",
                serde_json::json!({ "order_id": "1001", "shipping_method": "express" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(shipment["status"], "pending");
        let tracking_id = shipment["tracking_id"].as_str().unwrap().to_string();

        let (status, tracked) =
            send(&app, get(&format!("/api/shipping/track/{}", tracking_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tracked["order_id"], "1001");

        let (status, by_order) = send(&app, get("/api/shipping/order/1001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_order["tracking_id"], tracking_id.as_str());

        let (status, body) = send(&app, get("/api/shipping/track/TRK-MISSING")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_create_requires_order_id() {
        let app = create_test_app();
        let (status, body) = send(
            &app,
            post("/api/shipping/create", serde_json::json!({ "total_weight": 1.0 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "order_id is required");
    }

    #[tokio::test]
    async fn test_info_error_and_health() {
        let app = create_test_app();

        let (status, info) = send(&app, get("/api/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["service"], "shipping");

        let (status, body) = send(&app, get("/api/error")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");

        // Disabled faults make the slow endpoint return at once
        let (status, slow) = send(&app, get("/api/slow")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(slow["delay_ms"], 0);

        let (status, health) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");

        let (status, health) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["service"], "shipping");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let app = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/shipping/quote")
            .header("content-type", "application/json")
            .body(Body::from("{\"total_weight\": "))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }
}
