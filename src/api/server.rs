use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::orders::{self, OrdersState};
use super::products::{self, ProductsState};
use super::shipping::{self, ShippingState};
use crate::config::ServerConfig;
use crate::orders::UpstreamClient;
use crate::resilience::{FaultInjector, RateLimiter};
use crate::shipping::ShippingService;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Products router; every `/api` route sits behind the rate limiter
pub fn build_products_router(state: Arc<ProductsState>) -> Router {
    let api = Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/products/search", get(products::search_products))
        .route("/api/products/:id", get(products::get_product))
        .route("/api/products/:id/reviews", get(products::product_reviews))
        .route(
            "/api/products/:id/recommendations",
            get(products::product_recommendations),
        )
        .route("/api/products/:id/purchase", post(products::purchase))
        .route("/api/inventory/:product_id", get(products::inventory))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            products::rate_limit,
        ));

    Router::new()
        .route("/health", get(products::health))
        .route("/stats", get(products::stats))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

pub fn build_orders_router(state: Arc<OrdersState>) -> Router {
    Router::new()
        .route("/health", get(orders::health))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/track", get(orders::track_order))
        .route("/api/orders/user/:user_id", get(orders::user_orders))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

pub fn build_shipping_router(state: Arc<ShippingState>) -> Router {
    Router::new()
        .route("/health", get(shipping::health))
        .route("/api/health", get(shipping::health))
        .route("/api/", get(shipping::service_info))
        .route("/api/shipping/quote", post(shipping::quote))
        .route("/api/shipping/create", post(shipping::create))
        .route("/api/shipping/track/:tracking_id", get(shipping::track))
        .route("/api/shipping/order/:order_id", get(shipping::by_order))
        .route("/api/slow", get(shipping::slow))
        .route("/api/error", get(shipping::error))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

async fn bind(host: &str, port: u16) -> Result<TcpListener, Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    Ok(TcpListener::bind(addr).await?)
}

/// Run Products, Orders and Shipping until Ctrl+C
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let faults = Arc::new(FaultInjector::new(config.seed).with_enabled(config.faults_enabled));
    if !config.faults_enabled {
        tracing::info!("Fault injection disabled");
    }

    let products_state = Arc::new(ProductsState::new(
        config.products.clone(),
        Arc::clone(&faults),
    ));
    let shipping_state = Arc::new(ShippingState {
        service: ShippingService::new(Arc::clone(&faults)),
    });
    let upstream = UpstreamClient::new(&config.products_url, &config.shipping_url)?;
    let orders_state = Arc::new(OrdersState::new(upstream, Arc::clone(&faults)));

    // Start background workers
    let limiter = Arc::clone(&products_state.limiter);
    let sweeper_handle = Arc::clone(&limiter)
        .start_sweeper(Duration::from_secs(config.sweep_interval_secs));

    let products_listener = bind(&config.host, config.products_port).await?;
    let orders_listener = bind(&config.host, config.orders_port).await?;
    let shipping_listener = bind(&config.host, config.shipping_port).await?;
    tracing::info!("Products service listening on {}", products_listener.local_addr()?);
    tracing::info!("Orders service listening on {}", orders_listener.local_addr()?);
    tracing::info!("Shipping service listening on {}", shipping_listener.local_addr()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(shutdown_tx, Arc::clone(&limiter)));

    let products_server = axum::serve(
        products_listener,
        build_products_router(products_state)
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let orders_server = axum::serve(orders_listener, build_orders_router(orders_state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let shipping_server = axum::serve(shipping_listener, build_shipping_router(shipping_state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    tokio::try_join!(
        async { products_server.await },
        async { orders_server.await },
        async { shipping_server.await },
    )?;

    sweeper_handle.abort();

    tracing::info!("Storefront stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means shut down
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal(tx: watch::Sender<bool>, limiter: Arc<RateLimiter>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping services...");
    limiter.stop_sweeper();
    let _ = tx.send(true);
}
