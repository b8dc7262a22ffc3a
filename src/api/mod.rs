pub mod error;
pub mod extract;
pub mod orders;
pub mod products;
pub mod server;
pub mod shipping;

pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use orders::OrdersState;
pub use products::ProductsState;
pub use server::{build_orders_router, build_products_router, build_shipping_router, run_server};
pub use shipping::ShippingState;
