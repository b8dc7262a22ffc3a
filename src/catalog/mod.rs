pub mod product;
pub mod query;
pub mod reviews;
pub mod store;

pub use product::{seed_products, Category, Product};
pub use query::{ListParams, ProductPage, ProductQuery, SortOrder};
pub use reviews::{generate_reviews, Review, ReviewSummary};
pub use store::{round_cents, CatalogStore, PurchaseReceipt};

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Product {0} not found")]
    NotFound(u32),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: u32,
        requested: u32,
        available: u32,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}
