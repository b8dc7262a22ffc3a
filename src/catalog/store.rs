use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::product::{seed_products, Product};
use super::query::{self, ProductPage, ProductQuery};
use super::CatalogError;

/// Result of a committed purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub product_id: u32,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub remaining_stock: u32,
}

/// In-memory product catalog.
///
/// Records are never added or removed after construction; the only mutation
/// is the stock decrement in [`CatalogStore::purchase`], which checks and
/// decrements under a single write lock.
#[derive(Debug)]
pub struct CatalogStore {
    products: RwLock<Vec<Product>>,
}

impl CatalogStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    /// Catalog built from the fixed seed list
    pub fn seeded() -> Self {
        Self::new(seed_products())
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    pub fn get(&self, id: u32) -> Option<Product> {
        self.products.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn stock(&self, id: u32) -> Option<u32> {
        self.products
            .read()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock)
    }

    pub fn list(&self, query: &ProductQuery) -> ProductPage {
        query.apply(&self.products.read())
    }

    pub fn search(&self, needle: &str, limit: usize) -> Vec<Product> {
        query::search(&self.products.read(), needle, limit)
    }

    /// Other products from the same category, most popular first
    pub fn recommendations(&self, id: u32, limit: usize) -> Result<Vec<Product>, CatalogError> {
        let products = self.products.read();
        let product = products
            .iter()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        let mut related: Vec<Product> = products
            .iter()
            .filter(|p| p.id != id && p.category == product.category)
            .cloned()
            .collect();
        related.sort_by(|a, b| b.popularity.cmp(&a.popularity).then(a.id.cmp(&b.id)));
        related.truncate(limit);
        Ok(related)
    }

    /// Check stock and decrement it atomically
    pub fn purchase(&self, id: u32, quantity: u32) -> Result<PurchaseReceipt, CatalogError> {
        if quantity == 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }

        let mut products = self.products.write();
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        if product.stock < quantity {
            return Err(CatalogError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;

        Ok(PurchaseReceipt {
            product_id: id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total_price: round_cents(product.price * quantity as f64),
            remaining_stock: product.stock,
        })
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Round a monetary amount to cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_and_stock() {
        let store = CatalogStore::seeded();
        assert_eq!(store.len(), 12);
        assert_eq!(store.get(1).unwrap().name, "Wireless Headphones");
        assert_eq!(store.stock(3), Some(120));
        assert!(store.get(999).is_none());
        assert!(store.stock(0).is_none());
    }

    #[test]
    fn test_purchase_decrements_stock() {
        let store = CatalogStore::seeded();
        let initial = store.stock(2).unwrap();

        for n in 1..=5 {
            let receipt = store.purchase(2, 3).unwrap();
            assert_eq!(receipt.remaining_stock, initial - n * 3);
        }
        assert_eq!(store.stock(2), Some(initial - 15));
    }

    #[test]
    fn test_failed_purchase_does_not_mutate() {
        let store = CatalogStore::seeded();

        let err = store.purchase(3, 1000).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InsufficientStock {
                requested: 1000,
                available: 120,
                ..
            }
        ));
        assert_eq!(store.stock(3), Some(120));

        assert!(matches!(store.purchase(3, 0), Err(CatalogError::InvalidQuantity(0))));
        assert!(matches!(store.purchase(42, 1), Err(CatalogError::NotFound(42))));
        assert_eq!(store.stock(3), Some(120));
    }

    #[test]
    fn test_stock_never_goes_negative() {
        let store = CatalogStore::seeded();
        // 25 monitors in stock
        let mut sold = 0;
        while store.purchase(7, 4).is_ok() {
            sold += 4;
        }
        assert_eq!(sold, 24);
        assert_eq!(store.stock(7), Some(1));
        assert!(store.purchase(7, 1).is_ok());
        assert_eq!(store.stock(7), Some(0));
        assert!(store.purchase(7, 1).is_err());
    }

    #[test]
    fn test_concurrent_purchases() {
        let store = Arc::new(CatalogStore::seeded());
        let initial = store.stock(6).unwrap(); // 200

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut ok = 0u32;
                    for _ in 0..40 {
                        if store.purchase(6, 1).is_ok() {
                            ok += 1;
                        }
                    }
                    ok
                })
            })
            .collect();

        let successful: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(successful, initial);
        assert_eq!(store.stock(6), Some(0));
    }

    #[test]
    fn test_recommendations_same_category() {
        let store = CatalogStore::seeded();
        let recs = store.recommendations(1, 3).unwrap();

        let ids: Vec<u32> = recs.iter().map(|p| p.id).collect();
        // Mouse (90), keyboard (88), monitor (82)
        assert_eq!(ids, vec![6, 2, 7]);
        assert!(store.recommendations(404, 3).is_err());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(39.99 * 3.0), 119.97);
        assert_eq!(round_cents(0.125), 0.13);
    }
}
