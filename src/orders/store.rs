use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::model::{NewOrder, Order, OrderStatus};

const FIRST_ORDER_ID: u64 = 1001;

/// In-memory order registry
#[derive(Debug)]
pub struct OrderStore {
    orders: RwLock<HashMap<u64, Order>>,
    next_id: AtomicU64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(FIRST_ORDER_ID),
        }
    }

    pub fn create(&self, new: NewOrder) -> Order {
        let now = Utc::now();
        let order = Order {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: new.user_id,
            product_id: new.product_id,
            product_name: new.product_name,
            quantity: new.quantity,
            unit_price: new.unit_price,
            total_price: new.total_price,
            status: OrderStatus::Confirmed,
            tracking_id: None,
            created_at: now,
            updated_at: now,
        };

        self.orders.write().insert(order.id, order.clone());
        order
    }

    pub fn get(&self, id: u64) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    /// Orders placed by a user, oldest first
    pub fn by_user(&self, user_id: &str) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        orders
    }

    pub fn attach_tracking(&self, id: u64, tracking_id: String) -> Option<Order> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(&id)?;
        order.tracking_id = Some(tracking_id);
        order.updated_at = Utc::now();
        Some(order.clone())
    }

    /// Advance an order one status step with probability 1/3
    pub fn advance<R: Rng + ?Sized>(&self, id: u64, rng: &mut R) -> Option<Order> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(&id)?;

        if let Some(next) = order.status.next() {
            if rng.gen_ratio(1, 3) {
                order.status = next;
                order.updated_at = Utc::now();
            }
        }
        Some(order.clone())
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}
