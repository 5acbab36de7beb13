//! In-memory store for tests
//!
//! A unit of work holds the single state lock for its whole lifetime and
//! mutates a working copy, so transactions are fully serialized and a
//! rollback (or a dropped unit) leaves the committed state untouched.
//! Row locks taken through `lock_product` are recorded in call order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use shared::models::{Cart, Order, Product};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BoxError, Store, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<i64, Product>,
    carts: HashMap<i64, Cart>,
    orders: BTreeMap<i64, Order>,
    webhook_events: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
    product_locks: Arc<StdMutex<Vec<i64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn put_cart(&self, cart: Cart) {
        self.state.lock().await.carts.insert(cart.user_id, cart);
    }

    pub async fn put_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id, order);
    }

    pub async fn product(&self, product_id: i64) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    pub async fn cart(&self, user_id: i64) -> Option<Cart> {
        self.state.lock().await.carts.get(&user_id).cloned()
    }

    pub async fn order(&self, order_id: i64) -> Option<Order> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    /// Product ids passed to `lock_product`, oldest first
    pub fn product_locks(&self) -> Vec<i64> {
        self.product_locks.lock().unwrap().clone()
    }

    /// Make every subsequent commit fail
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BoxError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
            product_locks: self.product_locks.clone(),
        }))
    }

    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, BoxError> {
        Ok(self.order(order_id).await)
    }

    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, BoxError> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(orders)
    }

    async fn find_cart(&self, user_id: i64) -> Result<Option<Cart>, BoxError> {
        Ok(self.cart(user_id).await)
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
    product_locks: Arc<StdMutex<Vec<i64>>>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn load_cart(&mut self, user_id: i64) -> Result<Option<Cart>, BoxError> {
        Ok(self.working.carts.get(&user_id).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<(), BoxError> {
        self.working.carts.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn delete_cart(&mut self, user_id: i64) -> Result<(), BoxError> {
        self.working.carts.remove(&user_id);
        Ok(())
    }

    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn lock_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError> {
        self.product_locks.lock().unwrap().push(product_id);
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn decrement_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        _now: i64,
    ) -> Result<Option<i32>, BoxError> {
        match self.working.products.get_mut(&product_id) {
            Some(p) if p.is_active && p.count_in_stock >= quantity => {
                p.count_in_stock -= quantity;
                Ok(Some(p.count_in_stock))
            }
            _ => Ok(None),
        }
    }

    async fn increment_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        _now: i64,
    ) -> Result<Option<i32>, BoxError> {
        Ok(self.working.products.get_mut(&product_id).map(|p| {
            p.count_in_stock += quantity;
            p.count_in_stock
        }))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), BoxError> {
        if self.working.orders.contains_key(&order.id) {
            return Err(format!("duplicate order id {}", order.id).into());
        }
        if let Some(gw) = order.gateway_order_id.as_deref() {
            let taken = self
                .working
                .orders
                .values()
                .any(|o| o.gateway_order_id.as_deref() == Some(gw));
            if taken {
                return Err(format!("duplicate gateway order id {gw}").into());
            }
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>, BoxError> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn lock_order_by_gateway_id(
        &mut self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, BoxError> {
        Ok(self
            .working
            .orders
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), BoxError> {
        match self.working.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(format!("order {} not found", order.id).into()),
        }
    }

    async fn record_webhook_event(
        &mut self,
        event_id: &str,
        _event_type: &str,
        _now: i64,
    ) -> Result<bool, BoxError> {
        Ok(self.working.webhook_events.insert(event_id.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<(), BoxError> {
        let MemoryUnitOfWork {
            mut guard,
            working,
            fail_commit,
            ..
        } = *self;
        if fail_commit {
            return Err("injected commit failure".into());
        }
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), BoxError> {
        Ok(())
    }
}
