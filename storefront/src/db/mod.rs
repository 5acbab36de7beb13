//! Persistence seam
//!
//! [`Store`] hands out [`UnitOfWork`]s; every multi-row mutation of the order
//! workflow (stock, orders, carts, webhook markers) runs inside one of them and
//! is committed or rolled back exactly once by [`finish`].

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::models::{Cart, Order, Product};

use crate::error::ServiceResult;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Entry point to persistent state
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BoxError>;

    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, BoxError>;

    /// Orders of one user, newest first
    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, BoxError>;

    async fn find_cart(&self, user_id: i64) -> Result<Option<Cart>, BoxError>;
}

/// One transaction. Row locks taken through it are held until commit/rollback.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn load_cart(&mut self, user_id: i64) -> Result<Option<Cart>, BoxError>;

    /// Replace the user's cart and its lines
    async fn save_cart(&mut self, cart: &Cart) -> Result<(), BoxError>;

    async fn delete_cart(&mut self, user_id: i64) -> Result<(), BoxError>;

    /// Plain read, no lock
    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError>;

    /// Read and row-lock a product for the rest of the transaction
    async fn lock_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError>;

    /// Conditional decrement: applied only when the product is active and has
    /// at least `quantity` in stock. Returns the remaining stock, or `None`
    /// when nothing was changed.
    async fn decrement_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        now: i64,
    ) -> Result<Option<i32>, BoxError>;

    /// Unconditional increment. Returns `None` if the product no longer exists.
    async fn increment_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        now: i64,
    ) -> Result<Option<i32>, BoxError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), BoxError>;

    /// Read and row-lock an order
    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>, BoxError>;

    /// Read and row-lock the order bound to a gateway order id
    async fn lock_order_by_gateway_id(
        &mut self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, BoxError>;

    /// Persist the mutable fields of an order
    async fn update_order(&mut self, order: &Order) -> Result<(), BoxError>;

    /// Mark a webhook delivery as processed. Returns `false` if it already was.
    async fn record_webhook_event(
        &mut self,
        event_id: &str,
        event_type: &str,
        now: i64,
    ) -> Result<bool, BoxError>;

    async fn commit(self: Box<Self>) -> Result<(), BoxError>;

    async fn rollback(self: Box<Self>) -> Result<(), BoxError>;
}

/// Commit on success, roll back on failure.
pub async fn finish<T>(uow: Box<dyn UnitOfWork>, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = uow.rollback().await {
                tracing::warn!(error = %rb, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}
