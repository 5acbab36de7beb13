//! Cart Model
//!
//! A cart is a per-user singleton created on the first add and deleted
//! wholesale when it becomes an order. `name`, `image` and `price` on a line
//! are snapshots frozen when the line was written; order creation re-reads the
//! catalog instead of trusting them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::product::Product;

/// Maximum quantity per cart line
pub const MAX_LINE_QUANTITY: i32 = 9999;

/// Cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartLine {
    pub product_id: i64,
    /// Snapshot of the product name at add time
    pub name: String,
    /// Snapshot of the product image at add time
    pub image: Option<String>,
    /// Unit price captured at add time
    pub price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    /// Capture a line from the current catalog record
    pub fn snapshot(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            quantity,
        }
    }
}

/// Per-user cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: i64,
    pub lines: Vec<CartLine>,
    pub updated_at: i64,
}

impl Cart {
    pub fn new(user_id: i64, now: i64) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Insert a line, replacing any existing line for the same product
    pub fn upsert_line(&mut self, line: CartLine, now: i64) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
        self.updated_at = now;
    }
}

/// Add/replace cart line payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCartItem {
    pub product_id: i64,
    #[validate(range(min = 1, max = 9999, message = "quantity must be between 1 and 9999"))]
    pub quantity: i32,
}
