//! Product Model
//!
//! Owned by the catalog. The order workflow only reads price, name, image,
//! the active flag and the available quantity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product as seen by the order workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    /// Current unit price in currency unit
    pub price: Decimal,
    /// Available quantity, never negative
    pub count_in_stock: i32,
    pub is_active: bool,
}
