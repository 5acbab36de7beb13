//! Shared types for the storefront
//!
//! Wire models (cart, order, product), the order aggregate rules, money
//! helpers and the unified error system used by the service and its clients.

pub mod error;
pub mod models;
pub mod money;
pub mod util;
