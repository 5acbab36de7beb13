//! Cart lines

use shared::error::{AppError, ErrorCode};
use shared::models::{AddCartItem, Cart, CartLine};
use shared::util::now_millis;
use validator::Validate;

use crate::db::{self, Store, UnitOfWork};
use crate::error::ServiceResult;
use crate::inventory;

/// The user's cart, empty if none exists yet
pub async fn get_cart(store: &dyn Store, user_id: i64) -> ServiceResult<Cart> {
    Ok(store
        .find_cart(user_id)
        .await?
        .unwrap_or_else(|| Cart::new(user_id, now_millis())))
}

/// Add a line (or replace the line for the same product) with a fresh
/// price/name/image snapshot.
pub async fn add_item(store: &dyn Store, user_id: i64, item: AddCartItem) -> ServiceResult<Cart> {
    item.validate()?;
    let mut uow = store.begin().await?;
    let result = add_in(uow.as_mut(), user_id, item).await;
    db::finish(uow, result).await
}

async fn add_in(uow: &mut dyn UnitOfWork, user_id: i64, item: AddCartItem) -> ServiceResult<Cart> {
    let product = uow
        .find_product(item.product_id)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", item.product_id)
        })?;
    if !product.is_active {
        return Err(AppError::with_message(
            ErrorCode::ProductUnavailable,
            format!("'{}' is no longer available", product.name),
        )
        .into());
    }
    if product.count_in_stock < item.quantity {
        return Err(inventory::insufficient_stock(&product, item.quantity).into());
    }

    let now = now_millis();
    let mut cart = uow
        .load_cart(user_id)
        .await?
        .unwrap_or_else(|| Cart::new(user_id, now));
    cart.upsert_line(CartLine::snapshot(&product, item.quantity), now);
    uow.save_cart(&cart).await?;
    Ok(cart)
}
