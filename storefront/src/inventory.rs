//! Inventory ledger
//!
//! Stock only moves through [`reserve`] and [`restore`], always inside the
//! caller's unit of work. Reservation is a conditional decrement, so two
//! transactions racing for the last units cannot both succeed.

use shared::error::{AppError, ErrorCode};
use shared::models::Product;
use shared::util::now_millis;

use crate::db::UnitOfWork;
use crate::error::ServiceResult;

/// Lock a product and check it can supply `quantity` units.
pub async fn check_available(
    uow: &mut dyn UnitOfWork,
    product_id: i64,
    quantity: i32,
) -> ServiceResult<Product> {
    let product = uow
        .lock_product(product_id)
        .await?
        .ok_or_else(|| product_not_found(product_id))?;
    if !product.is_active {
        return Err(product_unavailable(&product).into());
    }
    if product.count_in_stock < quantity {
        return Err(insufficient_stock(&product, quantity).into());
    }
    Ok(product)
}

/// Take `quantity` units out of stock. Returns the remaining stock.
pub async fn reserve(
    uow: &mut dyn UnitOfWork,
    product_id: i64,
    quantity: i32,
) -> ServiceResult<i32> {
    if let Some(remaining) = uow
        .decrement_stock(product_id, quantity, now_millis())
        .await?
    {
        return Ok(remaining);
    }

    // Nothing changed; report why
    let err = match uow.find_product(product_id).await? {
        None => product_not_found(product_id),
        Some(p) if !p.is_active => product_unavailable(&p),
        Some(p) => insufficient_stock(&p, quantity),
    };
    Err(err.into())
}

/// Give `quantity` units back to stock.
///
/// A product deleted from the catalog since the order was placed has nothing
/// to return to; that is logged and skipped.
pub async fn restore(
    uow: &mut dyn UnitOfWork,
    product_id: i64,
    quantity: i32,
) -> ServiceResult<()> {
    match uow
        .increment_stock(product_id, quantity, now_millis())
        .await?
    {
        Some(stock) => {
            tracing::debug!(product_id, quantity, stock, "Stock restored");
        }
        None => {
            tracing::warn!(
                product_id,
                quantity,
                "Cannot restore stock: product no longer exists"
            );
        }
    }
    Ok(())
}

pub fn insufficient_stock(product: &Product, requested: i32) -> AppError {
    AppError::with_message(
        ErrorCode::InsufficientStock,
        format!(
            "Only {} of '{}' left in stock",
            product.count_in_stock, product.name
        ),
    )
    .with_detail("product_id", product.id)
    .with_detail("available", product.count_in_stock)
    .with_detail("requested", requested)
}

fn product_unavailable(product: &Product) -> AppError {
    AppError::with_message(
        ErrorCode::ProductUnavailable,
        format!("'{}' is no longer available", product.name),
    )
    .with_detail("product_id", product.id)
}

fn product_not_found(product_id: i64) -> AppError {
    AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", product_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::db::memory::MemoryStore;
    use crate::error::ServiceError;
    use crate::testing::product;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_reserve_decrements_and_rejects_oversell() {
        let store = MemoryStore::new();
        store.put_product(product(1, dec!(5.00), 3)).await;

        let mut uow = store.begin().await.unwrap();
        assert_eq!(reserve(uow.as_mut(), 1, 2).await.unwrap(), 1);
        let err = reserve(uow.as_mut(), 1, 2).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InsufficientStock));
        uow.commit().await.unwrap();

        assert_eq!(store.product(1).await.unwrap().count_in_stock, 1);
    }

    #[tokio::test]
    async fn test_reserve_does_not_trust_an_earlier_check() {
        let store = MemoryStore::new();
        store.put_product(product(1, dec!(5.00), 5)).await;

        let mut uow = store.begin().await.unwrap();
        // Both checks see 5 units; only the first decrement may take 3 of them
        check_available(uow.as_mut(), 1, 3).await.unwrap();
        check_available(uow.as_mut(), 1, 3).await.unwrap();
        assert_eq!(reserve(uow.as_mut(), 1, 3).await.unwrap(), 2);
        let ServiceError::App(err) = reserve(uow.as_mut(), 1, 3).await.unwrap_err() else {
            panic!("expected a business error");
        };
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details["available"], 2);
        assert_eq!(details["requested"], 3);
        uow.commit().await.unwrap();

        assert_eq!(store.product(1).await.unwrap().count_in_stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_reports_missing_and_inactive() {
        let store = MemoryStore::new();
        let mut inactive = product(2, dec!(1.00), 10);
        inactive.is_active = false;
        store.put_product(inactive).await;

        let mut uow = store.begin().await.unwrap();
        let err = reserve(uow.as_mut(), 99, 1).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProductNotFound));
        let err = reserve(uow.as_mut(), 2, 1).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProductUnavailable));
        uow.rollback().await.unwrap();

        assert_eq!(store.product(2).await.unwrap().count_in_stock, 10);
    }

    #[tokio::test]
    async fn test_restore_increments_and_skips_missing() {
        let store = MemoryStore::new();
        store.put_product(product(1, dec!(5.00), 0)).await;

        let mut uow = store.begin().await.unwrap();
        restore(uow.as_mut(), 1, 4).await.unwrap();
        restore(uow.as_mut(), 404, 4).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.product(1).await.unwrap().count_in_stock, 4);
    }

    #[tokio::test]
    async fn test_check_available() {
        let store = MemoryStore::new();
        store.put_product(product(1, dec!(5.00), 2)).await;

        let mut uow = store.begin().await.unwrap();
        assert_eq!(check_available(uow.as_mut(), 1, 2).await.unwrap().id, 1);
        let err = check_available(uow.as_mut(), 1, 3).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InsufficientStock));
        uow.rollback().await.unwrap();
    }
}
