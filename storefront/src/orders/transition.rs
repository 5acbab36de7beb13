//! Administrative status changes

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, StatusChange, UpdateOrderStatus};
use shared::util::now_millis;

use crate::db::{self, Store, UnitOfWork};
use crate::error::ServiceResult;
use crate::inventory;

/// Apply an admin update to an order.
///
/// Entering `Cancelled` or `Failed` from `PendingPayment` or `Processing`
/// returns every line's quantity to stock in the same transaction. Shipped
/// goods stay out of stock. Requesting the current status is a no-op, so a
/// repeated cancel never restores twice.
pub async fn update_status(
    store: &dyn Store,
    order_id: i64,
    update: UpdateOrderStatus,
) -> ServiceResult<Order> {
    if update.status.is_none() && update.is_paid.is_none() && update.payment_result.is_none() {
        return Err(AppError::validation("Nothing to update")
            .with_detail("fields", "status, is_paid, payment_result")
            .into());
    }

    let mut uow = store.begin().await?;
    let result = update_in(uow.as_mut(), order_id, update).await;
    let order = db::finish(uow, result).await?;
    tracing::info!(
        order_id,
        status = order.status.as_db(),
        is_paid = order.is_paid,
        "Order updated"
    );
    Ok(order)
}

async fn update_in(
    uow: &mut dyn UnitOfWork,
    order_id: i64,
    update: UpdateOrderStatus,
) -> ServiceResult<Order> {
    let mut order = uow
        .lock_order(order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let now = now_millis();

    if let Some(to) = update.status {
        if let StatusChange::Changed { restore_stock } = order.status_change(to)? {
            if restore_stock {
                for line in &order.lines {
                    inventory::restore(uow, line.product_id, line.quantity).await?;
                }
            }
            order.set_status(to, now);
        }
    }
    if let Some(paid) = update.is_paid {
        order.override_paid(paid, now);
    }
    if let Some(patch) = update.payment_result {
        order.merge_payment_result(patch, now);
    }
    order.enforce_paid_invariant();

    uow.update_order(&order).await?;
    Ok(order)
}
