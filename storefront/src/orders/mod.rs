//! Order workflow: creation, payment reconciliation, status transitions

mod create;
mod reconcile;
mod transition;

pub use create::create_order;
pub use reconcile::{reconcile_event, verify_client_payment};
pub use transition::update_status;

use shared::error::{AppError, ErrorCode};
use shared::models::Order;

use crate::auth::UserIdentity;
use crate::db::Store;
use crate::error::ServiceResult;

/// Load an order visible to `identity` (its owner or an admin)
pub async fn get_order(
    store: &dyn Store,
    identity: &UserIdentity,
    order_id: i64,
) -> ServiceResult<Order> {
    let order = store
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if order.user_id != identity.user_id && !identity.is_admin() {
        return Err(AppError::permission_denied("Order belongs to another user").into());
    }
    Ok(order)
}

pub async fn list_own_orders(store: &dyn Store, user_id: i64) -> ServiceResult<Vec<Order>> {
    Ok(store.list_orders_by_user(user_id).await?)
}
