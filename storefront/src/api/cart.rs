//! Cart endpoints
//!
//! - GET  /api/cart
//! - POST /api/cart/items

use axum::extract::State;
use axum::{Extension, Json};
use shared::models::{AddCartItem, Cart};

use super::extract::JsonBody;
use crate::auth::UserIdentity;
use crate::cart;
use crate::error::ServiceError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ServiceError>;

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Cart> {
    let cart = cart::get_cart(state.store.as_ref(), identity.user_id).await?;
    Ok(Json(cart))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    JsonBody(item): JsonBody<AddCartItem>,
) -> ApiResult<Cart> {
    let cart = cart::add_item(state.store.as_ref(), identity.user_id, item).await?;
    Ok(Json(cart))
}
