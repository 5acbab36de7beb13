//! Order endpoints
//!
//! - POST /api/orders                      create from cart
//! - GET  /api/orders/mine                 own orders, newest first
//! - GET  /api/orders/{id}                 owner or admin
//! - POST /api/orders/{id}/verify-payment  client checkout confirmation
//! - PUT  /api/orders/{id}/status          admin only

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::models::{
    CreateOrderRequest, CreateOrderResponse, Order, UpdateOrderStatus, VerifyPayment,
};

use super::extract::JsonBody;
use crate::auth::UserIdentity;
use crate::error::ServiceError;
use crate::orders;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ServiceError>;

pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ServiceError> {
    let resp = orders::create_order(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.gateway_config,
        identity.user_id,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<Order>> {
    let orders = orders::list_own_orders(state.store.as_ref(), identity.user_id).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let order = orders::get_order(state.store.as_ref(), &identity, order_id).await?;
    Ok(Json(order))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(order_id): Path<i64>,
    JsonBody(req): JsonBody<VerifyPayment>,
) -> ApiResult<Order> {
    let order = orders::verify_client_payment(
        state.store.as_ref(),
        &state.gateway_config,
        identity.user_id,
        order_id,
        req,
    )
    .await?;
    Ok(Json(order))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(order_id): Path<i64>,
    JsonBody(update): JsonBody<UpdateOrderStatus>,
) -> ApiResult<Order> {
    tracing::info!(
        order_id,
        admin_id = identity.user_id,
        admin_email = %identity.email,
        "Admin order update"
    );
    let order = orders::update_status(state.store.as_ref(), order_id, update).await?;
    Ok(Json(order))
}
