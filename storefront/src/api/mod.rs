//! API routes for storefront

pub mod cart;
mod extract;
pub mod health;
pub mod orders;
pub mod payment_webhook;

use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{admin_only, user_auth_middleware};
use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin-only (runs inside user auth)
    let admin = Router::new()
        .route("/api/orders/{id}/status", put(orders::update_order_status))
        .layer(middleware::from_fn(admin_only));

    // Customer API (JWT authenticated)
    let protected = Router::new()
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/mine", get(orders::list_my_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/verify-payment", post(orders::verify_payment))
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    // Gateway webhook (signature-verified, raw body)
    let webhook = Router::new().route(
        "/api/payments/webhook",
        post(payment_webhook::handle_webhook),
    );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
