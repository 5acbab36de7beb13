//! Fixtures shared by unit tests

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::models::{
    Cart, CartLine, Order, OrderLine, OrderStatus, PaymentMethod, Product, ShippingAddress,
};

use crate::auth::Role;
use crate::auth::user_auth::create_token;
use crate::db::memory::MemoryStore;
use crate::gateway::GatewayConfig;
use crate::gateway::mock::MockGateway;
use crate::state::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";

pub fn product(id: i64, price: Decimal, count_in_stock: i32) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        image: Some(format!("/images/{id}.jpg")),
        price,
        count_in_stock,
        is_active: true,
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Grace Hopper".into(),
        address_line1: "1 Compiler Way".into(),
        address_line2: None,
        city: "Arlington".into(),
        state: "VA".into(),
        postal_code: "22201".into(),
        country: "US".into(),
        phone: "+1 555 0100".into(),
    }
}

pub fn cart_with(user_id: i64, lines: &[(Product, i32)]) -> Cart {
    let mut cart = Cart::new(user_id, 1);
    for (product, quantity) in lines {
        cart.upsert_line(CartLine::snapshot(product, *quantity), 1);
    }
    cart
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        key_id: "rzp_test_key".into(),
        key_secret: "test-key-secret".into(),
        webhook_secret: "test-webhook-secret".into(),
        base_url: "http://gateway.invalid/v1".into(),
        currency: "INR".into(),
        timeout: Duration::from_secs(1),
    }
}

fn order(id: i64, user_id: i64, quantity: i32) -> Order {
    let items_price = dec!(10.00) * Decimal::from(quantity);
    Order {
        id,
        user_id,
        lines: vec![OrderLine {
            product_id: 1,
            name: "Product 1".into(),
            image: None,
            price: dec!(10.00),
            quantity,
        }],
        shipping_address: address(),
        payment_method: PaymentMethod::CashOnDelivery,
        items_price,
        tax_price: Decimal::ZERO,
        shipping_price: Decimal::ZERO,
        total_price: items_price,
        status: OrderStatus::Processing,
        is_paid: false,
        paid_at: None,
        payment_result: None,
        gateway_order_id: None,
        delivered_at: None,
        created_at: 1_000,
        updated_at: 1_000,
    }
}

/// Cash-on-delivery order in `Processing`, one line of product 1
pub fn cod_order(id: i64, user_id: i64, quantity: i32) -> Order {
    order(id, user_id, quantity)
}

/// Online order awaiting payment, two units of product 1
pub fn pending_online_order(id: i64, user_id: i64, gateway_order_id: &str) -> Order {
    Order {
        payment_method: PaymentMethod::Online,
        status: OrderStatus::PendingPayment,
        gateway_order_id: Some(gateway_order_id.into()),
        ..order(id, user_id, 2)
    }
}

pub fn app_state(store: MemoryStore, gateway: MockGateway) -> AppState {
    AppState::from_parts(
        Arc::new(store),
        Arc::new(gateway),
        gateway_config(),
        JWT_SECRET,
    )
}

/// `Authorization` header value for a user
pub fn bearer(user_id: i64, role: Role) -> String {
    let token = create_token(user_id, &format!("user{user_id}@example.com"), role, JWT_SECRET)
        .expect("token");
    format!("Bearer {token}")
}
