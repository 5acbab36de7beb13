//! Order creation: cart -> order, stock reservation, gateway order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CartLine, CreateOrderRequest, CreateOrderResponse, GatewayPayment, Order, OrderLine,
    OrderStatus, PaymentMethod, Product, ShippingAddress,
};
use shared::money::{self, OrderTotals};
use shared::util::{now_millis, snowflake_id};
use validator::Validate;

use crate::db::{self, Store, UnitOfWork};
use crate::error::ServiceResult;
use crate::gateway::{CreateGatewayOrder, GatewayConfig, PaymentGateway};
use crate::inventory;

/// Request fields after validation
#[derive(Debug, Clone)]
struct OrderDraft {
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    tax_price: Decimal,
    shipping_price: Decimal,
}

fn validate_request(req: CreateOrderRequest) -> Result<OrderDraft, AppError> {
    let shipping_address = req.shipping_address.normalized();
    shipping_address.validate()?;

    let payment_method = PaymentMethod::parse(&req.payment_method).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::PaymentInvalidMethod,
            format!("Unsupported payment method '{}'", req.payment_method),
        )
        .with_detail("field", "payment_method")
    })?;

    Ok(OrderDraft {
        shipping_address,
        payment_method,
        tax_price: money::surcharge(req.tax_price, "tax_price")?,
        shipping_price: money::surcharge(req.shipping_price, "shipping_price")?,
    })
}

/// Turn the user's cart into an order.
///
/// One transaction covers the stock checks, the order insert, every stock
/// decrement and the cart deletion; any failure (including the gateway call)
/// leaves stock and cart as they were.
pub async fn create_order(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    gateway_config: &GatewayConfig,
    user_id: i64,
    req: CreateOrderRequest,
) -> ServiceResult<CreateOrderResponse> {
    let draft = validate_request(req)?;

    let mut uow = store.begin().await?;
    let result = create_in(uow.as_mut(), gateway, gateway_config, user_id, draft).await;
    let response = db::finish(uow, result).await?;

    tracing::info!(
        order_id = response.order.id,
        user_id,
        total = %response.order.total_price,
        status = response.order.status.as_db(),
        "Order created"
    );
    Ok(response)
}

async fn create_in(
    uow: &mut dyn UnitOfWork,
    gateway: &dyn PaymentGateway,
    gateway_config: &GatewayConfig,
    user_id: i64,
    draft: OrderDraft,
) -> ServiceResult<CreateOrderResponse> {
    let cart = uow
        .load_cart(user_id)
        .await?
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::CartEmpty))?;

    // Lock rows in ascending product id so concurrent checkouts never deadlock
    let mut by_id: Vec<&CartLine> = cart.lines.iter().collect();
    by_id.sort_by_key(|l| l.product_id);
    let mut products: HashMap<i64, Product> = HashMap::with_capacity(by_id.len());
    for line in by_id {
        let product = inventory::check_available(uow, line.product_id, line.quantity).await?;
        products.insert(product.id, product);
    }

    // Fresh catalog values win over the cart snapshot
    let lines: Vec<OrderLine> = cart
        .lines
        .iter()
        .filter_map(|line| {
            products.get(&line.product_id).map(|p| OrderLine {
                product_id: p.id,
                name: p.name.clone(),
                image: p.image.clone(),
                price: p.price,
                quantity: line.quantity,
            })
        })
        .collect();

    let totals = OrderTotals::compute(&lines, draft.tax_price, draft.shipping_price);
    let order_id = snowflake_id();
    let now = now_millis();

    let (status, payment) = if draft.payment_method.is_gateway_routed() {
        let payment =
            open_gateway_order(gateway, gateway_config, order_id, totals.total_price).await?;
        (OrderStatus::PendingPayment, Some(payment))
    } else {
        (OrderStatus::Processing, None)
    };

    let order = Order {
        id: order_id,
        user_id,
        lines,
        shipping_address: draft.shipping_address,
        payment_method: draft.payment_method,
        items_price: totals.items_price,
        tax_price: totals.tax_price,
        shipping_price: totals.shipping_price,
        total_price: totals.total_price,
        status,
        is_paid: false,
        paid_at: None,
        payment_result: None,
        gateway_order_id: payment.as_ref().map(|p| p.gateway_order_id.clone()),
        delivered_at: None,
        created_at: now,
        updated_at: now,
    };

    uow.insert_order(&order).await?;
    for line in &order.lines {
        inventory::reserve(uow, line.product_id, line.quantity).await?;
    }
    uow.delete_cart(user_id).await?;

    Ok(CreateOrderResponse { order, payment })
}

async fn open_gateway_order(
    gateway: &dyn PaymentGateway,
    gateway_config: &GatewayConfig,
    order_id: i64,
    total: Decimal,
) -> ServiceResult<GatewayPayment> {
    let amount = money::to_minor_units(total)
        .filter(|amount| *amount > 0)
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PaymentInvalidAmount,
                format!("Order total {total} cannot be charged online"),
            )
        })?;

    let request = CreateGatewayOrder {
        amount,
        currency: gateway_config.currency.clone(),
        receipt: order_id.to_string(),
    };
    let gateway_order = gateway.create_order(&request).await.map_err(|e| {
        tracing::error!(order_id, error = %e, "Gateway order creation failed");
        AppError::with_message(
            ErrorCode::PaymentGatewayError,
            "Payment gateway is unavailable, please try again",
        )
    })?;

    if gateway_order.amount != amount {
        tracing::warn!(
            order_id,
            requested = amount,
            returned = gateway_order.amount,
            "Gateway order amount differs from request"
        );
    }

    Ok(GatewayPayment {
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        currency: gateway_order.currency,
        key_id: gateway_config.key_id.clone(),
    })
}
