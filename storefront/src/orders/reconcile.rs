//! Payment reconciliation
//!
//! Both the gateway webhook and the client checkout confirmation end in
//! [`Order::record_payment`], which is a no-op on an order that is already
//! paid. Replays therefore never move `paid_at` or the stored payment result.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, PaymentResult, VerifyPayment};
use shared::util::now_millis;
use validator::Validate;

use crate::db::{self, Store, UnitOfWork};
use crate::error::ServiceResult;
use crate::gateway::event::{EventKind, PaymentNotice, WebhookEvent};
use crate::gateway::{GatewayConfig, verify_payment_signature};

/// What a webhook delivery did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Order newly marked paid
    Paid { order_id: i64 },
    /// Order was already paid; nothing changed
    AlreadyPaid { order_id: i64 },
    /// Event id seen before
    Duplicate,
    /// No order carries the gateway order id
    UnknownOrder,
    PaymentFailed,
    Ignored,
}

impl ReconcileOutcome {
    /// Acknowledgement text returned to the gateway
    pub fn ack(&self) -> &'static str {
        match self {
            Self::Paid { .. } => "processed",
            Self::AlreadyPaid { .. } => "already_paid",
            Self::Duplicate => "duplicate",
            Self::UnknownOrder => "unknown_order",
            Self::PaymentFailed => "payment_failed",
            Self::Ignored => "ignored",
        }
    }
}

/// Apply a verified webhook event.
///
/// `event_id` is the gateway's delivery id when it sends one; it is recorded
/// in the same transaction so a failed attempt can be retried.
pub async fn reconcile_event(
    store: &dyn Store,
    event: &WebhookEvent,
    event_id: Option<&str>,
) -> ServiceResult<ReconcileOutcome> {
    let mut uow = store.begin().await?;
    let result = reconcile_in(uow.as_mut(), event, event_id).await;
    db::finish(uow, result).await
}

async fn reconcile_in(
    uow: &mut dyn UnitOfWork,
    event: &WebhookEvent,
    event_id: Option<&str>,
) -> ServiceResult<ReconcileOutcome> {
    let now = now_millis();

    if let Some(id) = event_id {
        if !uow.record_webhook_event(id, &event.event_type, now).await? {
            tracing::info!(event_id = id, "Duplicate webhook event, skipping");
            return Ok(ReconcileOutcome::Duplicate);
        }
    }

    match event.kind {
        EventKind::PaymentSucceeded => mark_paid_from_notice(uow, &event.payment, now).await,
        EventKind::PaymentFailed => {
            // Order stays pending; the customer may retry
            tracing::warn!(
                gateway_order_id = event.payment.gateway_order_id.as_deref().unwrap_or(""),
                payment_id = event.payment.payment_id.as_deref().unwrap_or(""),
                "Gateway reported a failed payment"
            );
            Ok(ReconcileOutcome::PaymentFailed)
        }
        EventKind::Unhandled => {
            tracing::debug!(event_type = %event.event_type, "Unhandled webhook event type");
            Ok(ReconcileOutcome::Ignored)
        }
    }
}

async fn mark_paid_from_notice(
    uow: &mut dyn UnitOfWork,
    notice: &PaymentNotice,
    now: i64,
) -> ServiceResult<ReconcileOutcome> {
    let Some(gateway_order_id) = notice.gateway_order_id.as_deref() else {
        tracing::error!(
            payment_id = notice.payment_id.as_deref().unwrap_or(""),
            "Payment event without a gateway order id"
        );
        return Ok(ReconcileOutcome::UnknownOrder);
    };

    let Some(mut order) = uow.lock_order_by_gateway_id(gateway_order_id).await? else {
        tracing::error!(gateway_order_id, "Payment for unknown gateway order");
        return Ok(ReconcileOutcome::UnknownOrder);
    };

    let paid_at = notice.occurred_at.unwrap_or(now);
    apply_payment(uow, &mut order, notice.to_payment_result(now), paid_at, now).await
}

async fn apply_payment(
    uow: &mut dyn UnitOfWork,
    order: &mut Order,
    result: PaymentResult,
    paid_at: i64,
    now: i64,
) -> ServiceResult<ReconcileOutcome> {
    if !order.record_payment(result, paid_at, now) {
        tracing::info!(order_id = order.id, "Order already paid, payment ignored");
        return Ok(ReconcileOutcome::AlreadyPaid { order_id: order.id });
    }
    if order.status.releases_stock() {
        tracing::error!(
            order_id = order.id,
            status = order.status.as_db(),
            "Payment captured for a closed order, refund required"
        );
    }
    uow.update_order(order).await?;
    tracing::info!(order_id = order.id, "Order marked paid");
    Ok(ReconcileOutcome::Paid { order_id: order.id })
}

/// Confirm a checkout from the client's gateway callback.
pub async fn verify_client_payment(
    store: &dyn Store,
    gateway_config: &GatewayConfig,
    user_id: i64,
    order_id: i64,
    req: VerifyPayment,
) -> ServiceResult<Order> {
    req.validate()?;
    if let Err(e) = verify_payment_signature(
        &req.gateway_order_id,
        &req.gateway_payment_id,
        &req.signature,
        &gateway_config.key_secret,
    ) {
        tracing::warn!(order_id, error = e, "Payment signature verification failed");
        return Err(AppError::new(ErrorCode::PaymentSignatureInvalid).into());
    }

    let mut uow = store.begin().await?;
    let result = verify_in(uow.as_mut(), user_id, order_id, &req).await;
    db::finish(uow, result).await
}

async fn verify_in(
    uow: &mut dyn UnitOfWork,
    user_id: i64,
    order_id: i64,
    req: &VerifyPayment,
) -> ServiceResult<Order> {
    let mut order = uow
        .lock_order(order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if order.user_id != user_id {
        return Err(AppError::permission_denied("Order belongs to another user").into());
    }
    if order.gateway_order_id.as_deref() != Some(req.gateway_order_id.as_str()) {
        return Err(AppError::new(ErrorCode::GatewayOrderMismatch)
            .with_detail("order_id", order_id)
            .into());
    }

    let now = now_millis();
    let result = PaymentResult {
        id: Some(req.gateway_payment_id.clone()),
        status: Some("captured".into()),
        update_time: Some(now),
        email_address: None,
    };
    apply_payment(uow, &mut order, result, now, now).await?;
    Ok(order)
}
