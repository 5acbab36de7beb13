//! Webhook event payloads
//!
//! Only the fields reconciliation needs are modelled; everything else in the
//! gateway's event envelope is ignored.

use serde::Deserialize;
use shared::models::PaymentResult;

/// What a webhook event means for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Money was captured for a gateway order
    PaymentSucceeded,
    PaymentFailed,
    /// Anything else the gateway sends
    Unhandled,
}

impl EventKind {
    fn classify(event_type: &str) -> Self {
        match event_type {
            "payment.captured" | "order.paid" => Self::PaymentSucceeded,
            "payment.failed" => Self::PaymentFailed,
            _ => Self::Unhandled,
        }
    }
}

/// Payment details carried by an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentNotice {
    pub gateway_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    /// Event time (Unix millis)
    pub occurred_at: Option<i64>,
}

impl PaymentNotice {
    /// Payment result to store on the order
    pub fn to_payment_result(&self, fallback_time: i64) -> PaymentResult {
        PaymentResult {
            id: self.payment_id.clone(),
            status: Some(self.status.clone().unwrap_or_else(|| "captured".into())),
            update_time: Some(self.occurred_at.unwrap_or(fallback_time)),
            email_address: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_type: String,
    pub kind: EventKind,
    pub payment: PaymentNotice,
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(body)?;
        let payment = raw.payload.payment.map(|w| w.entity);
        let order = raw.payload.order.map(|w| w.entity);

        let gateway_order_id = payment
            .as_ref()
            .and_then(|p| p.order_id.clone())
            .or_else(|| order.as_ref().map(|o| o.id.clone()))
            .filter(|id| !id.is_empty());

        // Envelope timestamps are Unix seconds
        let occurred_at = raw
            .created_at
            .or_else(|| payment.as_ref().and_then(|p| p.created_at))
            .map(|secs| secs.saturating_mul(1000));

        let notice = PaymentNotice {
            gateway_order_id,
            payment_id: payment.as_ref().map(|p| p.id.clone()),
            status: payment.as_ref().and_then(|p| p.status.clone()),
            email: payment.and_then(|p| p.email),
            occurred_at,
        };

        Ok(Self {
            kind: EventKind::classify(&raw.event),
            event_type: raw.event,
            payment: notice,
        })
    }
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    payload: RawPayload,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Deserialize, Default)]
struct RawPayload {
    #[serde(default)]
    payment: Option<Wrapped<RawPayment>>,
    #[serde(default)]
    order: Option<Wrapped<RawOrder>>,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Deserialize)]
struct RawPayment {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Deserialize)]
struct RawOrder {
    id: String,
}
