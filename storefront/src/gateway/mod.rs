//! Payment gateway integration via REST API (no SDK dependency)
//!
//! The gateway is Razorpay-shaped: orders are opened with `POST /orders`
//! (amount in the currency's minor unit), webhooks are signed with
//! HMAC-SHA256 over the raw body, and client checkouts are confirmed with
//! HMAC-SHA256 over `"{order_id}|{payment_id}"`.

pub mod event;
mod razorpay;

#[cfg(test)]
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub use razorpay::RazorpayGateway;

/// Header carrying the webhook body signature
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";
/// Header carrying the unique delivery/event id
pub const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Gateway credentials and client settings
#[derive(Clone)]
pub struct GatewayConfig {
    /// Public key id, also handed to the checkout widget
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub base_url: String,
    /// ISO currency code orders are opened in
    pub currency: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gateway call failures
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("gateway response missing {0}")]
    Malformed(&'static str),
}

/// `POST /orders` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGatewayOrder {
    /// Minor units (paise, cents)
    pub amount: i64,
    pub currency: String,
    /// Merchant reference, our order id
    pub receipt: String,
}

/// Gateway-side order handle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a gateway order the client can pay against
    async fn create_order(
        &self,
        request: &CreateGatewayOrder,
    ) -> Result<GatewayOrder, GatewayError>;
}

/// Verify the webhook body signature (hex HMAC-SHA256 of the raw body)
pub fn verify_webhook_signature(
    payload: &[u8],
    signature: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_hex_hmac(payload, signature, secret)
}

/// Verify a checkout confirmation sent by the client
pub fn verify_payment_signature(
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> Result<(), &'static str> {
    let message = format!("{gateway_order_id}|{payment_id}");
    verify_hex_hmac(message.as_bytes(), signature, key_secret)
}

fn verify_hex_hmac(message: &[u8], signature: &str, secret: &str) -> Result<(), &'static str> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err("Empty signature");
    }
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(message);

    // Constant-time comparison
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes).map_err(|_| "Signature mismatch")
}

/// Hex HMAC-SHA256, as the gateway computes it
#[cfg(test)]
pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}
