//! Order Model
//!
//! The order aggregate: lines, address, method and amounts are fixed at
//! creation; status, payment flags, payment result and delivery stamp are the
//! only fields that change afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, ErrorCode};

/// Order lifecycle status
///
/// `PendingPayment -> Processing -> Shipped -> Delivered`, with `Cancelled`
/// and `Failed` reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Gateway order opened, payment not confirmed yet
    PendingPayment,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(Self::PendingPayment),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// No further transitions are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// Awaiting payment confirmation
    pub fn is_unpaid_initial(&self) -> bool {
        matches!(self, Self::PendingPayment)
    }

    /// Entering this status gives the reserved stock back to inventory
    pub fn releases_stock(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed)
    }

    /// Goods are still reserved in the warehouse, not yet handed to a carrier
    pub fn holds_stock(&self) -> bool {
        matches!(self, Self::PendingPayment | Self::Processing)
    }
}

/// How the customer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Offline, collected at delivery
    CashOnDelivery,
    /// Routed through the payment gateway
    Online,
}

impl PaymentMethod {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::Online => "online",
        }
    }

    /// Parse the selector sent by clients (case-insensitive, common aliases)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash_on_delivery" | "cod" | "cash" => Some(Self::CashOnDelivery),
            "online" | "gateway" | "razorpay" => Some(Self::Online),
            _ => None,
        }
    }

    pub fn is_gateway_routed(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Shipping address. Everything but `address_line2` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100, message = "full_name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200, message = "address_line1 is required"))]
    pub address_line1: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, max = 20, message = "postal_code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100, message = "country is required"))]
    pub country: String,
    #[validate(length(min = 1, max = 30, message = "phone is required"))]
    pub phone: String,
}

impl ShippingAddress {
    /// Trim every field; a blank optional line becomes `None`
    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            address_line1: self.address_line1.trim().to_string(),
            address_line2: self
                .address_line2
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

/// Order line, copied from the fresh catalog read at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

/// Gateway payment outcome stored on the order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Gateway transaction/payment id
    pub id: Option<String>,
    /// Gateway status string (e.g. "captured")
    pub status: Option<String>,
    /// Settlement time (Unix millis)
    pub update_time: Option<i64>,
    /// Payer contact
    pub email_address: Option<String>,
}

/// Partial payment result; present fields overwrite stored ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResultPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub update_time: Option<i64>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Gateway status strings that mean the money was taken
pub fn is_success_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "captured" | "paid" | "completed" | "succeeded" | "success"
    )
}

/// Outcome of checking a requested status against the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Already in the requested status
    Unchanged,
    Changed { restore_stock: bool },
}

/// Order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<i64>,
    pub payment_result: Option<PaymentResult>,
    /// Set only when a gateway order was opened
    pub gateway_order_id: Option<String>,
    pub delivered_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Stored total matches its components
    pub fn totals_consistent(&self) -> bool {
        self.total_price == self.items_price + self.tax_price + self.shipping_price
    }

    /// Check a requested status against the current one.
    pub fn status_change(&self, to: OrderStatus) -> Result<StatusChange, AppError> {
        if self.status == to {
            return Ok(StatusChange::Unchanged);
        }
        if self.status.is_terminal() {
            return Err(self.transition_error(to));
        }
        if to == OrderStatus::PendingPayment && (self.is_paid || self.gateway_order_id.is_none())
        {
            return Err(self.transition_error(to));
        }
        Ok(StatusChange::Changed {
            restore_stock: to.releases_stock() && self.status.holds_stock(),
        })
    }

    fn transition_error(&self, to: OrderStatus) -> AppError {
        AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!(
                "Cannot change order status from {} to {}",
                self.status.as_db(),
                to.as_db()
            ),
        )
        .with_detail("from", self.status.as_db())
        .with_detail("to", to.as_db())
    }

    /// Set the status; entering `Delivered` stamps `delivered_at` once
    pub fn set_status(&mut self, to: OrderStatus, now: i64) {
        self.status = to;
        if to == OrderStatus::Delivered && self.delivered_at.is_none() {
            self.delivered_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Record a confirmed gateway payment.
    ///
    /// Returns `false` without touching anything when the order is already paid.
    pub fn record_payment(&mut self, result: PaymentResult, paid_at: i64, now: i64) -> bool {
        if self.is_paid {
            return false;
        }
        self.is_paid = true;
        self.paid_at = Some(paid_at);
        self.payment_result = Some(result);
        if self.status.is_unpaid_initial() {
            self.status = OrderStatus::Processing;
        }
        self.updated_at = now;
        true
    }

    /// Explicit paid flag from an administrator
    pub fn override_paid(&mut self, paid: bool, now: i64) {
        if paid {
            self.is_paid = true;
            if self.paid_at.is_none() {
                self.paid_at = Some(now);
            }
        } else {
            self.is_paid = false;
            self.paid_at = None;
        }
        self.updated_at = now;
    }

    /// Merge a payment result patch; a success status marks the order paid
    pub fn merge_payment_result(&mut self, patch: PaymentResultPatch, now: i64) {
        let succeeded = patch.status.as_deref().is_some_and(is_success_status);
        let result = self.payment_result.get_or_insert_with(PaymentResult::default);
        if let Some(id) = patch.id {
            result.id = Some(id);
        }
        if let Some(status) = patch.status {
            result.status = Some(status);
        }
        if let Some(update_time) = patch.update_time {
            result.update_time = Some(update_time);
        }
        if let Some(email) = patch.email_address {
            result.email_address = Some(email);
        }
        if succeeded {
            self.is_paid = true;
            if self.paid_at.is_none() {
                self.paid_at = Some(now);
            }
            if self.status.is_unpaid_initial() {
                self.status = OrderStatus::Processing;
            }
        }
        self.updated_at = now;
    }

    /// A paid order may not sit in an awaiting-payment status
    pub fn enforce_paid_invariant(&mut self) {
        if self.is_paid && self.status.is_unpaid_initial() {
            self.status = OrderStatus::Processing;
        }
    }
}

// ==================== Request / Response payloads ====================

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddress,
    /// `cash_on_delivery` or `online` (see [`PaymentMethod::parse`])
    pub payment_method: String,
    #[serde(default)]
    pub tax_price: Option<Decimal>,
    #[serde(default)]
    pub shipping_price: Option<Decimal>,
}

/// Parameters the client needs to complete a gateway payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub gateway_order_id: String,
    /// Amount in the currency's minor unit
    pub amount: i64,
    pub currency: String,
    /// Public key id for the client checkout widget
    pub key_id: String,
}

/// Create order response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<GatewayPayment>,
}

/// Admin status update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub is_paid: Option<bool>,
    #[serde(default)]
    pub payment_result: Option<PaymentResultPatch>,
}

/// Client-side payment confirmation payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyPayment {
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    #[validate(length(min = 1))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".into(),
            address_line1: "12 Analytical St".into(),
            address_line2: None,
            city: "London".into(),
            state: "Greater London".into(),
            postal_code: "NW1".into(),
            country: "UK".into(),
            phone: "+44 20 0000".into(),
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 1,
            user_id: 2,
            lines: vec![OrderLine {
                product_id: 3,
                name: "Mug".into(),
                image: None,
                price: dec!(10.00),
                quantity: 2,
            }],
            shipping_address: address(),
            payment_method: PaymentMethod::Online,
            items_price: dec!(20.00),
            tax_price: dec!(1.00),
            shipping_price: dec!(2.00),
            total_price: dec!(23.00),
            status,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            gateway_order_id: Some("gw_1".into()),
            delivered_at: None,
            created_at: 100,
            updated_at: 100,
        }
    }

    #[test]
    fn test_status_db_round_trip() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("paid"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(
            PaymentMethod::parse("COD"),
            Some(PaymentMethod::CashOnDelivery)
        );
        assert_eq!(PaymentMethod::parse(" online "), Some(PaymentMethod::Online));
        assert_eq!(PaymentMethod::parse("bitcoin"), None);
    }

    #[test]
    fn test_address_validation_and_normalization() {
        assert!(address().validate().is_ok());

        let mut blank = address();
        blank.city = "   ".into();
        blank.address_line2 = Some("  ".into());
        let normalized = blank.normalized();
        assert_eq!(normalized.address_line2, None);
        let errors = normalized.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("city"));
    }

    #[test]
    fn test_record_payment_is_idempotent() {
        let mut o = order(OrderStatus::PendingPayment);
        let result = PaymentResult {
            id: Some("pay_1".into()),
            status: Some("captured".into()),
            update_time: Some(500),
            email_address: Some("ada@example.com".into()),
        };
        assert!(o.record_payment(result.clone(), 500, 600));
        assert!(o.is_paid);
        assert_eq!(o.paid_at, Some(500));
        assert_eq!(o.status, OrderStatus::Processing);

        let other = PaymentResult {
            id: Some("pay_2".into()),
            ..result.clone()
        };
        assert!(!o.record_payment(other, 900, 900));
        assert_eq!(o.paid_at, Some(500));
        assert_eq!(o.payment_result, Some(result));
        assert_eq!(o.updated_at, 600);
    }

    #[test]
    fn test_record_payment_keeps_later_status() {
        let mut o = order(OrderStatus::Shipped);
        assert!(o.record_payment(PaymentResult::default(), 1, 1));
        assert_eq!(o.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_status_change_rules() {
        let o = order(OrderStatus::Processing);
        assert_eq!(
            o.status_change(OrderStatus::Processing).unwrap(),
            StatusChange::Unchanged
        );
        assert_eq!(
            o.status_change(OrderStatus::Cancelled).unwrap(),
            StatusChange::Changed {
                restore_stock: true
            }
        );
        assert_eq!(
            o.status_change(OrderStatus::Shipped).unwrap(),
            StatusChange::Changed {
                restore_stock: false
            }
        );

        let shipped = order(OrderStatus::Shipped);
        assert_eq!(
            shipped.status_change(OrderStatus::Cancelled).unwrap(),
            StatusChange::Changed {
                restore_stock: false
            }
        );

        let cancelled = order(OrderStatus::Cancelled);
        assert_eq!(
            cancelled.status_change(OrderStatus::Cancelled).unwrap(),
            StatusChange::Unchanged
        );
        let err = cancelled.status_change(OrderStatus::Processing).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[test]
    fn test_cannot_return_to_pending_payment_once_paid() {
        let mut o = order(OrderStatus::Processing);
        o.is_paid = true;
        o.paid_at = Some(1);
        assert!(o.status_change(OrderStatus::PendingPayment).is_err());

        let mut cod = order(OrderStatus::Processing);
        cod.gateway_order_id = None;
        assert!(cod.status_change(OrderStatus::PendingPayment).is_err());
    }

    #[test]
    fn test_delivered_stamps_once() {
        let mut o = order(OrderStatus::Shipped);
        o.set_status(OrderStatus::Delivered, 700);
        assert_eq!(o.delivered_at, Some(700));
        o.set_status(OrderStatus::Delivered, 800);
        assert_eq!(o.delivered_at, Some(700));
    }

    #[test]
    fn test_override_paid_stamps_and_clears() {
        let mut o = order(OrderStatus::Processing);
        o.override_paid(true, 10);
        assert_eq!(o.paid_at, Some(10));
        o.override_paid(true, 20);
        assert_eq!(o.paid_at, Some(10));
        o.override_paid(false, 30);
        assert!(!o.is_paid);
        assert_eq!(o.paid_at, None);
    }

    #[test]
    fn test_merge_payment_result_success_marks_paid() {
        let mut o = order(OrderStatus::PendingPayment);
        o.merge_payment_result(
            PaymentResultPatch {
                id: Some("pay_9".into()),
                status: Some("COMPLETED".into()),
                ..Default::default()
            },
            50,
        );
        assert!(o.is_paid);
        assert_eq!(o.paid_at, Some(50));
        assert_eq!(o.status, OrderStatus::Processing);

        o.merge_payment_result(
            PaymentResultPatch {
                email_address: Some("x@example.com".into()),
                ..Default::default()
            },
            60,
        );
        let result = o.payment_result.unwrap();
        assert_eq!(result.id.as_deref(), Some("pay_9"));
        assert_eq!(result.email_address.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn test_merge_payment_result_non_success_keeps_unpaid() {
        let mut o = order(OrderStatus::PendingPayment);
        o.merge_payment_result(
            PaymentResultPatch {
                status: Some("failed".into()),
                ..Default::default()
            },
            50,
        );
        assert!(!o.is_paid);
        assert_eq!(o.status, OrderStatus::PendingPayment);
    }

    #[test]
    fn test_enforce_paid_invariant() {
        let mut o = order(OrderStatus::PendingPayment);
        o.is_paid = true;
        o.paid_at = Some(1);
        o.enforce_paid_invariant();
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn test_totals_consistent() {
        let mut o = order(OrderStatus::Processing);
        assert!(o.totals_consistent());
        o.total_price = dec!(22.99);
        assert!(!o.totals_consistent());
    }
}
