//! Money calculation utilities using rust_decimal for precision
//!
//! Every stored amount passes through [`round_money`] so totals compare exactly
//! at two decimal places.

use rust_decimal::prelude::*;

use crate::error::AppError;
use crate::models::order::OrderLine;

/// Monetary scale (2 decimal places, half away from zero)
pub const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed tax/shipping override
const MAX_SURCHARGE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round to the monetary scale
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `price * quantity`, rounded
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

/// Convert a major-unit amount to the gateway's minor unit (e.g. paise, cents).
///
/// Returns `None` when the amount has sub-minor precision or does not fit an i64.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let minor = amount * Decimal::ONE_HUNDRED;
    if !minor.fract().is_zero() {
        return None;
    }
    minor.to_i64()
}

/// Validate an optional tax/shipping override: defaults to zero, must be
/// non-negative and bounded.
pub fn surcharge(value: Option<Decimal>, field: &'static str) -> Result<Decimal, AppError> {
    let value = value.unwrap_or(Decimal::ZERO);
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::validation(format!("{field} must be non-negative"))
            .with_detail("field", field));
    }
    if value > MAX_SURCHARGE {
        return Err(
            AppError::validation(format!("{field} exceeds maximum allowed ({MAX_SURCHARGE})"))
                .with_detail("field", field),
        );
    }
    Ok(round_money(value))
}

/// Computed order amounts. Built once at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[OrderLine], tax_price: Decimal, shipping_price: Decimal) -> Self {
        let items_price = lines
            .iter()
            .map(|l| line_total(l.price, l.quantity))
            .fold(Decimal::ZERO, |acc, v| acc + v);
        let items_price = round_money(items_price);
        let tax_price = round_money(tax_price);
        let shipping_price = round_money(shipping_price);
        Self {
            items_price,
            tax_price,
            shipping_price,
            total_price: round_money(items_price + tax_price + shipping_price),
        }
    }
}
