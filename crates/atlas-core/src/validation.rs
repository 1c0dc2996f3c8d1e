//! # Validation Module
//!
//! Input validation rules applied before any state change.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  VALIDATE EARLY, FAIL FAST                                          │
//! │                                                                     │
//! │  Input ──► validation (this module) ──► transaction ──► ledger      │
//! │               │                                                     │
//! │               └── ValidationError: nothing written, no retries      │
//! │                                                                     │
//! │  Stock sufficiency is NOT checked here. It depends on current DB    │
//! │  state and must be decided inside the transaction that changes it.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{MovementKind, NewCreditPayment, NewSaleLine, NewStockMovement};
use crate::{MAX_PAGE_LIMIT, MIN_PAYMENT_CENTS};

/// Validates a non-empty text field.
pub fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Validates a strictly positive quantity.
pub fn validate_quantity(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

/// Validates a non-negative amount in cents.
pub fn validate_non_negative_cents(
    field: &'static str,
    value: i64,
) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Validates a stock movement input: in/out need a positive quantity,
/// adjustments need a non-negative target quantity.
pub fn validate_movement(input: &NewStockMovement) -> Result<(), ValidationError> {
    validate_non_empty("product_id", &input.product_id)?;
    validate_non_empty("recorded_by", &input.recorded_by)?;

    match input.kind {
        MovementKind::In | MovementKind::Out => match input.quantity {
            Some(qty) => validate_quantity("quantity", qty),
            None => Err(ValidationError::MissingQuantity),
        },
        MovementKind::Adjustment => match input.new_quantity {
            Some(qty) => validate_non_negative_cents("new_quantity", qty),
            None => Err(ValidationError::MissingNewQuantity),
        },
    }
}

/// Validates a single sale line.
pub fn validate_sale_line(line: &NewSaleLine) -> Result<(), ValidationError> {
    validate_non_empty("product_id", &line.product_id)?;
    validate_non_empty("product_name", &line.product_name)?;
    validate_quantity("quantity", line.quantity)?;
    validate_non_negative_cents("unit_price_cents", line.unit_price_cents)
}

/// Validates a credit payment amount (at least one cent).
pub fn validate_payment(input: &NewCreditPayment) -> Result<(), ValidationError> {
    validate_non_empty("recorded_by", &input.recorded_by)?;
    if input.amount_cents < MIN_PAYMENT_CENTS {
        return Err(ValidationError::NotPositive {
            field: "amount_cents",
            value: input.amount_cents,
        });
    }
    Ok(())
}

/// Normalizes a page number: anything below 1 becomes 1.
#[inline]
pub fn normalize_page(page: u32) -> u32 {
    page.max(1)
}

/// Clamps a page limit into 1..=MAX_PAGE_LIMIT.
#[inline]
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_PAGE_LIMIT)
}

// =============================================================================
// Unit Tests
// =============================================================================
