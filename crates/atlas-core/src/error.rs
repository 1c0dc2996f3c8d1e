//! # Error Types
//!
//! Domain error types for Atlas POS business logic.
//!
//! ## Error Philosophy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Error Handling Strategy                        │
//! │                                                                     │
//! │  CoreError        - business rule violations (insufficient stock,   │
//! │                     unknown product, conflicting concurrent write)  │
//! │  ValidationError  - malformed input caught before any state change  │
//! │                                                                     │
//! │  Infrastructure failures (SQL, connection pool) live in atlas-db;   │
//! │  this crate stays free of I/O error types.                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result alias for operations returning a domain error.
pub type CoreResult<T> = Result<T, CoreError>;

/// Business rule violations.
///
/// Every variant names the offending entity so the error message is usable
/// without extra context.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("customer not found: {0}")]
    CustomerNotFound(String),

    #[error("sale not found: {0}")]
    SaleNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A sale line or outbound movement asked for more than the ledger holds.
    /// Carries the product name (not id) because this message reaches the
    /// cashier directly.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    #[error("sale must contain at least one line")]
    EmptySale,

    /// A concurrent writer changed the row between read and guarded update,
    /// and the bounded retries were exhausted.
    #[error("conflicting concurrent update, please retry")]
    Conflict,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Input validation failures, raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("movement quantity is required for in/out movements")]
    MissingQuantity,

    #[error("new quantity is required for adjustment movements")]
    MissingNewQuantity,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            name: "Sugar 1kg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for Sugar 1kg: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_converts_to_core() {
        let err: CoreError = ValidationError::NotPositive {
            field: "quantity",
            value: -2,
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "quantity must be positive, got -2");
    }

    #[test]
    fn test_not_found_messages() {
        assert_eq!(
            CoreError::ProductNotFound("p-1".to_string()).to_string(),
            "product not found: p-1"
        );
        assert_eq!(
            CoreError::SaleNotFound("s-1".to_string()).to_string(),
            "sale not found: s-1"
        );
    }
}
