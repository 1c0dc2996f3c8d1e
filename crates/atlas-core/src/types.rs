//! # Domain Types
//!
//! Core domain types used throughout Atlas POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌───────────────┐   ┌────────────────┐   ┌─────────────────┐       │
//! │  │    Product    │   │ StockMovement  │   │  Sale/SaleLine  │       │
//! │  │ ───────────── │   │ ────────────── │   │ ─────────────── │       │
//! │  │ stock cache   │◄──│ append-only    │──►│ immutable facts │       │
//! │  │ price_cents   │   │ ledger entry   │   │ line snapshots  │       │
//! │  └───────────────┘   └────────────────┘   └─────────────────┘       │
//! │                                                                     │
//! │  ┌───────────────┐   ┌────────────────┐   ┌─────────────────┐       │
//! │  │   Customer    │   │ CreditPayment  │   │  User / Caller  │       │
//! │  │ balance cache │◄──│ immutable fact │   │ role-scoped     │       │
//! │  └───────────────┘   └────────────────┘   │ read filters    │       │
//! │                                           └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cache + Ledger Pattern
//! `Product.stock_quantity` always equals the `resulting_quantity` of the
//! product's most recent stock movement (or its initial value when no
//! movement exists). The movement and sale services are the only writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Display name shown to cashier and on receipts.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Current stock level - the denormalized cache over the movement ledger.
    pub stock_quantity: i64,

    /// Reorder threshold; stock in (0, min_stock_level] counts as low stock.
    pub min_stock_level: i64,

    /// Optional category reference (reference data owned externally).
    pub category_id: Option<String>,

    /// Optional supplier reference (reference data owned externally).
    pub supplier_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity can be sold from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock_quantity
    }

    /// Value of the stock on hand (price × quantity).
    #[inline]
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.price_cents * self.stock_quantity)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The kind of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received (purchase, return); requires a positive quantity.
    In,
    /// Stock leaving (sale, wastage); requires a positive quantity.
    Out,
    /// Absolute correction to a counted quantity; requires new_quantity.
    Adjustment,
}

impl MovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is the only place an unknown movement type can appear; past this
/// boundary the enum makes bad kinds unrepresentable.
impl FromStr for MovementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(CoreError::InvalidMovementType(other.to_string())),
        }
    }
}

/// A single recorded change to a product's quantity.
///
/// ## Immutability
/// Movements form the audit trail: created once, never updated or deleted.
/// `resulting_quantity` of one entry equals `previous_quantity` of the
/// chronologically next entry for the same product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Amount moved, for `in`/`out` movements.
    pub quantity: Option<i64>,
    /// Absolute target, for `adjustment` movements.
    pub new_quantity: Option<i64>,
    /// Stock level before this movement was applied.
    pub previous_quantity: i64,
    /// Stock level after this movement was applied.
    pub resulting_quantity: i64,
    pub reason: Option<String>,
    /// What caused the movement: "sale", "purchase", "adjustment".
    pub reference_type: Option<String>,
    /// Id of the causing record (sale id, purchase id).
    pub reference_id: Option<String>,
    /// User who recorded the movement.
    pub recorded_by: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockMovement {
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: Option<i64>,
    pub new_quantity: Option<i64>,
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub recorded_by: String,
}

impl NewStockMovement {
    /// Convenience constructor for plain in/out movements.
    pub fn quantity_change(
        product_id: impl Into<String>,
        kind: MovementKind,
        quantity: i64,
        recorded_by: impl Into<String>,
    ) -> Self {
        NewStockMovement {
            product_id: product_id.into(),
            kind,
            quantity: Some(quantity),
            new_quantity: None,
            reason: None,
            reference_type: None,
            reference_id: None,
            recorded_by: recorded_by.into(),
        }
    }

    /// Convenience constructor for absolute adjustments.
    pub fn adjustment(
        product_id: impl Into<String>,
        new_quantity: i64,
        recorded_by: impl Into<String>,
    ) -> Self {
        NewStockMovement {
            product_id: product_id.into(),
            kind: MovementKind::Adjustment,
            quantity: None,
            new_quantity: Some(new_quantity),
            reason: None,
            reference_type: None,
            reference_id: None,
            recorded_by: recorded_by.into(),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable sale transaction header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Sum of line totals at creation time.
    pub total_cents: i64,
    pub cashier_id: String,
    pub cashier_name: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Uses the snapshot pattern: product name and price are frozen at sale time,
/// independent of later product edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    /// Position within the sale, preserving the submitted line order.
    pub position: i64,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub total_cents: i64,
}

/// Input for one line of a new sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl NewSaleLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents) * self.quantity
    }
}

/// A sale header together with its ordered lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithLines {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Customer & Credit Payment
// =============================================================================

/// A customer with a running credit balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit_cents: i64,
    /// Amount currently owed; only credit payments decrease it here.
    pub outstanding_balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn outstanding_balance(&self) -> Money {
        Money::from_cents(self.outstanding_balance_cents)
    }
}

/// An immutable payment fact against a customer's outstanding balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditPayment {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    /// Business date of the payment (may be backdated by the caller).
    pub date: DateTime<Utc>,
    pub note: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a credit payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCreditPayment {
    pub amount_cents: i64,
    pub date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub recorded_by: String,
}

// =============================================================================
// Users & Caller Identity
// =============================================================================

/// Roles recognized by the read-side scoping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// A user record, written by the external auth layer and read by analytics
/// (active-today counts) and sale attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller identity, supplied by the external auth layer.
///
/// ## Role-Scoped Reads
/// Read operations take the caller explicitly so the core can decide the
/// data filter (a cashier sees only their own sales) while authorization
/// *decisions* stay with the excluded auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl Caller {
    /// Whether this caller's sale reads are restricted to their own sales.
    #[inline]
    pub fn sees_own_sales_only(&self) -> bool {
        self.role == Role::Cashier
    }
}

// =============================================================================
// Reference Data
// =============================================================================

/// A product category (reference data owned by an external CRUD service).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a list operation, with the total count for paging UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================
