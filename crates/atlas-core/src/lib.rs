//! # atlas-core: Pure Business Logic for Atlas POS
//!
//! This crate is the **heart** of Atlas POS. It contains all business rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Atlas POS Architecture                         │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                 Transport / Auth (external)                 │    │
//! │  │      HTTP routing, request validation, caller identity      │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │              ★ atlas-core (THIS CRATE) ★                    │    │
//! │  │                                                             │    │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────────────┐     │    │
//! │  │   │  types  │  │  money  │  │ period  │  │ validation │     │    │
//! │  │   │ Product │  │  Money  │  │ Window  │  │   rules    │     │    │
//! │  │   │  Sale   │  │  cents  │  │ 7d/30d  │  │   checks   │     │    │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └────────────┘     │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │    │
//! │  └────────────────────────────┬────────────────────────────────┘    │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐    │
//! │  │                  atlas-db (Database Layer)                  │    │
//! │  │        SQLite queries, migrations, the stock ledger         │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Sale, Customer, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`period`] - Analytics period-window resolution
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation

pub mod error;
pub mod money;
pub mod period;
pub mod types;
pub mod validation;

// Re-exports for convenience: `use atlas_core::Money` instead of
// `use atlas_core::money::Money`.
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use period::{Period, Window};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fixed profit margin used by analytics estimates.
///
/// ## Why a constant?
/// There is no per-product cost basis in this system, so profit figures are
/// estimated at a flat 20% of revenue. Keep this in sync with any future
/// cost-tracking work.
pub const PROFIT_MARGIN: f64 = 0.20;

/// Outstanding-balance floor for the Premium customer segment, in cents.
pub const PREMIUM_BALANCE_CENTS: i64 = 100_000 * 100;

/// Outstanding-balance floor for the Regular customer segment, in cents.
pub const REGULAR_BALANCE_CENTS: i64 = 50_000 * 100;

/// Smallest accepted credit payment (one cent).
pub const MIN_PAYMENT_CENTS: i64 = 1;

/// Hard cap on `limit` for all paginated list operations.
pub const MAX_PAGE_LIMIT: u32 = 200;
