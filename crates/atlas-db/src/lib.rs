//! # atlas-db: Database Layer for Atlas POS
//!
//! SQLite storage for the Atlas POS inventory core: the append-only stock
//! ledger, atomic sale transactions, credit payments, and the analytics
//! queries that aggregate them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Atlas POS Data Flow                            │
//! │                                                                     │
//! │  Caller (HTTP handler, CLI, test)                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                   atlas-db (THIS CRATE)                     │    │
//! │  │                                                             │    │
//! │  │   ┌────────────┐   ┌────────────────┐   ┌──────────────┐    │    │
//! │  │   │  Database  │   │  Repositories  │   │  Migrations  │    │    │
//! │  │   │ (pool.rs)  │◄──│ movement, sale │   │  (embedded)  │    │    │
//! │  │   │ SqlitePool │   │ credit, stats  │   │ 001_init.sql │    │    │
//! │  │   └────────────┘   └────────────────┘   └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite (WAL mode) - stock_movements is the source of truth,        │
//! │  products.stock_quantity is the cache over it                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//!
//! Every operation that touches more than one row runs inside a single
//! SQLite transaction: a sale either deducts all its stock, writes all its
//! ledger entries, and inserts all its rows, or none of them. Guarded
//! updates (`... WHERE stock_quantity = ?previous`) detect concurrent
//! writers and retry a bounded number of times.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atlas_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./atlas.db")).await?;
//! let sale = db.sales().create(&caller, lines).await?;
//! let trends = db.analytics().sales_trends(window).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::analytics::AnalyticsRepository;
pub use repository::credit::CreditPaymentRepository;
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
