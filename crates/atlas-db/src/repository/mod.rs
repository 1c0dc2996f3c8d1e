//! # Repository Modules
//!
//! One repository per aggregate. Each wraps the shared `SqlitePool` and owns
//! every query (and every transaction boundary) for its tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Caller ──► Repository ──► SQL ──► SQLite                           │
//! │                 │                                                   │
//! │                 └── domain types in, domain types out               │
//! │                     (no sqlx types leak past this layer)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod analytics;
pub mod category;
pub mod credit;
pub mod customer;
pub mod movement;
pub mod product;
pub mod sale;
pub mod user;
