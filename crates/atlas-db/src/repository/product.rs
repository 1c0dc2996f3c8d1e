//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Cache Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  products.stock_quantity is a CACHE over the movement ledger.       │
//! │                                                                     │
//! │  This repository never changes stock_quantity. Only the movement    │
//! │  and sale repositories do, and always inside a transaction that     │
//! │  writes the matching ledger entry.                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use atlas_core::{validation, CoreError, Paginated, Product};

use crate::error::DbResult;

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product and returns it with generated id and timestamps.
    pub async fn insert(&self, input: NewProduct) -> DbResult<Product> {
        validation::validate_non_empty("sku", &input.sku).map_err(CoreError::from)?;
        validation::validate_non_empty("name", &input.name).map_err(CoreError::from)?;
        validation::validate_non_negative_cents("price_cents", input.price_cents)
            .map_err(CoreError::from)?;
        validation::validate_non_negative_cents("stock_quantity", input.stock_quantity)
            .map_err(CoreError::from)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: input.sku,
            name: input.name,
            price_cents: input.price_cents,
            stock_quantity: input.stock_quantity,
            min_stock_level: input.min_stock_level,
            category_id: input.category_id,
            supplier_id: input.supplier_id,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents,
                stock_quantity, min_stock_level,
                category_id, supplier_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, or `ProductNotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let product: Option<Product> =
            sqlx::query_as("SELECT * FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        product.ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Gets a product by SKU, if one exists.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product: Option<Product> =
            sqlx::query_as("SELECT * FROM products WHERE sku = ?1")
                .bind(sku)
                .fetch_optional(&self.pool)
                .await?;

        Ok(product)
    }

    /// Lists products ordered by name, paginated.
    pub async fn list(&self, page: u32, limit: u32) -> DbResult<Paginated<Product>> {
        let page = validation::normalize_page(page);
        let limit = validation::clamp_limit(limit);
        let offset = (page - 1) as i64 * limit as i64;

        debug!(page, limit, "Listing products");

        let items: Vec<Product> = sqlx::query_as(
            "SELECT * FROM products ORDER BY name LIMIT ?1 OFFSET ?2",
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated {
            items,
            total,
            page,
            limit,
        })
    }

    /// Products at or below their reorder threshold but not yet out of stock.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let items: Vec<Product> = sqlx::query_as(
            r#"
            SELECT * FROM products
            WHERE stock_quantity > 0 AND stock_quantity <= min_stock_level
            ORDER BY stock_quantity ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Total number of products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Count of products with stock in (0, min_stock_level].
    pub async fn count_low_stock(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE stock_quantity > 0 AND stock_quantity <= min_stock_level
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Count of products with zero stock.
    pub async fn count_out_of_stock(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE stock_quantity = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
