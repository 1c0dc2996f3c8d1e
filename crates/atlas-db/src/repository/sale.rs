//! # Sale Repository
//!
//! Atomic sale processing and sale reads.
//!
//! ## Sale Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  create(caller, lines)                                              │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN TRANSACTION                                                  │
//! │                                                                     │
//! │  PASS 1 - validate everything, write nothing                        │
//! │    for each product: requested total ≤ current stock?               │
//! │    (quantities for the same product across lines are summed)        │
//! │                                                                     │
//! │  PASS 2 - write everything                                          │
//! │    insert sale header (total = Σ line totals)                       │
//! │    for each line:                                                   │
//! │      UPDATE products SET stock_quantity = stock_quantity - qty      │
//! │        WHERE id = ? AND stock_quantity >= qty      ← guard          │
//! │      INSERT 'out' ledger entry (reference: sale)                    │
//! │      INSERT sale line (name + price frozen, ordered by position)    │
//! │                                                                     │
//! │  COMMIT ← all rows or none                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed line in pass 1 aborts before any write, so a rejected sale
//! leaves stock, ledger, and sale tables untouched. Busy/locked errors
//! from concurrent writers roll the transaction back and retry, up to
//! MAX_RETRIES times, before surfacing `Conflict`.

use chrono::Utc;
use sqlx::{SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use atlas_core::period::Window;
use atlas_core::{
    validation, Caller, CoreError, MovementKind, NewSaleLine, Paginated, Product, Sale, SaleLine,
    SaleWithLines,
};

use crate::error::DbResult;

/// Attempts before a lock-contended sale gives up with `Conflict`.
const MAX_RETRIES: u32 = 3;

/// Today's headline figures for the dashboard, scoped to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TodayStats {
    pub revenue_cents: i64,
    pub transactions: i64,
    pub items_sold: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Processes a sale atomically: validates every line against current
    /// stock, then deducts stock, writes one `out` ledger entry per line,
    /// and inserts the sale with its lines - all in one transaction.
    ///
    /// ## Errors
    /// - `EmptySale` - no lines
    /// - `ProductNotFound` - a line references an unknown product
    /// - `InsufficientStock` - requested quantity exceeds stock (quantities
    ///   for the same product across lines count together)
    /// - `Validation` - malformed line input
    /// - `Conflict` - database locked by concurrent writers on every retry
    pub async fn create(&self, caller: &Caller, lines: Vec<NewSaleLine>) -> DbResult<SaleWithLines> {
        if lines.is_empty() {
            return Err(CoreError::EmptySale.into());
        }
        for line in &lines {
            validation::validate_sale_line(line).map_err(CoreError::from)?;
        }

        for attempt in 1..=MAX_RETRIES {
            match self.try_create(caller, &lines).await {
                Ok(sale) => {
                    info!(
                        sale_id = %sale.sale.id,
                        cashier = %caller.name,
                        total_cents = sale.sale.total_cents,
                        lines = sale.lines.len(),
                        "Sale completed"
                    );
                    return Ok(sale);
                }
                // Lock contention from a concurrent writer; the transaction
                // rolled back, retry against the new state.
                Err(err) if err.is_retryable() => {
                    warn!(attempt, "Database locked by concurrent writer, retrying sale");
                }
                Err(err) => return Err(err),
            }
        }

        Err(CoreError::Conflict.into())
    }

    /// One attempt at the sale transaction.
    async fn try_create(&self, caller: &Caller, lines: &[NewSaleLine]) -> DbResult<SaleWithLines> {
        let mut tx = self.pool.begin().await?;

        // Pass 1: check every product against its current stock, summing
        // quantities when a product appears on multiple lines.
        let mut required: Vec<(String, i64)> = Vec::new();
        for line in lines {
            match required.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => required.push((line.product_id.clone(), line.quantity)),
            }
        }

        for (product_id, requested) in &required {
            let product: Option<Product> =
                sqlx::query_as("SELECT * FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let product = product
                .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

            if !product.can_sell(*requested) {
                return Err(CoreError::InsufficientStock {
                    name: product.name,
                    available: product.stock_quantity,
                    requested: *requested,
                }
                .into());
            }
        }

        // Pass 2: all checks passed against this transaction's snapshot,
        // write the sale.
        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let total_cents: i64 = lines.iter().map(|l| l.unit_price_cents * l.quantity).sum();

        debug!(sale_id = %sale_id, lines = lines.len(), total_cents, "Creating sale");

        sqlx::query(
            r#"
            INSERT INTO sales (id, total_cents, cashier_id, cashier_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sale_id)
        .bind(total_cents)
        .bind(&caller.user_id)
        .bind(&caller.name)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut stored_lines = Vec::with_capacity(lines.len());
        for (position, line) in lines.iter().enumerate() {
            self.deduct_and_record(&mut tx, caller, &sale_id, line).await?;

            let stored = SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                position: position as i64,
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                total_cents: line.unit_price_cents * line.quantity,
            };

            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    id, sale_id, position, product_id, product_name,
                    quantity, unit_price_cents, total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&stored.id)
            .bind(&stored.sale_id)
            .bind(stored.position)
            .bind(&stored.product_id)
            .bind(&stored.product_name)
            .bind(stored.quantity)
            .bind(stored.unit_price_cents)
            .bind(stored.total_cents)
            .execute(&mut *tx)
            .await?;

            stored_lines.push(stored);
        }

        tx.commit().await?;

        Ok(SaleWithLines {
            sale: Sale {
                id: sale_id,
                total_cents,
                cashier_id: caller.user_id.clone(),
                cashier_name: caller.name.clone(),
                created_at: now,
            },
            lines: stored_lines,
        })
    }

    /// Deducts one line's quantity and appends the matching ledger entry.
    ///
    /// The `stock_quantity >= qty` guard re-checks sufficiency at write
    /// time; earlier lines in the same sale may already have lowered the
    /// stock this line needs.
    async fn deduct_and_record(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        caller: &Caller,
        sale_id: &str,
        line: &NewSaleLine,
    ) -> DbResult<()> {
        let snapshot: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock_quantity FROM products WHERE id = ?1")
                .bind(&line.product_id)
                .fetch_optional(&mut **tx)
                .await?;

        let (name, previous) = snapshot
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let now = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE products SET stock_quantity = stock_quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                name,
                available: previous,
                requested: line.quantity,
            }
            .into());
        }

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, kind, quantity, new_quantity,
                previous_quantity, resulting_quantity,
                reason, reference_type, reference_id,
                recorded_by, date, created_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, NULL, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&line.product_id)
        .bind(MovementKind::Out)
        .bind(line.quantity)
        .bind(previous)
        .bind(previous - line.quantity)
        .bind("sale")
        .bind(sale_id)
        .bind(&caller.user_id)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Gets a sale with its ordered lines, or `SaleNotFound`.
    pub async fn get(&self, id: &str) -> DbResult<SaleWithLines> {
        let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let sale = sale.ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let lines: Vec<SaleLine> =
            sqlx::query_as("SELECT * FROM sale_lines WHERE sale_id = ?1 ORDER BY position")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(SaleWithLines { sale, lines })
    }

    /// Lists sales newest first, paginated.
    pub async fn list(&self, page: u32, limit: u32) -> DbResult<Paginated<Sale>> {
        let page = validation::normalize_page(page);
        let limit = validation::clamp_limit(limit);
        let offset = (page - 1) as i64 * limit as i64;

        let items: Vec<Sale> =
            sqlx::query_as("SELECT * FROM sales ORDER BY created_at DESC LIMIT ?1 OFFSET ?2")
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated {
            items,
            total,
            page,
            limit,
        })
    }

    /// Today's revenue, transaction count, and items sold.
    ///
    /// ## Role Scoping
    /// Cashiers see only their own sales; admins and managers see all.
    pub async fn today_stats(&self, caller: &Caller) -> DbResult<TodayStats> {
        let window = Window::single_day(Utc::now().date_naive());
        let scoped = caller.sees_own_sales_only();

        let header_sql = if scoped {
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM sales
            WHERE created_at BETWEEN ?1 AND ?2 AND cashier_id = ?3
            "#
        } else {
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM sales
            WHERE created_at BETWEEN ?1 AND ?2
            "#
        };

        let mut header = sqlx::query_as::<_, (i64, i64)>(header_sql)
            .bind(window.start)
            .bind(window.end);
        if scoped {
            header = header.bind(&caller.user_id);
        }
        let (transactions, revenue_cents) = header.fetch_one(&self.pool).await?;

        let items_sql = if scoped {
            r#"
            SELECT COALESCE(SUM(l.quantity), 0)
            FROM sale_lines l JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at BETWEEN ?1 AND ?2 AND s.cashier_id = ?3
            "#
        } else {
            r#"
            SELECT COALESCE(SUM(l.quantity), 0)
            FROM sale_lines l JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at BETWEEN ?1 AND ?2
            "#
        };

        let mut items = sqlx::query_scalar::<_, i64>(items_sql)
            .bind(window.start)
            .bind(window.end);
        if scoped {
            items = items.bind(&caller.user_id);
        }
        let items_sold = items.fetch_one(&self.pool).await?;

        Ok(TodayStats {
            revenue_cents,
            transactions,
            items_sold,
        })
    }

    /// Most recent sales, newest first, scoped to the caller.
    pub async fn recent(&self, caller: &Caller, limit: u32) -> DbResult<Vec<Sale>> {
        let limit = validation::clamp_limit(limit);

        let sales: Vec<Sale> = if caller.sees_own_sales_only() {
            sqlx::query_as(
                "SELECT * FROM sales WHERE cashier_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .bind(&caller.user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as("SELECT * FROM sales ORDER BY created_at DESC LIMIT ?1")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use crate::DbError;
    use atlas_core::Role;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cashier(id: &str) -> Caller {
        Caller {
            user_id: id.to_string(),
            name: format!("Cashier {id}"),
            role: Role::Cashier,
        }
    }

    fn manager() -> Caller {
        Caller {
            user_id: "mgr".to_string(),
            name: "Manager".to_string(),
            role: Role::Manager,
        }
    }

    async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> String {
        db.products()
            .insert(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                price_cents,
                stock_quantity: stock,
                min_stock_level: 0,
                category_id: None,
                supplier_id: None,
            })
            .await
            .unwrap()
            .id
    }

    fn line(product_id: &str, price_cents: i64, quantity: i64) -> NewSaleLine {
        NewSaleLine {
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            unit_price_cents: price_cents,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_sale_totals_stock_and_ledger() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 10).await;
        let p2 = seed_product(&db, "B", 500, 10).await;

        let sale = db
            .sales()
            .create(&cashier("c1"), vec![line(&p1, 1000, 2), line(&p2, 500, 1)])
            .await
            .unwrap();

        // 2 × 10.00 + 1 × 5.00 = 25.00
        assert_eq!(sale.sale.total_cents, 2500);
        assert_eq!(sale.lines.len(), 2);
        assert_eq!(sale.lines[0].position, 0);
        assert_eq!(sale.lines[1].position, 1);

        assert_eq!(db.products().get(&p1).await.unwrap().stock_quantity, 8);
        assert_eq!(db.products().get(&p2).await.unwrap().stock_quantity, 9);

        // One 'out' ledger entry per line, tied back to the sale.
        let ledger = db.movements().list_for_product(&p1, 1, 50).await.unwrap();
        assert_eq!(ledger.total, 1);
        assert_eq!(ledger.items[0].kind, MovementKind::Out);
        assert_eq!(ledger.items[0].reference_type.as_deref(), Some("sale"));
        assert_eq!(ledger.items[0].reference_id.as_deref(), Some(sale.sale.id.as_str()));
        assert_eq!(ledger.items[0].previous_quantity, 10);
        assert_eq!(ledger.items[0].resulting_quantity, 8);
    }

    #[tokio::test]
    async fn test_empty_sale_rejected() {
        let db = test_db().await;

        let err = db.sales().create(&cashier("c1"), vec![]).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptySale)));
    }

    #[tokio::test]
    async fn test_failed_line_aborts_whole_sale() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 10).await;
        let p2 = seed_product(&db, "B", 500, 1).await;

        let err = db
            .sales()
            .create(&cashier("c1"), vec![line(&p1, 1000, 2), line(&p2, 500, 5)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 5, .. })
        ));

        // Nothing written: stock untouched, no sale, no ledger entries.
        assert_eq!(db.products().get(&p1).await.unwrap().stock_quantity, 10);
        assert_eq!(db.products().get(&p2).await.unwrap().stock_quantity, 1);
        assert_eq!(db.sales().list(1, 10).await.unwrap().total, 0);
        assert_eq!(db.movements().list_for_product(&p1, 1, 50).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_product_lines_count_together() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 3).await;

        // 2 + 2 = 4 requested against 3 in stock.
        let err = db
            .sales()
            .create(&cashier("c1"), vec![line(&p1, 1000, 2), line(&p1, 1000, 2)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 3, requested: 4, .. })
        ));

        // 2 + 1 = 3 fits exactly.
        let sale = db
            .sales()
            .create(&cashier("c1"), vec![line(&p1, 1000, 2), line(&p1, 1000, 1)])
            .await
            .unwrap();
        assert_eq!(sale.sale.total_cents, 3000);
        assert_eq!(db.products().get(&p1).await.unwrap().stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let db = test_db().await;

        let err = db.sales().get("nope").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::SaleNotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_line_snapshot_survives_lookup() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 10).await;

        let created = db
            .sales()
            .create(&cashier("c1"), vec![line(&p1, 1000, 2)])
            .await
            .unwrap();

        let fetched = db.sales().get(&created.sale.id).await.unwrap();
        assert_eq!(fetched.sale.total_cents, 2000);
        assert_eq!(fetched.lines.len(), 1);
        assert_eq!(fetched.lines[0].product_name, format!("Product {p1}"));
        assert_eq!(fetched.lines[0].unit_price_cents, 1000);
    }

    #[tokio::test]
    async fn test_cashier_scoping() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 100).await;

        let c1 = cashier("c1");
        let c2 = cashier("c2");
        db.sales().create(&c1, vec![line(&p1, 1000, 1)]).await.unwrap();
        db.sales().create(&c2, vec![line(&p1, 1000, 2)]).await.unwrap();
        db.sales().create(&c2, vec![line(&p1, 1000, 3)]).await.unwrap();

        let own = db.sales().today_stats(&c1).await.unwrap();
        assert_eq!(own.transactions, 1);
        assert_eq!(own.revenue_cents, 1000);
        assert_eq!(own.items_sold, 1);

        let all = db.sales().today_stats(&manager()).await.unwrap();
        assert_eq!(all.transactions, 3);
        assert_eq!(all.revenue_cents, 6000);
        assert_eq!(all.items_sold, 6);

        assert_eq!(db.sales().recent(&c2, 10).await.unwrap().len(), 2);
        assert_eq!(db.sales().recent(&manager(), 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_sales_never_oversell() {
        let db = test_db().await;
        let p1 = seed_product(&db, "A", 1000, 3).await;

        let mut handles = Vec::new();
        for i in 0..4 {
            let db = db.clone();
            let p1 = p1.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .create(&cashier(&format!("c{i}")), vec![line(&p1, 1000, 1)])
                    .await
            }));
        }

        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(insufficient, 1);
        assert_eq!(db.products().get(&p1).await.unwrap().stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sales_on_shared_file_never_oversell() {
        // A file-backed pool with several connections: concurrent sales hit
        // real lock contention, which must resolve to a domain outcome
        // (success, insufficient stock, or conflict after retries) rather
        // than a raw locked-database error.
        let path = std::env::temp_dir().join(format!("atlas-sales-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let p1 = seed_product(&db, "A", 1000, 8).await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let db = db.clone();
            let p1 = p1.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .create(&cashier(&format!("c{i}")), vec![line(&p1, 1000, 1)])
                    .await
            }));
        }

        let mut sold: i64 = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => {}
                Err(DbError::Domain(CoreError::Conflict)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // Never more units sold than were in stock, and the remaining stock
        // accounts for every committed sale.
        assert!(sold <= 8);
        let remaining = db.products().get(&p1).await.unwrap().stock_quantity;
        assert_eq!(remaining, 8 - sold);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
