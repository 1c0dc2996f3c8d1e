//! # Stock Movement Repository
//!
//! The ledger writer: every quantity change flows through `apply`.
//!
//! ## Write Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  apply(movement)                                                    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN TRANSACTION                                                  │
//! │    1. read product snapshot (name, stock_quantity)                  │
//! │    2. compute resulting quantity                                    │
//! │         in         → previous + quantity                            │
//! │         out        → previous - quantity  (reject if negative)      │
//! │         adjustment → new_quantity                                   │
//! │    3. UPDATE products SET stock_quantity = resulting                │
//! │       WHERE id = ? AND stock_quantity = previous   ← guard          │
//! │    4. INSERT ledger row (previous, resulting, who, why, when)       │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Guard failed (0 rows)? A concurrent writer moved the stock.        │
//! │  Roll back and retry from step 1, up to MAX_RETRIES times.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use atlas_core::{
    validation, CoreError, MovementKind, NewStockMovement, Paginated, StockMovement,
};

use crate::error::DbResult;

/// Attempts before a contended write gives up with `Conflict`.
const MAX_RETRIES: u32 = 3;

/// Repository for the stock movement ledger.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Applies a stock movement atomically: updates the product's cached
    /// quantity and appends the matching ledger entry in one transaction.
    ///
    /// ## Errors
    /// - `ProductNotFound` - unknown product id
    /// - `InsufficientStock` - `out` movement larger than current stock
    /// - `Validation` - malformed input (zero quantity, missing fields)
    /// - `Conflict` - concurrent writers won the guard on every retry
    pub async fn apply(&self, input: NewStockMovement) -> DbResult<StockMovement> {
        validation::validate_movement(&input).map_err(CoreError::from)?;

        for attempt in 1..=MAX_RETRIES {
            match self.try_apply(&input).await {
                Ok(Some(movement)) => {
                    info!(
                        movement_id = %movement.id,
                        product_id = %movement.product_id,
                        kind = %movement.kind,
                        previous = movement.previous_quantity,
                        resulting = movement.resulting_quantity,
                        "Stock movement recorded"
                    );
                    return Ok(movement);
                }
                Ok(None) => {
                    warn!(
                        product_id = %input.product_id,
                        attempt,
                        "Stock update guard failed, retrying"
                    );
                }
                // A busy/locked error from a concurrent writer is the same
                // situation as a failed guard: retry from a fresh snapshot.
                Err(err) if err.is_retryable() => {
                    warn!(
                        product_id = %input.product_id,
                        attempt,
                        "Database locked by concurrent writer, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(CoreError::Conflict.into())
    }

    /// One guarded attempt. `Ok(None)` means the optimistic guard lost to a
    /// concurrent writer and the caller should retry.
    async fn try_apply(&self, input: &NewStockMovement) -> DbResult<Option<StockMovement>> {
        let mut tx = self.pool.begin().await?;

        let snapshot: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock_quantity FROM products WHERE id = ?1")
                .bind(&input.product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (name, previous) = snapshot
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

        let resulting = match input.kind {
            MovementKind::In => previous + input.quantity.unwrap_or(0),
            MovementKind::Out => {
                let requested = input.quantity.unwrap_or(0);
                if requested > previous {
                    return Err(CoreError::InsufficientStock {
                        name,
                        available: previous,
                        requested,
                    }
                    .into());
                }
                previous - requested
            }
            MovementKind::Adjustment => input.new_quantity.unwrap_or(0),
        };

        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE products SET stock_quantity = ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity = ?4
            "#,
        )
        .bind(&input.product_id)
        .bind(resulting)
        .bind(now)
        .bind(previous)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Concurrent writer changed the stock between read and update.
            tx.rollback().await?;
            return Ok(None);
        }

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            kind: input.kind,
            quantity: input.quantity,
            new_quantity: input.new_quantity,
            previous_quantity: previous,
            resulting_quantity: resulting,
            reason: input.reason.clone(),
            reference_type: input.reference_type.clone(),
            reference_id: input.reference_id.clone(),
            recorded_by: input.recorded_by.clone(),
            date: now,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, kind, quantity, new_quantity,
                previous_quantity, resulting_quantity,
                reason, reference_type, reference_id,
                recorded_by, date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.new_quantity)
        .bind(movement.previous_quantity)
        .bind(movement.resulting_quantity)
        .bind(&movement.reason)
        .bind(&movement.reference_type)
        .bind(&movement.reference_id)
        .bind(&movement.recorded_by)
        .bind(movement.date)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(movement))
    }

    /// Lists movements for a product, most recent first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        page: u32,
        limit: u32,
    ) -> DbResult<Paginated<StockMovement>> {
        let page = validation::normalize_page(page);
        let limit = validation::clamp_limit(limit);
        let offset = (page - 1) as i64 * limit as i64;

        debug!(product_id, page, limit, "Listing stock movements");

        let items: Vec<StockMovement> = sqlx::query_as(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = ?1
            ORDER BY date DESC, created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(product_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Paginated {
            items,
            total,
            page,
            limit,
        })
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
    use atlas_core::ValidationError;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, stock: i64) -> String {
        db.products()
            .insert(NewProduct {
                sku: "SKU-1".to_string(),
                name: "Sugar 1kg".to_string(),
                price_cents: 1000,
                stock_quantity: stock,
                min_stock_level: 0,
                category_id: None,
                supplier_id: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_ledger_chains_previous_to_resulting() {
        let db = test_db().await;
        let product_id = seed_product(&db, 10).await;
        let repo = db.movements();

        let m1 = repo
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::In,
                5,
                "u1",
            ))
            .await
            .unwrap();
        assert_eq!(m1.previous_quantity, 10);
        assert_eq!(m1.resulting_quantity, 15);

        let m2 = repo
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::Out,
                3,
                "u1",
            ))
            .await
            .unwrap();
        assert_eq!(m2.previous_quantity, 15);
        assert_eq!(m2.resulting_quantity, 12);

        let m3 = repo
            .apply(NewStockMovement::adjustment(&product_id, 20, "u1"))
            .await
            .unwrap();
        assert_eq!(m3.previous_quantity, 12);
        assert_eq!(m3.resulting_quantity, 20);

        // The product cache tracks the last resulting quantity.
        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.stock_quantity, 20);
    }

    #[tokio::test]
    async fn test_out_to_exactly_zero_then_insufficient() {
        let db = test_db().await;
        let product_id = seed_product(&db, 5).await;
        let repo = db.movements();

        let m = repo
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::Out,
                5,
                "u1",
            ))
            .await
            .unwrap();
        assert_eq!(m.resulting_quantity, 0);

        let err = repo
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::Out,
                1,
                "u1",
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 0,
                requested: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rejected_movement_writes_nothing() {
        let db = test_db().await;
        let product_id = seed_product(&db, 3).await;

        let err = db
            .movements()
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::Out,
                10,
                "u1",
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // Stock unchanged, ledger empty.
        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.stock_quantity, 3);

        let ledger = db
            .movements()
            .list_for_product(&product_id, 1, 50)
            .await
            .unwrap();
        assert_eq!(ledger.total, 0);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_before_writes() {
        let db = test_db().await;
        let product_id = seed_product(&db, 3).await;
        let repo = db.movements();

        let err = repo
            .apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::In,
                0,
                "u1",
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::NotPositive { .. }))
        ));

        let mut missing = NewStockMovement::quantity_change(&product_id, MovementKind::Out, 1, "u1");
        missing.quantity = None;
        let err = repo.apply(missing).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MissingQuantity))
        ));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;

        let err = db
            .movements()
            .apply(NewStockMovement::quantity_change(
                "missing",
                MovementKind::In,
                1,
                "u1",
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_concurrent_movements_on_shared_file() {
        // A file-backed pool with several connections, so writers genuinely
        // contend: losers see either a failed guard or a busy/locked error,
        // and both paths must retry rather than surface an infrastructure
        // error.
        let path = std::env::temp_dir().join(format!("atlas-movements-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let product_id = seed_product(&db, 0).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let db = db.clone();
            let product_id = product_id.clone();
            handles.push(tokio::spawn(async move {
                db.movements()
                    .apply(NewStockMovement::quantity_change(
                        &product_id,
                        MovementKind::In,
                        1,
                        "u1",
                    ))
                    .await
            }));
        }

        let mut ok: i64 = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                // Exhausted retries back off with Conflict; anything else
                // means a lock error leaked through.
                Err(DbError::Domain(CoreError::Conflict)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(ok >= 1);

        // Every committed movement is reflected exactly once in both the
        // cached quantity and the ledger.
        let product = db.products().get(&product_id).await.unwrap();
        assert_eq!(product.stock_quantity, ok);
        let ledger = db
            .movements()
            .list_for_product(&product_id, 1, 50)
            .await
            .unwrap();
        assert_eq!(ledger.total, ok);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let db = test_db().await;
        let product_id = seed_product(&db, 0).await;
        let repo = db.movements();

        for qty in [1, 2, 3] {
            repo.apply(NewStockMovement::quantity_change(
                &product_id,
                MovementKind::In,
                qty,
                "u1",
            ))
            .await
            .unwrap();
        }

        let page = repo.list_for_product(&product_id, 1, 50).await.unwrap();
        assert_eq!(page.total, 3);
        // Most recent movement (the +3) comes first.
        assert_eq!(page.items[0].quantity, Some(3));
        assert_eq!(page.items[2].quantity, Some(1));
    }
}
