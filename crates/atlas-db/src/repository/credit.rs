//! # Credit Payment Repository
//!
//! Records payments against customer credit balances.
//!
//! ## Payment Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  record(customer_id, payment)                                       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN TRANSACTION                                                  │
//! │    1. read customer balance                                         │
//! │    2. new_balance = max(balance - amount, 0)   ← overpayment        │
//! │                                                  absorbed, never    │
//! │                                                  negative           │
//! │    3. UPDATE customers SET outstanding_balance_cents = new          │
//! │       WHERE id = ? AND outstanding_balance_cents = old  ← guard     │
//! │    4. INSERT payment fact (full amount as tendered)                 │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Guard failed? Retry from step 1, up to MAX_RETRIES times.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use atlas_core::{
    validation, CoreError, CreditPayment, Customer, Money, NewCreditPayment, Paginated,
};

use crate::error::DbResult;

const MAX_RETRIES: u32 = 3;

/// Repository for credit payment operations.
#[derive(Debug, Clone)]
pub struct CreditPaymentRepository {
    pool: SqlitePool,
}

impl CreditPaymentRepository {
    /// Creates a new CreditPaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditPaymentRepository { pool }
    }

    /// Records a payment and decreases the customer's outstanding balance in
    /// one transaction. Returns the payment fact and the updated customer.
    ///
    /// The payment row stores the amount actually tendered, even when it
    /// exceeds the balance; only the balance is clamped at zero.
    pub async fn record(
        &self,
        customer_id: &str,
        input: NewCreditPayment,
    ) -> DbResult<(CreditPayment, Customer)> {
        validation::validate_payment(&input).map_err(CoreError::from)?;

        for attempt in 1..=MAX_RETRIES {
            match self.try_record(customer_id, &input).await {
                Ok(Some(result)) => {
                    info!(
                        payment_id = %result.0.id,
                        customer_id,
                        amount_cents = input.amount_cents,
                        new_balance_cents = result.1.outstanding_balance_cents,
                        "Credit payment recorded"
                    );
                    return Ok(result);
                }
                Ok(None) => {
                    warn!(customer_id, attempt, "Balance update guard failed, retrying");
                }
                // Lock contention from a concurrent writer; same remedy as a
                // failed guard, retry from a fresh snapshot.
                Err(err) if err.is_retryable() => {
                    warn!(customer_id, attempt, "Database locked by concurrent writer, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(CoreError::Conflict.into())
    }

    async fn try_record(
        &self,
        customer_id: &str,
        input: &NewCreditPayment,
    ) -> DbResult<Option<(CreditPayment, Customer)>> {
        let mut tx = self.pool.begin().await?;

        let customer: Option<Customer> =
            sqlx::query_as("SELECT * FROM customers WHERE id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;

        let mut customer = customer
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        // Deactivated customers take no payments; indistinguishable from
        // missing as far as callers are concerned.
        if !customer.is_active {
            return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
        }

        let old_balance = customer.outstanding_balance_cents;
        let new_balance = (Money::from_cents(old_balance) - Money::from_cents(input.amount_cents))
            .clamp_zero()
            .cents();

        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE customers SET outstanding_balance_cents = ?2, updated_at = ?3
            WHERE id = ?1 AND outstanding_balance_cents = ?4
            "#,
        )
        .bind(customer_id)
        .bind(new_balance)
        .bind(now)
        .bind(old_balance)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let payment = CreditPayment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            amount_cents: input.amount_cents,
            date: input.date.unwrap_or(now),
            note: input.note.clone(),
            recorded_by: input.recorded_by.clone(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO credit_payments (
                id, customer_id, amount_cents, date, note, recorded_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.customer_id)
        .bind(payment.amount_cents)
        .bind(payment.date)
        .bind(&payment.note)
        .bind(&payment.recorded_by)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        customer.outstanding_balance_cents = new_balance;
        customer.updated_at = now;

        Ok(Some((payment, customer)))
    }

    /// Lists a customer's payments, most recent first.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        page: u32,
        limit: u32,
    ) -> DbResult<Paginated<CreditPayment>> {
        let page = validation::normalize_page(page);
        let limit = validation::clamp_limit(limit);
        let offset = (page - 1) as i64 * limit as i64;

        let items: Vec<CreditPayment> = sqlx::query_as(
            r#"
            SELECT * FROM credit_payments
            WHERE customer_id = ?1
            ORDER BY date DESC, created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(customer_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_payments WHERE customer_id = ?1")
                .bind(customer_id)
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
    use crate::repository::customer::NewCustomer;
    use crate::DbError;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_customer(db: &Database, balance_cents: i64) -> String {
        db.customers()
            .insert(NewCustomer {
                name: "Karim Traders".to_string(),
                phone: None,
                email: None,
                address: None,
                credit_limit_cents: 1_000_000,
                outstanding_balance_cents: balance_cents,
                is_active: true,
            })
            .await
            .unwrap()
            .id
    }

    fn payment(amount_cents: i64) -> NewCreditPayment {
        NewCreditPayment {
            amount_cents,
            date: None,
            note: None,
            recorded_by: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_payment_reduces_balance() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, 10_000).await;

        let (paid, customer) = db
            .credit_payments()
            .record(&customer_id, payment(4_000))
            .await
            .unwrap();

        assert_eq!(paid.amount_cents, 4_000);
        assert_eq!(customer.outstanding_balance_cents, 6_000);

        let stored = db.customers().get(&customer_id).await.unwrap();
        assert_eq!(stored.outstanding_balance_cents, 6_000);
    }

    #[tokio::test]
    async fn test_overpayment_clamps_to_zero() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, 10_000).await;

        let (paid, customer) = db
            .credit_payments()
            .record(&customer_id, payment(15_000))
            .await
            .unwrap();

        // The payment fact keeps the tendered amount; only the balance clamps.
        assert_eq!(paid.amount_cents, 15_000);
        assert_eq!(customer.outstanding_balance_cents, 0);
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, 10_000).await;
        let repo = db.credit_payments();

        assert!(repo.record(&customer_id, payment(0)).await.is_err());
        assert!(repo.record(&customer_id, payment(-500)).await.is_err());

        // Balance untouched, no payment facts written.
        let stored = db.customers().get(&customer_id).await.unwrap();
        assert_eq!(stored.outstanding_balance_cents, 10_000);
        assert_eq!(
            repo.list_for_customer(&customer_id, 1, 50).await.unwrap().total,
            0
        );
    }

    #[tokio::test]
    async fn test_inactive_customer_treated_as_missing() {
        let db = test_db().await;
        let customer_id = db
            .customers()
            .insert(NewCustomer {
                name: "Closed Account".to_string(),
                phone: None,
                email: None,
                address: None,
                credit_limit_cents: 0,
                outstanding_balance_cents: 5_000,
                is_active: false,
            })
            .await
            .unwrap()
            .id;

        let err = db
            .credit_payments()
            .record(&customer_id, payment(1_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CustomerNotFound(_))
        ));

        let stored = db.customers().get(&customer_id).await.unwrap();
        assert_eq!(stored.outstanding_balance_cents, 5_000);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = test_db().await;

        let err = db
            .credit_payments()
            .record("missing", payment(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CustomerNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_payment_history_newest_first() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, 100_000).await;
        let repo = db.credit_payments();

        for amount in [1_000, 2_000, 3_000] {
            repo.record(&customer_id, payment(amount)).await.unwrap();
        }

        let history = repo.list_for_customer(&customer_id, 1, 50).await.unwrap();
        assert_eq!(history.total, 3);
        assert_eq!(history.items[0].amount_cents, 3_000);
        assert_eq!(history.items[2].amount_cents, 1_000);

        let customer = db.customers().get(&customer_id).await.unwrap();
        assert_eq!(customer.outstanding_balance_cents, 94_000);
    }
}
