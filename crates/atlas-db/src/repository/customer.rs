//! # Customer Repository
//!
//! Customer reference data. Customer CRUD proper is owned by an external
//! service; this repository carries the reads the credit and analytics
//! operations need, plus inserts for seeding and tests.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use atlas_core::{validation, CoreError, Customer, Paginated};

use crate::error::DbResult;

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit_cents: i64,
    pub outstanding_balance_cents: i64,
    pub is_active: bool,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer and returns it.
    pub async fn insert(&self, input: NewCustomer) -> DbResult<Customer> {
        validation::validate_non_empty("name", &input.name).map_err(CoreError::from)?;
        validation::validate_non_negative_cents(
            "outstanding_balance_cents",
            input.outstanding_balance_cents,
        )
        .map_err(CoreError::from)?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            phone: input.phone,
            email: input.email,
            address: input.address,
            credit_limit_cents: input.credit_limit_cents,
            outstanding_balance_cents: input.outstanding_balance_cents,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, address,
                credit_limit_cents, outstanding_balance_cents, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.credit_limit_cents)
        .bind(customer.outstanding_balance_cents)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID, or `CustomerNotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let customer: Option<Customer> =
            sqlx::query_as("SELECT * FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        customer.ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }

    /// Lists customers ordered by name, paginated.
    pub async fn list(&self, page: u32, limit: u32) -> DbResult<Paginated<Customer>> {
        let page = validation::normalize_page(page);
        let limit = validation::clamp_limit(limit);
        let offset = (page - 1) as i64 * limit as i64;

        let items: Vec<Customer> =
            sqlx::query_as("SELECT * FROM customers ORDER BY name LIMIT ?1 OFFSET ?2")
                .bind(limit as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
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
