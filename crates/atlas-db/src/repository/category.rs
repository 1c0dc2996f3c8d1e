//! # Category Repository
//!
//! Category reference data for product grouping. Needed by the analytics
//! joins (sales by category, inventory valuation) and the seeder.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use atlas_core::{validation, Category, CoreError};

use crate::error::DbResult;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a new category and returns it.
    pub async fn insert(&self, name: &str) -> DbResult<Category> {
        validation::validate_non_empty("name", name).map_err(CoreError::from)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    /// Lists all categories ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories: Vec<Category> =
            sqlx::query_as("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }
}
