//! # User Repository
//!
//! User reference data. Authentication is owned by an external layer; this
//! repository carries what the dashboard needs (active-today counts via
//! `last_login_at`) plus inserts for seeding and tests.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use atlas_core::{validation, CoreError, Role, User};

use crate::error::DbResult;

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new user and returns it.
    pub async fn insert(&self, input: NewUser) -> DbResult<User> {
        validation::validate_non_empty("name", &input.name).map_err(CoreError::from)?;
        validation::validate_non_empty("email", &input.email).map_err(CoreError::from)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            email: input.email,
            role: input.role,
            last_login_at: None,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, last_login_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Stamps a user's last login time (called by the auth layer).
    ///
    /// ## Errors
    /// - `UserNotFound` - no user with this id
    pub async fn record_login(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let updated = sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::UserNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Gets a user by ID, if one exists.
    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::DbError;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_record_login_stamps_timestamp() {
        let db = test_db().await;
        let user = db
            .users()
            .insert(NewUser {
                name: "Asad".to_string(),
                email: "asad@example.com".to_string(),
                role: Role::Cashier,
            })
            .await
            .unwrap();
        assert!(user.last_login_at.is_none());

        db.users().record_login(&user.id).await.unwrap();

        let stored = db.users().get(&user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_record_login_unknown_user() {
        let db = test_db().await;

        let err = db.users().record_login("missing").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::UserNotFound(id)) if id == "missing"
        ));
    }
}
