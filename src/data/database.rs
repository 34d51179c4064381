//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx for compile-time checked queries.

use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create or update the operator profile for one (staff member, shop) pair.
    ///
    /// A single statement keyed on the composite UNIQUE constraint, so
    /// concurrent authorizations for the same pair cannot produce duplicate
    /// rows. `id` and `created_at` survive the update path.
    ///
    /// # Returns
    /// The row as stored after the statement.
    pub async fn upsert_user(&self, upsert: &UserUpsert) -> Result<User, AppError> {
        let now = chrono::Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, shopify_user_id, email, full_name, shop_domain, store_name,
                access_token_ciphertext, role, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(shopify_user_id, shop_domain) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                store_name = excluded.store_name,
                access_token_ciphertext = excluded.access_token_ciphertext,
                role = excluded.role,
                updated_at = excluded.updated_at
            RETURNING id, shopify_user_id, email, full_name, shop_domain, store_name,
                      access_token_ciphertext, role, created_at, updated_at
            "#,
        )
        .bind(EntityId::new().0)
        .bind(upsert.shopify_user_id)
        .bind(&upsert.email)
        .bind(&upsert.full_name)
        .bind(&upsert.shop_domain)
        .bind(&upsert.store_name)
        .bind(&upsert.access_token_ciphertext)
        .bind(upsert.role)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Look up the profile for one (staff member, shop) pair.
    pub async fn find_user_by_grant(
        &self,
        shopify_user_id: i64,
        shop_domain: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE shopify_user_id = ? AND shop_domain = ?",
        )
        .bind(shopify_user_id)
        .bind(shop_domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Count stored operator profiles.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
