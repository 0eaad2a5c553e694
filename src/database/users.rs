//! User Repository - PostgreSQL operations for directory lookups
//!
//! The ledger only reads verification flags and follower counts; user
//! rows are owned by the platform's account service.

use sqlx::{PgPool, Row};

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verification flag for a user. Unknown users are unverified.
    pub async fn is_verified(&self, user_id: &str) -> Result<bool, String> {
        let row = sqlx::query("SELECT is_verified FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| format!("Failed to get verification status: {}", e))?;

        Ok(row.map(|row| row.get("is_verified")).unwrap_or(false))
    }

    pub async fn follower_count(&self, user_id: &str) -> Result<i64, String> {
        let row = sqlx::query("SELECT followers_count FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| format!("Failed to get follower count: {}", e))?;

        Ok(row.map(|row| row.get("followers_count")).unwrap_or(0))
    }
}
