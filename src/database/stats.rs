//! Creator Stats Repository - PostgreSQL operations for daily earning
//! counters using sqlx

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::ledger::models::CreatorStats;
use crate::ledger::traits::UpdateOutcome;

pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<CreatorStats>, String> {
        let row = sqlx::query(
            r#"
            SELECT user_id, daily_sa_earned, last_reset_date, updated_at
            FROM creator_stats
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to get creator stats: {}", e))?;

        Ok(row.map(|row| CreatorStats {
            user_id: row.get("user_id"),
            daily_sa_earned: row.get("daily_sa_earned"),
            last_reset_date: row.get("last_reset_date"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    pub async fn insert(&self, stats: &CreatorStats) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO creator_stats (user_id, daily_sa_earned, last_reset_date, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&stats.user_id)
        .bind(stats.daily_sa_earned)
        .bind(stats.last_reset_date)
        .bind(stats.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to insert creator stats: {}", e))?;

        debug!(user_id = %stats.user_id, "Creator stats created");
        Ok(())
    }

    /// Conditional counter update: applies only when both
    /// `daily_sa_earned` and `last_reset_date` still hold the values
    /// the caller read, serializing concurrent earn claims on the same
    /// user. The date must be part of the predicate: across the
    /// midnight rollover a stale counter can coincide with a fresh one.
    pub async fn update_earned(
        &self,
        user_id: &str,
        new_earned: Decimal,
        new_reset_date: NaiveDate,
        expected_earned: Decimal,
        expected_reset_date: NaiveDate,
    ) -> Result<UpdateOutcome, String> {
        let result = sqlx::query(
            r#"
            UPDATE creator_stats
            SET daily_sa_earned = $2, last_reset_date = $3, updated_at = NOW()
            WHERE user_id = $1 AND daily_sa_earned = $4 AND last_reset_date = $5
            "#,
        )
        .bind(user_id)
        .bind(new_earned)
        .bind(new_reset_date)
        .bind(expected_earned)
        .bind(expected_reset_date)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to update creator stats: {}", e))?;

        if result.rows_affected() == 0 {
            Ok(UpdateOutcome::Conflict)
        } else {
            Ok(UpdateOutcome::Applied)
        }
    }

    /// Reset every row whose last reset predates `today`. Idempotent;
    /// returns the number of rows swept.
    pub async fn sweep_stale(&self, today: NaiveDate) -> Result<u64, String> {
        let result = sqlx::query(
            r#"
            UPDATE creator_stats
            SET daily_sa_earned = 0, last_reset_date = $1, updated_at = NOW()
            WHERE last_reset_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to sweep stale stats: {}", e))?;

        Ok(result.rows_affected())
    }
}
