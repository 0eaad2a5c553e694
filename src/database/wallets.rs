//! Wallet Repository - PostgreSQL operations for wallets using sqlx
//!
//! Balance updates are conditional on the previously read values so two
//! concurrent credits for the same user cannot lose an update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::ledger::models::Wallet;
use crate::ledger::traits::UpdateOutcome;

pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Wallet>, String> {
        let row = sqlx::query(
            r#"
            SELECT user_id, sa_balance, usd_balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to get wallet: {}", e))?;

        Ok(row.map(|row| Wallet {
            user_id: row.get("user_id"),
            sa_balance: row.get("sa_balance"),
            usd_balance: row.get("usd_balance"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    pub async fn insert(&self, wallet: &Wallet) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, sa_balance, usd_balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&wallet.user_id)
        .bind(wallet.sa_balance)
        .bind(wallet.usd_balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to insert wallet: {}", e))?;

        debug!(user_id = %wallet.user_id, "Wallet created");
        Ok(())
    }

    /// Compare-and-set balance update. Applies only when both balances
    /// still match the values the caller read.
    pub async fn update_balances(
        &self,
        user_id: &str,
        new_sa: Decimal,
        new_usd: Decimal,
        expected_sa: Decimal,
        expected_usd: Decimal,
    ) -> Result<UpdateOutcome, String> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET sa_balance = $2, usd_balance = $3, updated_at = NOW()
            WHERE user_id = $1 AND sa_balance = $4 AND usd_balance = $5
            "#,
        )
        .bind(user_id)
        .bind(new_sa)
        .bind(new_usd)
        .bind(expected_sa)
        .bind(expected_usd)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to update wallet: {}", e))?;

        if result.rows_affected() == 0 {
            Ok(UpdateOutcome::Conflict)
        } else {
            Ok(UpdateOutcome::Applied)
        }
    }
}
