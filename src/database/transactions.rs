//! Transaction Repository - PostgreSQL operations for the append-only
//! ledger using sqlx
//!
//! Rows are immutable after insert except for the pending ->
//! completed/failed status move.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::ledger::models::{NewTransaction, Transaction, TransactionStatus};

pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, record: &NewTransaction) -> Result<Uuid, String> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, tx_type, amount, currency, status, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(id)
        .bind(&record.user_id)
        .bind(record.tx_type)
        .bind(record.amount)
        .bind(record.currency)
        .bind(record.status)
        .bind(&record.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to append transaction: {}", e))?;

        debug!(transaction_id = %id, user_id = %record.user_id, "Transaction appended");
        Ok(id)
    }

    pub async fn update_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), String> {
        sqlx::query("UPDATE transactions SET status = $2 WHERE id = $1")
            .bind(transaction_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| format!("Failed to update transaction status: {}", e))?;

        debug!(transaction_id = %transaction_id, "Transaction status updated");
        Ok(())
    }

    /// Sum of amounts held by pending withdrawals, as a positive number.
    pub async fn pending_withdrawal_total(&self, user_id: &str) -> Result<Decimal, String> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(-amount), 0) AS reserved
            FROM transactions
            WHERE user_id = $1 AND tx_type = 'withdrawal' AND status = 'pending'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| format!("Failed to sum pending withdrawals: {}", e))?;

        Ok(row.get("reserved"))
    }

    pub async fn get_history(&self, user_id: &str, limit: i64) -> Result<Vec<Transaction>, String> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, tx_type, amount, currency, status, metadata, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to get transaction history: {}", e))?;

        let history: Vec<Transaction> = rows
            .into_iter()
            .map(|row| Transaction {
                id: row.get("id"),
                user_id: row.get("user_id"),
                tx_type: row.get("tx_type"),
                amount: row.get("amount"),
                currency: row.get("currency"),
                status: row.get("status"),
                metadata: row.get("metadata"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            })
            .collect();

        Ok(history)
    }
}
