//! Ledger data model: wallets, daily creator stats, and transaction rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user balance record. One row per user, created lazily on the
/// first qualifying interaction, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub sa_balance: Decimal,
    pub usd_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            sa_balance: Decimal::ZERO,
            usd_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-user daily earning counter. `daily_sa_earned` is authoritative
/// only for the calendar date in `last_reset_date`; readers observing a
/// stale date must treat the counter as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorStats {
    pub user_id: String,
    pub daily_sa_earned: Decimal,
    pub last_reset_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl CreatorStats {
    pub fn new(user_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            daily_sa_earned: Decimal::ZERO,
            last_reset_date: today,
            updated_at: Utc::now(),
        }
    }
}

/// Transaction type stored as TEXT in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Reward,
    Conversion,
    Withdrawal,
    Verification,
    Boost,
}

/// Transaction lifecycle. Rows are immutable except for the
/// pending -> completed/failed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Sa,
    Usd,
    Ngn,
}

/// Withdrawal routing. Each gateway settles exactly one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    Stripe,
    Paystack,
}

impl WithdrawalMethod {
    /// The single currency a gateway accepts for transfers.
    pub fn settles(&self) -> Currency {
        match self {
            WithdrawalMethod::Stripe => Currency::Usd,
            WithdrawalMethod::Paystack => Currency::Ngn,
        }
    }
}

/// Append-only ledger entry. Amounts are signed; debits are negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A transaction about to be appended; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: String,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub metadata: serde_json::Value,
}

/// Read-only report of current-day earnings against the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapStatus {
    pub earned: Decimal,
    pub remaining: Decimal,
    pub percentage: Decimal,
}
