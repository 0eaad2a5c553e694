//! In-memory store fallback.
//!
//! Used when PostgreSQL is disabled in configuration, and by tests.
//! Compare-and-set semantics are preserved: updates apply only while
//! holding the write lock and only if the row still matches the
//! expected prior values.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::models::{
    CreatorStats, NewTransaction, Transaction, TransactionStatus, TransactionType, Wallet,
};
use crate::ledger::traits::{LedgerStore, UpdateOutcome, UserDirectory};

#[derive(Default)]
pub struct MemoryStore {
    wallets: RwLock<HashMap<String, Wallet>>,
    stats: RwLock<HashMap<String, CreatorStats>>,
    transactions: RwLock<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All ledger rows, oldest first. Test/introspection helper.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, String> {
        Ok(self.wallets.read().await.get(user_id).cloned())
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), String> {
        self.wallets
            .write()
            .await
            .entry(wallet.user_id.clone())
            .or_insert_with(|| wallet.clone());
        Ok(())
    }

    async fn update_wallet(
        &self,
        user_id: &str,
        new_sa: Decimal,
        new_usd: Decimal,
        expected_sa: Decimal,
        expected_usd: Decimal,
    ) -> Result<UpdateOutcome, String> {
        let mut wallets = self.wallets.write().await;
        match wallets.get_mut(user_id) {
            Some(wallet)
                if wallet.sa_balance == expected_sa && wallet.usd_balance == expected_usd =>
            {
                wallet.sa_balance = new_sa;
                wallet.usd_balance = new_usd;
                wallet.updated_at = Utc::now();
                Ok(UpdateOutcome::Applied)
            }
            _ => Ok(UpdateOutcome::Conflict),
        }
    }

    async fn get_stats(&self, user_id: &str) -> Result<Option<CreatorStats>, String> {
        Ok(self.stats.read().await.get(user_id).cloned())
    }

    async fn create_stats(&self, stats: &CreatorStats) -> Result<(), String> {
        self.stats
            .write()
            .await
            .entry(stats.user_id.clone())
            .or_insert_with(|| stats.clone());
        Ok(())
    }

    async fn update_stats(
        &self,
        user_id: &str,
        new_earned: Decimal,
        new_reset_date: NaiveDate,
        expected_earned: Decimal,
        expected_reset_date: NaiveDate,
    ) -> Result<UpdateOutcome, String> {
        let mut stats = self.stats.write().await;
        match stats.get_mut(user_id) {
            Some(row)
                if row.daily_sa_earned == expected_earned
                    && row.last_reset_date == expected_reset_date =>
            {
                row.daily_sa_earned = new_earned;
                row.last_reset_date = new_reset_date;
                row.updated_at = Utc::now();
                Ok(UpdateOutcome::Applied)
            }
            _ => Ok(UpdateOutcome::Conflict),
        }
    }

    async fn append_transaction(&self, record: &NewTransaction) -> Result<Uuid, String> {
        let id = Uuid::new_v4();
        self.transactions.write().await.push(Transaction {
            id,
            user_id: record.user_id.clone(),
            tx_type: record.tx_type,
            amount: record.amount,
            currency: record.currency,
            status: record.status,
            metadata: record.metadata.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), String> {
        let mut transactions = self.transactions.write().await;
        match transactions.iter_mut().find(|t| t.id == transaction_id) {
            Some(transaction) => {
                transaction.status = status;
                Ok(())
            }
            None => Err(format!("transaction {} not found", transaction_id)),
        }
    }

    async fn pending_withdrawal_total(&self, user_id: &str) -> Result<Decimal, String> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.tx_type == TransactionType::Withdrawal
                    && t.status == TransactionStatus::Pending
            })
            .map(|t| -t.amount)
            .sum())
    }

    async fn sweep_stale_stats(&self, today: NaiveDate) -> Result<u64, String> {
        let mut stats = self.stats.write().await;
        let mut count = 0;
        for row in stats.values_mut() {
            if row.last_reset_date < today {
                row.daily_sa_earned = Decimal::ZERO;
                row.last_reset_date = today;
                row.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn transaction_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, String> {
        let transactions = self.transactions.read().await;
        let mut history: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        history.reverse();
        history.truncate(limit.max(0) as usize);
        Ok(history)
    }
}

/// In-memory user directory. `default_verified` controls what unknown
/// users look like; the dev fallback treats everyone as verified.
pub struct MemoryDirectory {
    verified: RwLock<HashMap<String, bool>>,
    followers: RwLock<HashMap<String, i64>>,
    default_verified: bool,
}

impl MemoryDirectory {
    pub fn new(default_verified: bool) -> Self {
        Self {
            verified: RwLock::new(HashMap::new()),
            followers: RwLock::new(HashMap::new()),
            default_verified,
        }
    }

    pub async fn set_verified(&self, user_id: &str, verified: bool) {
        self.verified
            .write()
            .await
            .insert(user_id.to_string(), verified);
    }

    pub async fn set_followers(&self, user_id: &str, count: i64) {
        self.followers
            .write()
            .await
            .insert(user_id.to_string(), count);
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryDirectory {
    async fn verification_status(&self, user_id: &str) -> Result<bool, String> {
        Ok(self
            .verified
            .read()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(self.default_verified))
    }

    async fn follower_count(&self, user_id: &str) -> Result<i64, String> {
        Ok(self
            .followers
            .read()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(0))
    }
}
