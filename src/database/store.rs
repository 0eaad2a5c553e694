//! `LedgerStore` and `UserDirectory` implementations backed by the
//! PostgreSQL pool. Pure delegation to the per-table repositories.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::database::pool::DatabasePool;
use crate::ledger::models::{CreatorStats, NewTransaction, Transaction, TransactionStatus, Wallet};
use crate::ledger::traits::{LedgerStore, UpdateOutcome, UserDirectory};

#[async_trait::async_trait]
impl LedgerStore for DatabasePool {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, String> {
        self.wallets().get(user_id).await
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), String> {
        self.wallets().insert(wallet).await
    }

    async fn update_wallet(
        &self,
        user_id: &str,
        new_sa: Decimal,
        new_usd: Decimal,
        expected_sa: Decimal,
        expected_usd: Decimal,
    ) -> Result<UpdateOutcome, String> {
        self.wallets()
            .update_balances(user_id, new_sa, new_usd, expected_sa, expected_usd)
            .await
    }

    async fn get_stats(&self, user_id: &str) -> Result<Option<CreatorStats>, String> {
        self.stats().get(user_id).await
    }

    async fn create_stats(&self, stats: &CreatorStats) -> Result<(), String> {
        self.stats().insert(stats).await
    }

    async fn update_stats(
        &self,
        user_id: &str,
        new_earned: Decimal,
        new_reset_date: NaiveDate,
        expected_earned: Decimal,
        expected_reset_date: NaiveDate,
    ) -> Result<UpdateOutcome, String> {
        self.stats()
            .update_earned(
                user_id,
                new_earned,
                new_reset_date,
                expected_earned,
                expected_reset_date,
            )
            .await
    }

    async fn append_transaction(&self, record: &NewTransaction) -> Result<Uuid, String> {
        self.transactions().append(record).await
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), String> {
        self.transactions()
            .update_status(transaction_id, status)
            .await
    }

    async fn pending_withdrawal_total(&self, user_id: &str) -> Result<Decimal, String> {
        self.transactions().pending_withdrawal_total(user_id).await
    }

    async fn sweep_stale_stats(&self, today: NaiveDate) -> Result<u64, String> {
        self.stats().sweep_stale(today).await
    }

    async fn transaction_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, String> {
        self.transactions().get_history(user_id, limit).await
    }
}

#[async_trait::async_trait]
impl UserDirectory for DatabasePool {
    async fn verification_status(&self, user_id: &str) -> Result<bool, String> {
        self.users().is_verified(user_id).await
    }

    async fn follower_count(&self, user_id: &str) -> Result<i64, String> {
        self.users().follower_count(user_id).await
    }
}
