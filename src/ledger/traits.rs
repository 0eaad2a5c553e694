//! Collaborator interfaces for the reward ledger.
//!
//! The ledger owns no persistence of its own; everything durable goes
//! through `LedgerStore`. Verification flags live in the `UserDirectory`
//! and withdrawals settle through a `PaymentGateway` that the ledger
//! only observes as success or failure.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::models::{CreatorStats, NewTransaction, Transaction, TransactionStatus, Wallet};

/// Outcome of a conditional (compare-and-set) update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The row changed since it was read; the caller must re-read and retry.
    Conflict,
}

/// Durable persistence for wallets, daily stats, and the transaction log.
///
/// Balance-bearing updates take the prior values the caller read and
/// apply only if the row still matches, so concurrent credits cannot
/// lose updates.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, String>;

    /// Idempotent: a second create for the same user is a no-op.
    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), String>;

    async fn update_wallet(
        &self,
        user_id: &str,
        new_sa: Decimal,
        new_usd: Decimal,
        expected_sa: Decimal,
        expected_usd: Decimal,
    ) -> Result<UpdateOutcome, String>;

    async fn get_stats(&self, user_id: &str) -> Result<Option<CreatorStats>, String>;

    /// Idempotent: a second create for the same user is a no-op.
    async fn create_stats(&self, stats: &CreatorStats) -> Result<(), String>;

    /// The predicate covers both the counter and the reset date: a
    /// caller holding yesterday's row must conflict with a rival that
    /// already rolled the row over, even when the counters coincide.
    async fn update_stats(
        &self,
        user_id: &str,
        new_earned: Decimal,
        new_reset_date: NaiveDate,
        expected_earned: Decimal,
        expected_reset_date: NaiveDate,
    ) -> Result<UpdateOutcome, String>;

    async fn append_transaction(&self, record: &NewTransaction) -> Result<Uuid, String>;

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), String>;

    /// Total amount reserved by pending withdrawals for a user, as a
    /// positive number. Pending withdrawals hold balance until the
    /// gateway confirms or fails.
    async fn pending_withdrawal_total(&self, user_id: &str) -> Result<Decimal, String>;

    /// Reset every stats row with `last_reset_date < today`. Returns the
    /// number of rows swept. Safe to run redundantly or not at all.
    async fn sweep_stale_stats(&self, today: NaiveDate) -> Result<u64, String>;

    /// Recent ledger entries for a user, newest first.
    async fn transaction_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, String>;
}

/// User directory: verification status and follower counts live outside
/// the ledger core.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn verification_status(&self, user_id: &str) -> Result<bool, String>;

    async fn follower_count(&self, user_id: &str) -> Result<i64, String>;
}

/// External payment gateway. Opaque beyond its boolean outcome.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns Ok(true) when the transfer settled, Ok(false) when the
    /// gateway declined it. Err means the gateway was unreachable.
    async fn transfer(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: crate::ledger::models::Currency,
        method: crate::ledger::models::WithdrawalMethod,
    ) -> Result<bool, String>;
}

/// Wall-clock source. The daily cap resets on UTC calendar-date change,
/// so tests pin this.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
