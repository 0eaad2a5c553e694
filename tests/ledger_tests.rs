//! Integration tests for the SA reward ledger
//!
//! These tests exercise the full crediting, conversion, withdrawal, and
//! daily-reset flows against the in-memory store, including the
//! compare-and-set behavior under concurrent crediting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use sa_ledger::{
    Clock, CreatorStats, Currency, LedgerError, LedgerStore, MemoryDirectory, MemoryStore,
    NewTransaction, PaymentGateway, RewardLedger, RewardPolicy, Transaction, TransactionStatus,
    TransactionType, UpdateOutcome, Wallet, WithdrawalMethod,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Pinned clock so tests control the UTC calendar date.
struct FixedClock {
    today: RwLock<NaiveDate>,
}

impl FixedClock {
    fn new(today: NaiveDate) -> Self {
        Self {
            today: RwLock::new(today),
        }
    }

    fn set_today(&self, today: NaiveDate) {
        *self.today.write().unwrap() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.read().unwrap()
    }
}

/// Gateway double with a configurable outcome that records every call.
struct RecordingGateway {
    outcome: Mutex<Result<bool, String>>,
    calls: Mutex<Vec<(String, Decimal, Currency, WithdrawalMethod)>>,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(Ok(true)),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn set_outcome(&self, outcome: Result<bool, String>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn calls(&self) -> Vec<(String, Decimal, Currency, WithdrawalMethod)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RecordingGateway {
    async fn transfer(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: Currency,
        method: WithdrawalMethod,
    ) -> Result<bool, String> {
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), amount, currency, method));
        self.outcome.lock().unwrap().clone()
    }
}

/// Store wrapper that injects a failure or a rival write at one precise
/// point in an operation, for exercising the engine's compensation and
/// re-check paths. At most one interposition fires per instance.
struct InterposingStore {
    inner: MemoryStore,
    fail_appends: bool,
    rival_rollover_day: Option<NaiveDate>,
    rival_reservation: Option<Decimal>,
    fired: AtomicBool,
}

impl InterposingStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_appends: false,
            rival_rollover_day: None,
            rival_reservation: None,
            fired: AtomicBool::new(false),
        }
    }

    /// Every ledger append fails.
    fn failing_appends() -> Self {
        Self {
            fail_appends: true,
            ..Self::new(MemoryStore::new())
        }
    }

    /// On the first stale stats read, a rival claims the first reward
    /// of `day` before the caller's conditional update runs.
    fn with_rival_rollover(day: NaiveDate) -> Self {
        Self {
            rival_rollover_day: Some(day),
            ..Self::new(MemoryStore::new())
        }
    }

    /// On the first ledger append, a rival pending withdrawal for the
    /// same user slips in ahead of it.
    fn with_rival_reservation(amount: Decimal) -> Self {
        Self {
            rival_reservation: Some(amount),
            ..Self::new(MemoryStore::new())
        }
    }

    fn fire_once(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LedgerStore for InterposingStore {
    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, String> {
        self.inner.get_wallet(user_id).await
    }

    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), String> {
        self.inner.create_wallet(wallet).await
    }

    async fn update_wallet(
        &self,
        user_id: &str,
        new_sa: Decimal,
        new_usd: Decimal,
        expected_sa: Decimal,
        expected_usd: Decimal,
    ) -> Result<UpdateOutcome, String> {
        self.inner
            .update_wallet(user_id, new_sa, new_usd, expected_sa, expected_usd)
            .await
    }

    async fn get_stats(&self, user_id: &str) -> Result<Option<CreatorStats>, String> {
        let row = self.inner.get_stats(user_id).await?;
        if let (Some(day), Some(stats)) = (self.rival_rollover_day, row.as_ref()) {
            if stats.last_reset_date < day && self.fire_once() {
                // Rival claims the first reward of the new day, landing
                // on the same counter value, and credits its wallet.
                self.inner
                    .update_stats(
                        user_id,
                        stats.daily_sa_earned,
                        day,
                        stats.daily_sa_earned,
                        stats.last_reset_date,
                    )
                    .await?;
                let wallet = self.inner.get_wallet(user_id).await?.expect("wallet seeded");
                self.inner
                    .update_wallet(
                        user_id,
                        wallet.sa_balance + stats.daily_sa_earned,
                        wallet.usd_balance,
                        wallet.sa_balance,
                        wallet.usd_balance,
                    )
                    .await?;
            }
        }
        Ok(row)
    }

    async fn create_stats(&self, stats: &CreatorStats) -> Result<(), String> {
        self.inner.create_stats(stats).await
    }

    async fn update_stats(
        &self,
        user_id: &str,
        new_earned: Decimal,
        new_reset_date: NaiveDate,
        expected_earned: Decimal,
        expected_reset_date: NaiveDate,
    ) -> Result<UpdateOutcome, String> {
        self.inner
            .update_stats(
                user_id,
                new_earned,
                new_reset_date,
                expected_earned,
                expected_reset_date,
            )
            .await
    }

    async fn append_transaction(&self, record: &NewTransaction) -> Result<Uuid, String> {
        if self.fail_appends {
            return Err("ledger append unavailable".to_string());
        }
        if let Some(amount) = self.rival_reservation {
            if self.fire_once() {
                self.inner
                    .append_transaction(&NewTransaction {
                        user_id: record.user_id.clone(),
                        tx_type: TransactionType::Withdrawal,
                        amount: -amount,
                        currency: Currency::Usd,
                        status: TransactionStatus::Pending,
                        metadata: json!({ "method": "stripe" }),
                    })
                    .await?;
            }
        }
        self.inner.append_transaction(record).await
    }

    async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), String> {
        self.inner
            .update_transaction_status(transaction_id, status)
            .await
    }

    async fn pending_withdrawal_total(&self, user_id: &str) -> Result<Decimal, String> {
        self.inner.pending_withdrawal_total(user_id).await
    }

    async fn sweep_stale_stats(&self, today: NaiveDate) -> Result<u64, String> {
        self.inner.sweep_stale_stats(today).await
    }

    async fn transaction_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, String> {
        self.inner.transaction_history(user_id, limit).await
    }
}

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct Harness {
    ledger: RewardLedger,
    store: Arc<MemoryStore>,
    directory: Arc<MemoryDirectory>,
    gateway: Arc<RecordingGateway>,
    clock: Arc<FixedClock>,
}

fn create_harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new(false));
    let gateway = Arc::new(RecordingGateway::new());
    let clock = Arc::new(FixedClock::new(day(2026, 8, 30)));

    let ledger = RewardLedger::new(
        store.clone(),
        directory.clone(),
        gateway.clone(),
        clock.clone(),
        RewardPolicy::default(),
    );

    Harness {
        ledger,
        store,
        directory,
        gateway,
        clock,
    }
}

/// Seed a wallet with the given balances through store operations.
async fn seed_wallet(store: &MemoryStore, user_id: &str, sa: Decimal, usd: Decimal) {
    store.create_wallet(&Wallet::new(user_id)).await.unwrap();
    store
        .update_wallet(user_id, sa, usd, Decimal::ZERO, Decimal::ZERO)
        .await
        .unwrap();
}

/// Seed a stats row with the given counter and reset date.
async fn seed_stats(store: &MemoryStore, user_id: &str, earned: Decimal, reset_date: NaiveDate) {
    store
        .create_stats(&CreatorStats::new(user_id, reset_date))
        .await
        .unwrap();
    store
        .update_stats(user_id, earned, reset_date, Decimal::ZERO, reset_date)
        .await
        .unwrap();
}

// ============================================================================
// Reward Crediting Tests
// ============================================================================

mod reward_crediting {
    use super::*;

    #[tokio::test]
    async fn unverified_user_earns_nothing() {
        let h = create_harness();

        let reward = h.ledger.reward_interaction("user_1", "like", json!({})).await;

        assert_eq!(reward, Decimal::ZERO);
        assert!(h.store.get_wallet("user_1").await.unwrap().is_none());
        assert!(h.store.all_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn verified_user_earns_flat_reward() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;

        let reward = h
            .ledger
            .reward_interaction("creator_1", "comment", json!({ "post_id": "p42" }))
            .await;

        assert_eq!(reward, dec!(0.5));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(0.5));
        assert_eq!(wallet.usd_balance, Decimal::ZERO);

        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(0.5));
        assert_eq!(stats.last_reset_date, day(2026, 8, 30));

        let transactions = h.store.all_transactions().await;
        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.tx_type, TransactionType::Reward);
        assert_eq!(tx.amount, dec!(0.5));
        assert_eq!(tx.currency, Currency::Sa);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.metadata["interaction_type"], "comment");
        assert_eq!(tx.metadata["post_id"], "p42");
    }

    #[tokio::test]
    async fn reward_amount_ignores_interaction_type() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;

        for interaction in ["like", "comment", "share"] {
            let reward = h
                .ledger
                .reward_interaction("creator_1", interaction, json!({}))
                .await;
            assert_eq!(reward, dec!(0.5), "flat payout for {}", interaction);
        }

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(1.5));
    }

    #[tokio::test]
    async fn bootstrap_creates_stats_once_then_credits() {
        let h = create_harness();
        h.directory.set_verified("new_creator", true).await;

        assert!(h.store.get_stats("new_creator").await.unwrap().is_none());

        let reward = h
            .ledger
            .reward_interaction("new_creator", "like", json!({}))
            .await;

        assert_eq!(reward, dec!(0.5));
        let stats = h.store.get_stats("new_creator").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(0.5));
    }

    #[tokio::test]
    async fn last_reward_of_day_lands_exactly_on_cap() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        seed_stats(&h.store, "creator_1", dec!(499.5), day(2026, 8, 30)).await;
        seed_wallet(&h.store, "creator_1", dec!(999), Decimal::ZERO).await;

        let reward = h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, dec!(0.5));

        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(500));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(999.5));

        // Cap reached: the next interaction the same day earns nothing.
        let reward = h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, Decimal::ZERO);
        assert_eq!(h.store.all_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn counter_clamps_but_reward_stays_whole() {
        // Policy with a cap that the last reward overshoots: the wallet
        // still receives the full amount, only the counter clamps.
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        seed_stats(&h.store, "creator_1", dec!(499.8), day(2026, 8, 30)).await;

        let reward = h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, dec!(0.5));

        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(500));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(0.5));
    }

    #[tokio::test]
    async fn stale_counter_resets_before_crediting() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        seed_stats(&h.store, "creator_1", dec!(500), day(2026, 8, 29)).await;

        // Cap was reached yesterday; today starts fresh.
        let reward = h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, dec!(0.5));

        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(0.5));
        assert_eq!(stats.last_reset_date, day(2026, 8, 30));
    }

    #[tokio::test]
    async fn failed_ledger_append_leaves_no_partial_credit() {
        let store = Arc::new(InterposingStore::failing_appends());
        let directory = Arc::new(MemoryDirectory::new(true));
        let gateway = Arc::new(RecordingGateway::new());
        let clock = Arc::new(FixedClock::new(day(2026, 8, 30)));
        let ledger = RewardLedger::new(
            store.clone(),
            directory,
            gateway,
            clock,
            RewardPolicy::default(),
        );

        let reward = ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, Decimal::ZERO);

        // Both the wallet credit and the daily-budget claim were undone.
        let wallet = store.inner.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, Decimal::ZERO);
        let stats = store.inner.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, Decimal::ZERO);
    }

    #[tokio::test]
    async fn stale_read_cannot_overwrite_rolled_over_counter() {
        let store = MemoryStore::new();
        let yesterday = day(2026, 8, 29);
        let today = day(2026, 8, 30);
        seed_stats(&store, "creator_1", dec!(0.5), yesterday).await;

        // A rival rolls the row over to today, landing on the same
        // counter value.
        assert_eq!(
            store
                .update_stats("creator_1", dec!(0.5), today, dec!(0.5), yesterday)
                .await
                .unwrap(),
            UpdateOutcome::Applied
        );

        // A writer still holding yesterday's read must conflict even
        // though the counters coincide.
        assert_eq!(
            store
                .update_stats("creator_1", dec!(1.0), today, dec!(0.5), yesterday)
                .await
                .unwrap(),
            UpdateOutcome::Conflict
        );

        let stats = store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(0.5));
        assert_eq!(stats.last_reset_date, today);
    }

    #[tokio::test]
    async fn rollover_race_keeps_counter_and_wallet_consistent() {
        let today = day(2026, 8, 30);
        let store = Arc::new(InterposingStore::with_rival_rollover(today));
        let directory = Arc::new(MemoryDirectory::new(true));
        let gateway = Arc::new(RecordingGateway::new());
        let clock = Arc::new(FixedClock::new(today));
        let ledger = RewardLedger::new(
            store.clone(),
            directory,
            gateway,
            clock,
            RewardPolicy::default(),
        );

        // Yesterday's row holds exactly one reward, so the rival's
        // fresh claim lands on the same counter value.
        seed_stats(&store.inner, "creator_1", dec!(0.5), day(2026, 8, 29)).await;
        store
            .inner
            .create_wallet(&Wallet::new("creator_1"))
            .await
            .unwrap();

        // The rival claim fires between this call's stats read and its
        // conditional update; the call must retry, not overwrite it.
        let reward = ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, dec!(0.5));

        let stats = store.inner.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(1.0));
        assert_eq!(stats.last_reset_date, today);

        // Both rewards are in the wallet and both are in the counter.
        let wallet = store.inner.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(1.0));
    }

    #[tokio::test]
    async fn concurrent_credits_never_lose_updates() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        let ledger = Arc::new(h.ledger);

        let mut handles = vec![];
        for _ in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.reward_interaction("creator_1", "like", json!({})).await
            }));
        }

        let mut granted = Decimal::ZERO;
        for handle in handles {
            granted += handle.await.unwrap();
        }

        // Under contention some calls may give up and grant 0, but
        // whatever was granted must be fully reflected everywhere.
        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, granted);
        assert_eq!(stats.daily_sa_earned, granted);

        let transactions = h.store.all_transactions().await;
        let logged: Decimal = transactions.iter().map(|t| t.amount).sum();
        assert_eq!(logged, granted);
    }
}

// ============================================================================
// Daily Cap Reporting Tests
// ============================================================================

mod daily_cap {
    use super::*;

    #[tokio::test]
    async fn reports_current_day_standing() {
        let h = create_harness();
        seed_stats(&h.store, "creator_1", dec!(100), day(2026, 8, 30)).await;

        let cap = h.ledger.check_daily_cap("creator_1").await.unwrap();
        assert_eq!(cap.earned, dec!(100));
        assert_eq!(cap.remaining, dec!(400));
        assert_eq!(cap.percentage, dec!(20));
    }

    #[tokio::test]
    async fn unknown_user_has_empty_day() {
        let h = create_harness();

        let cap = h.ledger.check_daily_cap("nobody").await.unwrap();
        assert_eq!(cap.earned, Decimal::ZERO);
        assert_eq!(cap.remaining, dec!(500));
    }

    #[tokio::test]
    async fn stale_counter_reads_as_zero_and_resets() {
        let h = create_harness();
        seed_stats(&h.store, "creator_1", dec!(321), day(2026, 8, 29)).await;

        let cap = h.ledger.check_daily_cap("creator_1").await.unwrap();
        assert_eq!(cap.earned, Decimal::ZERO);
        assert_eq!(cap.remaining, dec!(500));

        // The rollover was persisted, not just reported.
        let stats = h.store.get_stats("creator_1").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, Decimal::ZERO);
        assert_eq!(stats.last_reset_date, day(2026, 8, 30));
    }

    #[tokio::test]
    async fn midnight_rollover_observed_without_sweep() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        seed_stats(&h.store, "creator_1", dec!(500), day(2026, 8, 30)).await;

        let cap = h.ledger.check_daily_cap("creator_1").await.unwrap();
        assert_eq!(cap.remaining, Decimal::ZERO);

        h.clock.set_today(day(2026, 8, 31));

        let cap = h.ledger.check_daily_cap("creator_1").await.unwrap();
        assert_eq!(cap.earned, Decimal::ZERO);
        assert_eq!(cap.remaining, dec!(500));
    }
}

// ============================================================================
// Conversion Tests
// ============================================================================

mod conversion {
    use super::*;

    #[tokio::test]
    async fn converts_at_configured_rate() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", dec!(1000), Decimal::ZERO).await;

        let usd = h.ledger.convert_sa_to_usd("creator_1", dec!(1000)).await.unwrap();
        assert_eq!(usd, dec!(10.00));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, Decimal::ZERO);
        assert_eq!(wallet.usd_balance, dec!(10.00));

        let transactions = h.store.all_transactions().await;
        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.tx_type, TransactionType::Conversion);
        assert_eq!(tx.amount, dec!(1000));
        assert_eq!(tx.currency, Currency::Sa);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.metadata["usd_amount"], serde_json::json!(dec!(10.00)));
    }

    #[tokio::test]
    async fn partial_conversion_preserves_remainder() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", dec!(250), dec!(3)).await;

        let usd = h.ledger.convert_sa_to_usd("creator_1", dec!(100)).await.unwrap();
        assert_eq!(usd, dec!(1.00));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(150));
        assert_eq!(wallet.usd_balance, dec!(4.00));
    }

    #[tokio::test]
    async fn insufficient_sa_refused() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", dec!(10), Decimal::ZERO).await;

        let result = h.ledger.convert_sa_to_usd("creator_1", dec!(11)).await;
        assert_eq!(result, Err(LedgerError::InsufficientBalance));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.sa_balance, dec!(10));
        assert!(h.store.all_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn missing_wallet_refused() {
        let h = create_harness();
        let result = h.ledger.convert_sa_to_usd("nobody", dec!(5)).await;
        assert_eq!(result, Err(LedgerError::InsufficientBalance));
    }

    #[tokio::test]
    async fn non_positive_amount_refused() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", dec!(10), Decimal::ZERO).await;

        assert_eq!(
            h.ledger.convert_sa_to_usd("creator_1", Decimal::ZERO).await,
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(
            h.ledger.convert_sa_to_usd("creator_1", dec!(-5)).await,
            Err(LedgerError::InvalidAmount)
        );
    }
}

// ============================================================================
// Withdrawal Tests
// ============================================================================

mod withdrawal {
    use super::*;

    #[tokio::test]
    async fn debits_only_after_gateway_confirms() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;

        h.ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await
            .unwrap();

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.usd_balance, dec!(30));

        let calls = h.gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (
                "creator_1".to_string(),
                dec!(20),
                Currency::Usd,
                WithdrawalMethod::Stripe
            )
        );

        let transactions = h.store.all_transactions().await;
        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        assert_eq!(tx.tx_type, TransactionType::Withdrawal);
        assert_eq!(tx.amount, dec!(-20));
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn declined_transfer_leaves_wallet_untouched() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;
        h.gateway.set_outcome(Ok(false));

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert!(matches!(result, Err(LedgerError::TransferFailed(_))));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.usd_balance, dec!(50));

        let transactions = h.store.all_transactions().await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn unreachable_gateway_marks_transaction_failed() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;
        h.gateway.set_outcome(Err("connection refused".to_string()));

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert!(matches!(result, Err(LedgerError::TransferFailed(_))));

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.usd_balance, dec!(50));
        assert_eq!(
            h.store.all_transactions().await[0].status,
            TransactionStatus::Failed
        );
    }

    #[tokio::test]
    async fn below_minimum_refused_without_transaction() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(5), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert_eq!(
            result,
            Err(LedgerError::BelowMinimum { minimum: dec!(10) })
        );

        let wallet = h.store.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.usd_balance, dec!(50));
        assert!(h.store.all_transactions().await.is_empty());
        assert!(h.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn method_must_settle_requested_currency() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Ngn, WithdrawalMethod::Stripe)
            .await;
        assert_eq!(result, Err(LedgerError::UnsupportedMethod));

        let result = h
            .ledger
            .request_withdrawal(
                "creator_1",
                dec!(20),
                Currency::Usd,
                WithdrawalMethod::Paystack,
            )
            .await;
        assert_eq!(result, Err(LedgerError::UnsupportedMethod));

        // Paystack settles NGN.
        h.ledger
            .request_withdrawal(
                "creator_1",
                dec!(20),
                Currency::Ngn,
                WithdrawalMethod::Paystack,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn insufficient_balance_refused() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(15)).await;

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert_eq!(result, Err(LedgerError::InsufficientBalance));
        assert!(h.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_withdrawals_reserve_balance() {
        let h = create_harness();
        seed_wallet(&h.store, "creator_1", Decimal::ZERO, dec!(50)).await;

        // An earlier withdrawal is still waiting on its gateway.
        h.store
            .append_transaction(&NewTransaction {
                user_id: "creator_1".to_string(),
                tx_type: TransactionType::Withdrawal,
                amount: dec!(-40),
                currency: Currency::Usd,
                status: TransactionStatus::Pending,
                metadata: json!({ "method": "stripe" }),
            })
            .await
            .unwrap();

        let result = h
            .ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert_eq!(result, Err(LedgerError::InsufficientBalance));

        // Only 10 USD is free; a request within it goes through.
        h.ledger
            .request_withdrawal("creator_1", dec!(10), Currency::Usd, WithdrawalMethod::Stripe)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn oversubscribed_reservation_aborts_before_gateway() {
        let store = Arc::new(InterposingStore::with_rival_reservation(dec!(20)));
        let directory = Arc::new(MemoryDirectory::new(false));
        let gateway = Arc::new(RecordingGateway::new());
        let clock = Arc::new(FixedClock::new(day(2026, 8, 30)));
        let ledger = RewardLedger::new(
            store.clone(),
            directory,
            gateway.clone(),
            clock,
            RewardPolicy::default(),
        );
        seed_wallet(&store.inner, "creator_1", Decimal::ZERO, dec!(30)).await;

        // A rival reservation slips in between the free-balance check
        // and this request's own pending row; the re-check catches the
        // oversubscription before the gateway is invoked.
        let result = ledger
            .request_withdrawal("creator_1", dec!(20), Currency::Usd, WithdrawalMethod::Stripe)
            .await;
        assert_eq!(result, Err(LedgerError::InsufficientBalance));
        assert!(gateway.calls().is_empty());

        let wallet = store.inner.get_wallet("creator_1").await.unwrap().unwrap();
        assert_eq!(wallet.usd_balance, dec!(30));

        // The rival's reservation stays pending; this request's own row
        // is closed out as failed rather than left holding balance.
        let transactions = store.inner.all_transactions().await;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].status, TransactionStatus::Pending);
        assert_eq!(transactions[1].status, TransactionStatus::Failed);
    }
}

// ============================================================================
// Daily Reset Sweep Tests
// ============================================================================

mod daily_reset {
    use super::*;

    #[tokio::test]
    async fn sweeps_only_stale_rows() {
        let h = create_harness();
        seed_stats(&h.store, "a", dec!(120), day(2026, 8, 28)).await;
        seed_stats(&h.store, "b", dec!(500), day(2026, 8, 29)).await;
        seed_stats(&h.store, "c", dec!(13), day(2026, 8, 30)).await;

        let count = h.ledger.run_daily_reset().await.unwrap();
        assert_eq!(count, 2);

        for user in ["a", "b"] {
            let stats = h.store.get_stats(user).await.unwrap().unwrap();
            assert_eq!(stats.daily_sa_earned, Decimal::ZERO);
            assert_eq!(stats.last_reset_date, day(2026, 8, 30));
        }

        // Today's row is untouched.
        let stats = h.store.get_stats("c").await.unwrap().unwrap();
        assert_eq!(stats.daily_sa_earned, dec!(13));
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let h = create_harness();
        seed_stats(&h.store, "a", dec!(120), day(2026, 8, 28)).await;

        assert_eq!(h.ledger.run_daily_reset().await.unwrap(), 1);
        assert_eq!(h.ledger.run_daily_reset().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cap_enforcement_does_not_depend_on_sweep() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;
        seed_stats(&h.store, "creator_1", dec!(500), day(2026, 8, 30)).await;

        // Day rolls over with no sweep run.
        h.clock.set_today(day(2026, 8, 31));

        let reward = h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        assert_eq!(reward, dec!(0.5));
    }
}

// ============================================================================
// Transaction History Tests
// ============================================================================

mod history {
    use super::*;

    #[tokio::test]
    async fn newest_first_with_limit() {
        let h = create_harness();
        h.directory.set_verified("creator_1", true).await;

        for _ in 0..3 {
            h.ledger.reward_interaction("creator_1", "like", json!({})).await;
        }
        seed_wallet(&h.store, "other", dec!(100), Decimal::ZERO).await;
        h.ledger.convert_sa_to_usd("other", dec!(100)).await.unwrap();

        let history = h.ledger.transaction_history("creator_1", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|t| t.user_id == "creator_1"));

        let all = h.ledger.transaction_history("creator_1", 50).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
