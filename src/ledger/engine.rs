//! Reward ledger engine.
//!
//! Owns the SA crediting rules (flat reward per interaction, daily cap
//! with lazy UTC-date rollover), SA→USD conversion, gateway-confirmed
//! withdrawals, and the stale-stats sweep. All durable state goes
//! through the `LedgerStore` seam; every balance-bearing write is a
//! compare-and-set, retried a bounded number of times so concurrent
//! credits for the same user cannot lose updates.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::ledger::error::LedgerError;
use crate::ledger::models::{
    CapStatus, CreatorStats, Currency, NewTransaction, Transaction, TransactionStatus,
    TransactionType, Wallet, WithdrawalMethod,
};
use crate::ledger::traits::{Clock, LedgerStore, PaymentGateway, UpdateOutcome, UserDirectory};

/// Attempts before a contended compare-and-set gives up
const CAS_RETRY_LIMIT: usize = 5;

/// Tunable reward constants. Defaults match the deployed platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// SA credited per qualifying interaction, regardless of type
    pub sa_per_interaction: Decimal,
    /// Maximum SA a user may earn within one UTC calendar day
    pub daily_sa_cap: Decimal,
    /// USD credited per SA on conversion
    pub sa_to_usd_rate: Decimal,
    /// Minimum withdrawal amount (USD-equivalent)
    pub min_withdrawal: Decimal,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            sa_per_interaction: dec!(0.5),
            daily_sa_cap: dec!(500),
            sa_to_usd_rate: dec!(0.01),
            min_withdrawal: dec!(10),
        }
    }
}

pub struct RewardLedger {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn UserDirectory>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    policy: RewardPolicy,
}

impl RewardLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        directory: Arc<dyn UserDirectory>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        policy: RewardPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            gateway,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    /// Credit a verified creator for one interaction. Returns the SA
    /// granted: 0 when the user is unverified, the daily cap is reached,
    /// or any store call fails. Reward crediting is best-effort and
    /// never returns an error to the caller.
    pub async fn reward_interaction(
        &self,
        user_id: &str,
        interaction_type: &str,
        metadata: Value,
    ) -> Decimal {
        match self.try_reward(user_id, interaction_type, metadata).await {
            Ok(reward) => reward,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Reward crediting aborted");
                Decimal::ZERO
            }
        }
    }

    async fn try_reward(
        &self,
        user_id: &str,
        interaction_type: &str,
        metadata: Value,
    ) -> Result<Decimal, LedgerError> {
        let mut bootstrapped = false;

        for _ in 0..CAS_RETRY_LIMIT {
            let today = self.clock.today();

            let stats = match self.store.get_stats(user_id).await? {
                Some(stats) => stats,
                None => {
                    if bootstrapped {
                        return Err(LedgerError::Store(
                            "stats row missing after bootstrap".to_string(),
                        ));
                    }
                    // Lazy bootstrap, then retry the whole operation.
                    // create_stats is idempotent so concurrent first
                    // calls cannot duplicate the row.
                    self.store
                        .create_stats(&CreatorStats::new(user_id, today))
                        .await?;
                    bootstrapped = true;
                    continue;
                }
            };

            // Lazy daily rollover: a stale reset date means today's
            // counter is zero. The reset is persisted together with the
            // earn claim below, in one conditional update.
            let earned = if stats.last_reset_date == today {
                stats.daily_sa_earned
            } else {
                Decimal::ZERO
            };

            if earned >= self.policy.daily_sa_cap {
                debug!(user_id = %user_id, "Daily SA cap reached, no reward");
                return Ok(Decimal::ZERO);
            }

            // Policy gate, not an error: only verified creators earn.
            if !self.directory.verification_status(user_id).await? {
                debug!(user_id = %user_id, "User not verified, no reward");
                return Ok(Decimal::ZERO);
            }

            let reward = self.policy.sa_per_interaction;
            // The cap clamps the counter, never the granted amount: a
            // reward is all-or-nothing, so the last credit of the day
            // may land exactly on the cap but is never shaved to fit.
            let new_earned = (earned + reward).min(self.policy.daily_sa_cap);

            // Claim today's budget first. The conditional update on the
            // previously read counter and reset date serializes
            // concurrent credits, including across the rollover.
            match self
                .store
                .update_stats(
                    user_id,
                    new_earned,
                    today,
                    stats.daily_sa_earned,
                    stats.last_reset_date,
                )
                .await?
            {
                UpdateOutcome::Conflict => continue,
                UpdateOutcome::Applied => {}
            }

            if let Err(e) = self.adjust_wallet(user_id, reward, Decimal::ZERO).await {
                self.release_claim(user_id, reward).await;
                return Err(e);
            }

            let record = NewTransaction {
                user_id: user_id.to_string(),
                tx_type: TransactionType::Reward,
                amount: reward,
                currency: Currency::Sa,
                status: TransactionStatus::Completed,
                metadata: with_interaction_type(metadata.clone(), interaction_type),
            };
            if let Err(e) = self.store.append_transaction(&record).await {
                // Every balance mutation must have a ledger row; undo
                // both writes so the failed call leaves no trace.
                if self
                    .adjust_wallet(user_id, -reward, Decimal::ZERO)
                    .await
                    .is_err()
                {
                    error!(user_id = %user_id, "Failed to revoke credit after ledger append failure");
                }
                self.release_claim(user_id, reward).await;
                return Err(e.into());
            }

            debug!(user_id = %user_id, reward = %reward, daily_earned = %new_earned, "SA reward credited");
            return Ok(reward);
        }

        Err(LedgerError::Store(
            "too many concurrent updates for user".to_string(),
        ))
    }

    /// Current-day earnings against the cap. Applies the same lazy
    /// rollover as reward crediting, so a caller checking just after
    /// midnight sees zero rather than yesterday's counter.
    pub async fn check_daily_cap(&self, user_id: &str) -> Result<CapStatus, LedgerError> {
        let today = self.clock.today();
        let cap = self.policy.daily_sa_cap;

        let earned = match self.store.get_stats(user_id).await? {
            Some(stats) if stats.last_reset_date == today => stats.daily_sa_earned,
            Some(stats) => {
                // Persist the rollover opportunistically; a concurrent
                // reward call winning the conditional update is fine.
                let _ = self
                    .store
                    .update_stats(
                        user_id,
                        Decimal::ZERO,
                        today,
                        stats.daily_sa_earned,
                        stats.last_reset_date,
                    )
                    .await?;
                Decimal::ZERO
            }
            None => Decimal::ZERO,
        };

        let remaining = (cap - earned).max(Decimal::ZERO);
        let percentage = if cap.is_zero() {
            Decimal::ZERO
        } else {
            earned / cap * dec!(100)
        };

        Ok(CapStatus {
            earned,
            remaining,
            percentage,
        })
    }

    /// Convert SA to USD at the configured rate. Atomic swap: both
    /// balances move in a single conditional wallet update.
    pub async fn convert_sa_to_usd(
        &self,
        user_id: &str,
        sa_amount: Decimal,
    ) -> Result<Decimal, LedgerError> {
        if sa_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let usd_amount = sa_amount * self.policy.sa_to_usd_rate;

        for _ in 0..CAS_RETRY_LIMIT {
            let wallet = self
                .store
                .get_wallet(user_id)
                .await?
                .ok_or(LedgerError::InsufficientBalance)?;

            if wallet.sa_balance < sa_amount {
                return Err(LedgerError::InsufficientBalance);
            }

            match self
                .store
                .update_wallet(
                    user_id,
                    wallet.sa_balance - sa_amount,
                    wallet.usd_balance + usd_amount,
                    wallet.sa_balance,
                    wallet.usd_balance,
                )
                .await?
            {
                UpdateOutcome::Conflict => continue,
                UpdateOutcome::Applied => {}
            }

            let record = NewTransaction {
                user_id: user_id.to_string(),
                tx_type: TransactionType::Conversion,
                amount: sa_amount,
                currency: Currency::Sa,
                status: TransactionStatus::Completed,
                metadata: json!({ "usd_amount": usd_amount }),
            };
            if let Err(e) = self.store.append_transaction(&record).await {
                if self.adjust_wallet(user_id, sa_amount, -usd_amount).await.is_err() {
                    error!(user_id = %user_id, "Failed to unwind conversion after ledger append failure");
                }
                return Err(e.into());
            }

            info!(user_id = %user_id, sa = %sa_amount, usd = %usd_amount, "SA converted to USD");
            return Ok(usd_amount);
        }

        Err(LedgerError::Store(
            "too many concurrent wallet updates".to_string(),
        ))
    }

    /// Withdraw settled USD through a payment gateway. The wallet is
    /// debited only after the gateway confirms; until then the pending
    /// transaction reserves the amount against concurrent requests.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: Currency,
        method: WithdrawalMethod,
    ) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if amount < self.policy.min_withdrawal {
            return Err(LedgerError::BelowMinimum {
                minimum: self.policy.min_withdrawal,
            });
        }
        if method.settles() != currency {
            return Err(LedgerError::UnsupportedMethod);
        }

        let wallet = self
            .store
            .get_wallet(user_id)
            .await?
            .ok_or(LedgerError::InsufficientBalance)?;
        let reserved = self.store.pending_withdrawal_total(user_id).await?;
        if wallet.usd_balance - reserved < amount {
            return Err(LedgerError::InsufficientBalance);
        }

        // Reservation record: holds the amount while the gateway runs.
        let transaction_id = self
            .store
            .append_transaction(&NewTransaction {
                user_id: user_id.to_string(),
                tx_type: TransactionType::Withdrawal,
                amount: -amount,
                currency,
                status: TransactionStatus::Pending,
                metadata: json!({ "method": method }),
            })
            .await?;

        // Re-check with the reservation in place before any money moves.
        // Concurrent requests that each passed the first check against
        // the same free balance all land here oversubscribed and abort.
        match self.reserved_fits(user_id).await {
            Ok(true) => {}
            Ok(false) => {
                let _ = self
                    .store
                    .update_transaction_status(transaction_id, TransactionStatus::Failed)
                    .await;
                warn!(user_id = %user_id, amount = %amount, "Withdrawal reservation oversubscribed");
                return Err(LedgerError::InsufficientBalance);
            }
            Err(e) => {
                let _ = self
                    .store
                    .update_transaction_status(transaction_id, TransactionStatus::Failed)
                    .await;
                return Err(e);
            }
        }

        match self
            .gateway
            .transfer(user_id, amount, currency, method)
            .await
        {
            Ok(true) => {
                if let Err(e) = self.adjust_wallet(user_id, Decimal::ZERO, -amount).await {
                    // Gateway settled but the debit did not land. Leave
                    // the row pending so reconciliation can find it.
                    error!(
                        user_id = %user_id,
                        transaction_id = %transaction_id,
                        error = %e,
                        "Withdrawal settled at gateway but wallet debit failed"
                    );
                    return Err(e);
                }
                self.store
                    .update_transaction_status(transaction_id, TransactionStatus::Completed)
                    .await
                    .map_err(|e| {
                        error!(
                            transaction_id = %transaction_id,
                            "Withdrawal debited but status update failed"
                        );
                        LedgerError::Store(e)
                    })?;
                info!(user_id = %user_id, amount = %amount, "Withdrawal completed");
                Ok(())
            }
            Ok(false) => {
                let _ = self
                    .store
                    .update_transaction_status(transaction_id, TransactionStatus::Failed)
                    .await;
                warn!(user_id = %user_id, amount = %amount, "Gateway declined withdrawal");
                Err(LedgerError::TransferFailed(
                    "gateway declined the transfer".to_string(),
                ))
            }
            Err(e) => {
                let _ = self
                    .store
                    .update_transaction_status(transaction_id, TransactionStatus::Failed)
                    .await;
                warn!(user_id = %user_id, error = %e, "Gateway transfer failed");
                Err(LedgerError::TransferFailed(e))
            }
        }
    }

    /// Reset stale daily counters in bulk. A convenience sweep for users
    /// who have not interacted recently; cap enforcement never depends
    /// on it running because every call re-checks the date.
    pub async fn run_daily_reset(&self) -> Result<u64, LedgerError> {
        let today = self.clock.today();
        let count = self.store.sweep_stale_stats(today).await?;
        info!(reset_count = count, "Daily reset sweep completed");
        Ok(count)
    }

    pub async fn wallet(&self, user_id: &str) -> Result<Option<Wallet>, LedgerError> {
        Ok(self.store.get_wallet(user_id).await?)
    }

    pub async fn transaction_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.transaction_history(user_id, limit).await?)
    }

    /// True when the wallet balance covers every pending withdrawal
    /// reservation, the caller's just-appended one included.
    async fn reserved_fits(&self, user_id: &str) -> Result<bool, LedgerError> {
        let wallet = self
            .store
            .get_wallet(user_id)
            .await?
            .ok_or(LedgerError::InsufficientBalance)?;
        let reserved = self.store.pending_withdrawal_total(user_id).await?;
        Ok(wallet.usd_balance >= reserved)
    }

    /// Apply signed deltas to a wallet, creating it lazily with zero
    /// balances. Refuses any delta that would take a balance negative.
    async fn adjust_wallet(
        &self,
        user_id: &str,
        sa_delta: Decimal,
        usd_delta: Decimal,
    ) -> Result<(), LedgerError> {
        for _ in 0..CAS_RETRY_LIMIT {
            let wallet = match self.store.get_wallet(user_id).await? {
                Some(wallet) => wallet,
                None => {
                    self.store.create_wallet(&Wallet::new(user_id)).await?;
                    continue;
                }
            };

            let new_sa = wallet.sa_balance + sa_delta;
            let new_usd = wallet.usd_balance + usd_delta;
            if new_sa < Decimal::ZERO || new_usd < Decimal::ZERO {
                return Err(LedgerError::InsufficientBalance);
            }

            match self
                .store
                .update_wallet(
                    user_id,
                    new_sa,
                    new_usd,
                    wallet.sa_balance,
                    wallet.usd_balance,
                )
                .await?
            {
                UpdateOutcome::Conflict => continue,
                UpdateOutcome::Applied => return Ok(()),
            }
        }

        Err(LedgerError::Store(
            "too many concurrent wallet updates".to_string(),
        ))
    }

    /// Best-effort release of a claimed slice of today's budget after a
    /// later step failed. Never fails the caller; logs if it loses.
    async fn release_claim(&self, user_id: &str, reward: Decimal) {
        let today = self.clock.today();
        for _ in 0..CAS_RETRY_LIMIT {
            let stats = match self.store.get_stats(user_id).await {
                Ok(Some(stats)) => stats,
                Ok(None) => return,
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Failed to release daily-cap claim");
                    return;
                }
            };
            if stats.last_reset_date != today {
                // A rollover happened in between; nothing to release.
                return;
            }
            let restored = (stats.daily_sa_earned - reward).max(Decimal::ZERO);
            match self
                .store
                .update_stats(
                    user_id,
                    restored,
                    today,
                    stats.daily_sa_earned,
                    stats.last_reset_date,
                )
                .await
            {
                Ok(UpdateOutcome::Applied) => return,
                Ok(UpdateOutcome::Conflict) => continue,
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Failed to release daily-cap claim");
                    return;
                }
            }
        }
        error!(user_id = %user_id, "Gave up releasing daily-cap claim after contention");
    }
}

/// Merge the interaction type into caller-supplied metadata the way the
/// deployed service records it.
fn with_interaction_type(metadata: Value, interaction_type: &str) -> Value {
    let mut map = match metadata {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("context".to_string(), other);
            map
        }
    };
    map.insert(
        "interaction_type".to_string(),
        Value::String(interaction_type.to_string()),
    );
    Value::Object(map)
}
