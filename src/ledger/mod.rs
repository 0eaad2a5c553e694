//! Creator reward ledger core.
//!
//! Balances, daily-cap accounting, conversion, and withdrawals, with
//! all durable state behind the `LedgerStore` seam.

pub mod engine;
pub mod error;
pub mod models;
pub mod traits;

pub use engine::{RewardLedger, RewardPolicy};
pub use error::LedgerError;
pub use models::{
    CapStatus, CreatorStats, Currency, NewTransaction, Transaction, TransactionStatus,
    TransactionType, Wallet, WithdrawalMethod,
};
pub use traits::{Clock, LedgerStore, PaymentGateway, SystemClock, UpdateOutcome, UserDirectory};
