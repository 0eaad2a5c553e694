//! SA Creator Reward Ledger
//!
//! Wallet balances, daily-cap reward accounting, SA→USD conversion, and
//! gateway-confirmed withdrawals for the platform's creator
//! monetization scheme.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs      - Crate root with re-exports
//! ├── main.rs     - Server entrypoint
//! ├── config.rs   - Configuration management
//! ├── ledger/     - Reward ledger core
//! │   ├── engine.rs - Crediting, cap tracking, conversion, withdrawal
//! │   ├── models.rs - Wallets, stats, transactions
//! │   ├── traits.rs - Store/directory/gateway/clock seams
//! │   └── error.rs  - Ledger error taxonomy
//! ├── database/   - Persistence
//! │   ├── pool.rs   - PostgreSQL pool and schema bootstrap
//! │   ├── wallets.rs, stats.rs, transactions.rs, users.rs - Repositories
//! │   ├── store.rs  - LedgerStore/UserDirectory impls for the pool
//! │   └── memory.rs - In-memory fallback
//! ├── gateway.rs  - Stripe/Paystack transfer client
//! └── api/        - HTTP API endpoints
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod gateway;
pub mod ledger;

// Re-export main types for convenience
pub use api::{create_ledger_router, LedgerApiState};
pub use config::LedgerConfig;
pub use database::{DatabasePool, MemoryDirectory, MemoryStore};
pub use gateway::{GatewayEndpoints, HttpPaymentGateway};
pub use ledger::{
    CapStatus, Clock, CreatorStats, Currency, LedgerError, LedgerStore, NewTransaction,
    PaymentGateway, RewardLedger, RewardPolicy, SystemClock, Transaction, TransactionStatus,
    TransactionType, UpdateOutcome, UserDirectory, Wallet, WithdrawalMethod,
};
