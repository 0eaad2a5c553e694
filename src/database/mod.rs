//! Persistence Module
//!
//! PostgreSQL repositories for wallets, creator stats, transactions,
//! and directory lookups, plus an in-memory fallback used when
//! PostgreSQL is disabled.

pub mod memory;
pub mod pool;
pub mod stats;
pub mod store;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use memory::{MemoryDirectory, MemoryStore};
pub use pool::DatabasePool;
pub use stats::StatsRepository;
pub use transactions::TransactionRepository;
pub use users::UserRepository;
pub use wallets::WalletRepository;
