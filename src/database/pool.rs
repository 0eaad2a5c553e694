//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::stats::StatsRepository;
use crate::database::transactions::TransactionRepository;
use crate::database::users::UserRepository;
use crate::database::wallets::WalletRepository;

pub struct DatabasePool {
    pool: PgPool,
    wallets: WalletRepository,
    stats: StatsRepository,
    transactions: TransactionRepository,
    users: UserRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str) -> Result<Self, String> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

        info!("Connected to PostgreSQL");

        let wallets = WalletRepository::new(pool.clone());
        let stats = StatsRepository::new(pool.clone());
        let transactions = TransactionRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());

        Ok(Self {
            pool,
            wallets,
            stats,
            transactions,
            users,
        })
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing database schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wallets (
                user_id     TEXT PRIMARY KEY,
                sa_balance  NUMERIC NOT NULL DEFAULT 0 CHECK (sa_balance >= 0),
                usd_balance NUMERIC NOT NULL DEFAULT 0 CHECK (usd_balance >= 0),
                created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create wallets table: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS creator_stats (
                user_id         TEXT PRIMARY KEY,
                daily_sa_earned NUMERIC NOT NULL DEFAULT 0 CHECK (daily_sa_earned >= 0),
                last_reset_date DATE NOT NULL,
                updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create creator_stats table: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id         UUID PRIMARY KEY,
                user_id    TEXT NOT NULL,
                tx_type    TEXT NOT NULL,
                amount     NUMERIC NOT NULL,
                currency   TEXT NOT NULL,
                status     TEXT NOT NULL,
                metadata   JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create transactions table: {}", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions (user_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create transactions index: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id              TEXT PRIMARY KEY,
                is_verified     BOOLEAN NOT NULL DEFAULT FALSE,
                followers_count BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create users table: {}", e))?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn wallets(&self) -> &WalletRepository {
        &self.wallets
    }

    pub fn stats(&self) -> &StatsRepository {
        &self.stats
    }

    pub fn transactions(&self) -> &TransactionRepository {
        &self.transactions
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
