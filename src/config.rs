use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;

use crate::gateway::GatewayEndpoints;
use crate::ledger::RewardPolicy;

/// Configuration for the SA ledger service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Reward policy configuration
    pub rewards: RewardsConfig,
    /// Payment gateway configuration
    pub gateway: GatewayConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses in-memory fallback)
    pub postgres_enabled: bool,
}

/// Reward constants, overridable per deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// SA credited per interaction
    pub sa_per_interaction: Decimal,
    /// Maximum SA earnable per UTC day
    pub daily_sa_cap: Decimal,
    /// USD per SA on conversion
    pub sa_to_usd_rate: Decimal,
    /// Minimum withdrawal (USD-equivalent)
    pub min_withdrawal: Decimal,
}

impl RewardsConfig {
    /// Convert to RewardPolicy for use by the ledger engine
    pub fn to_policy(&self) -> RewardPolicy {
        RewardPolicy {
            sa_per_interaction: self.sa_per_interaction,
            daily_sa_cap: self.daily_sa_cap,
            sa_to_usd_rate: self.sa_to_usd_rate,
            min_withdrawal: self.min_withdrawal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Stripe transfer endpoint (USD payouts)
    pub stripe_url: String,
    /// Stripe API key - MUST be from environment
    pub stripe_api_key: String,
    /// Paystack transfer endpoint (NGN payouts)
    pub paystack_url: String,
    /// Paystack API key - MUST be from environment
    pub paystack_api_key: String,
    /// Require HTTPS for gateway communications
    pub require_https: bool,
    /// Gateway request timeout in seconds
    pub timeout_secs: u64,
}

impl GatewayConfig {
    pub fn to_endpoints(&self) -> GatewayEndpoints {
        GatewayEndpoints {
            stripe_url: self.stripe_url.clone(),
            stripe_api_key: self.stripe_api_key.clone(),
            paystack_url: self.paystack_url.clone(),
            paystack_api_key: self.paystack_api_key.clone(),
            require_https: self.require_https,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            sa_per_interaction: dec!(0.5),
            daily_sa_cap: dec!(500),
            sa_to_usd_rate: dec!(0.01),
            min_withdrawal: dec!(10),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8090,
            },
            database: DatabaseConfig {
                postgres_url: "postgresql://localhost:5432/sa_ledger".to_string(),
                postgres_enabled: false,
            },
            rewards: RewardsConfig::default(),
            gateway: GatewayConfig {
                stripe_url: "https://api.stripe.com/v1/transfers".to_string(),
                stripe_api_key: String::new(), // MUST be configured for withdrawals
                paystack_url: "https://api.paystack.co/transfer".to_string(),
                paystack_api_key: String::new(),
                require_https: true,
                timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables and validate
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("SA_LEDGER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("SA_LEDGER_PORT") {
            config.server.port = port.parse().context("Invalid SA_LEDGER_PORT value")?;
        }

        // Database configuration
        if let Ok(url) = env::var("SA_LEDGER_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Ok(enabled) = env::var("SA_LEDGER_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid SA_LEDGER_POSTGRES_ENABLED value")?;
        }

        // Reward policy configuration
        if let Ok(amount) = env::var("SA_LEDGER_SA_PER_INTERACTION") {
            config.rewards.sa_per_interaction = amount
                .parse()
                .context("Invalid SA_LEDGER_SA_PER_INTERACTION value")?;
        }

        if let Ok(cap) = env::var("SA_LEDGER_DAILY_SA_CAP") {
            config.rewards.daily_sa_cap =
                cap.parse().context("Invalid SA_LEDGER_DAILY_SA_CAP value")?;
        }

        if let Ok(rate) = env::var("SA_LEDGER_SA_TO_USD_RATE") {
            config.rewards.sa_to_usd_rate = rate
                .parse()
                .context("Invalid SA_LEDGER_SA_TO_USD_RATE value")?;
        }

        if let Ok(minimum) = env::var("SA_LEDGER_MIN_WITHDRAWAL") {
            config.rewards.min_withdrawal = minimum
                .parse()
                .context("Invalid SA_LEDGER_MIN_WITHDRAWAL value")?;
        }

        // Gateway configuration
        if let Ok(url) = env::var("SA_LEDGER_STRIPE_URL") {
            config.gateway.stripe_url = url;
        }

        if let Ok(key) = env::var("SA_LEDGER_STRIPE_API_KEY") {
            config.gateway.stripe_api_key = key;
        }

        if let Ok(url) = env::var("SA_LEDGER_PAYSTACK_URL") {
            config.gateway.paystack_url = url;
        }

        if let Ok(key) = env::var("SA_LEDGER_PAYSTACK_API_KEY") {
            config.gateway.paystack_api_key = key;
        }

        if let Ok(require_https) = env::var("SA_LEDGER_REQUIRE_HTTPS") {
            config.gateway.require_https = require_https
                .parse()
                .context("Invalid SA_LEDGER_REQUIRE_HTTPS value")?;
        }

        if let Ok(timeout) = env::var("SA_LEDGER_GATEWAY_TIMEOUT_SECS") {
            config.gateway.timeout_secs = timeout
                .parse()
                .context("Invalid SA_LEDGER_GATEWAY_TIMEOUT_SECS value")?;
        }

        // Logging configuration
        if let Ok(level) = env::var("SA_LEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.database.postgres_enabled && self.database.postgres_url.is_empty() {
            return Err(anyhow::anyhow!(
                "PostgreSQL is enabled but no connection string is configured"
            ));
        }

        if self.rewards.sa_per_interaction <= Decimal::ZERO {
            return Err(anyhow::anyhow!("SA per interaction must be positive"));
        }

        if self.rewards.daily_sa_cap < self.rewards.sa_per_interaction {
            return Err(anyhow::anyhow!(
                "Daily SA cap must be at least one interaction reward"
            ));
        }

        if self.rewards.sa_to_usd_rate <= Decimal::ZERO {
            return Err(anyhow::anyhow!("SA to USD rate must be positive"));
        }

        if self.rewards.min_withdrawal <= Decimal::ZERO {
            return Err(anyhow::anyhow!("Minimum withdrawal must be positive"));
        }

        if self.gateway.require_https {
            for url in [&self.gateway.stripe_url, &self.gateway.paystack_url] {
                if !url.starts_with("https://") {
                    return Err(anyhow::anyhow!(
                        "HTTPS is required but gateway URL is not HTTPS: {}",
                        url
                    ));
                }
            }
        }

        Ok(())
    }
}
