use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use sa_ledger::{
    create_ledger_router, DatabasePool, HttpPaymentGateway, LedgerApiState, LedgerConfig,
    LedgerStore, MemoryDirectory, MemoryStore, RewardLedger, SystemClock, UserDirectory,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(LedgerConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?);

    init_logging(&config)?;

    info!("Starting SA creator reward ledger");
    info!(
        "Reward policy: {} SA per interaction, {} SA daily cap, {} USD/SA, {} minimum withdrawal",
        config.rewards.sa_per_interaction,
        config.rewards.daily_sa_cap,
        config.rewards.sa_to_usd_rate,
        config.rewards.min_withdrawal
    );

    let store: Arc<dyn LedgerStore>;
    let directory: Arc<dyn UserDirectory>;
    if config.database.postgres_enabled {
        let pool = Arc::new(
            DatabasePool::new(&config.database.postgres_url)
                .await
                .map_err(|e| anyhow::anyhow!(e))?,
        );
        pool.init_schema().await.map_err(|e| anyhow::anyhow!(e))?;
        store = pool.clone();
        directory = pool;
    } else {
        warn!("PostgreSQL disabled - using in-memory store, state is not durable");
        store = Arc::new(MemoryStore::new());
        // Dev fallback has no directory to consult; treat everyone as
        // verified.
        directory = Arc::new(MemoryDirectory::new(true));
    }

    let gateway = Arc::new(HttpPaymentGateway::new(config.gateway.to_endpoints())?);
    if config.gateway.stripe_api_key.is_empty() && config.gateway.paystack_api_key.is_empty() {
        warn!("No gateway API keys configured - withdrawals will be declined");
    }

    let ledger = Arc::new(RewardLedger::new(
        store,
        directory,
        gateway,
        Arc::new(SystemClock),
        config.rewards.to_policy(),
    ));

    let app = Router::new()
        .merge(create_ledger_router(LedgerApiState::new(ledger)))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("SA ledger server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &LedgerConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
