//! Ledger API for reward crediting, conversion, and withdrawals
//!
//! Endpoints:
//!   POST /reward -> Credit an interaction reward
//!   GET  /cap/{user_id} -> Daily cap status
//!   GET  /wallet/{user_id} -> Wallet balances
//!   GET  /transactions/{user_id} -> Recent ledger entries
//!   POST /convert -> Convert SA to USD
//!   POST /withdraw -> Request a withdrawal
//!   POST /admin/daily-reset -> Sweep stale daily counters

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::ledger::{
    CapStatus, Currency, LedgerError, RewardLedger, Transaction, Wallet, WithdrawalMethod,
};

#[derive(Clone)]
pub struct LedgerApiState {
    pub ledger: Arc<RewardLedger>,
}

impl LedgerApiState {
    pub fn new(ledger: Arc<RewardLedger>) -> Self {
        Self { ledger }
    }
}

#[derive(Deserialize)]
pub struct RewardRequest {
    pub user_id: String,
    pub interaction_type: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Serialize)]
pub struct RewardResponse {
    pub reward: Decimal,
    pub daily_earned: Decimal,
    pub remaining: Decimal,
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    pub user_id: String,
    pub sa_amount: Decimal,
}

#[derive(Serialize)]
pub struct ConvertResponse {
    pub usd_amount: Decimal,
}

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub user_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub method: WithdrawalMethod,
}

#[derive(Serialize)]
pub struct WithdrawResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub reset_count: u64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::InsufficientBalance
            | LedgerError::BelowMinimum { .. }
            | LedgerError::UnsupportedMethod
            | LedgerError::InvalidAmount => StatusCode::BAD_REQUEST,
            LedgerError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Credit a reward for one interaction. Never fails: an unverified
/// user, a reached cap, or a store hiccup all yield reward 0.
pub async fn post_reward(
    State(state): State<LedgerApiState>,
    Json(request): Json<RewardRequest>,
) -> Json<RewardResponse> {
    let reward = state
        .ledger
        .reward_interaction(&request.user_id, &request.interaction_type, request.metadata)
        .await;

    // Report current standing alongside the reward; fall back to an
    // empty day if the read fails, mirroring the deployed contract.
    let cap = match state.ledger.check_daily_cap(&request.user_id).await {
        Ok(cap) => cap,
        Err(e) => {
            warn!(user_id = %request.user_id, error = %e, "Cap status read failed");
            CapStatus {
                earned: Decimal::ZERO,
                remaining: state.ledger.policy().daily_sa_cap,
                percentage: Decimal::ZERO,
            }
        }
    };

    Json(RewardResponse {
        reward,
        daily_earned: cap.earned,
        remaining: cap.remaining,
    })
}

pub async fn get_cap(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<CapStatus>, LedgerError> {
    Ok(Json(state.ledger.check_daily_cap(&user_id).await?))
}

pub async fn get_wallet(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Wallet>, Response> {
    match state.ledger.wallet(&user_id).await {
        Ok(Some(wallet)) => Ok(Json(wallet)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "wallet not found".to_string(),
            }),
        )
            .into_response()),
        Err(e) => Err(e.into_response()),
    }
}

pub async fn get_transactions(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Transaction>>, LedgerError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    Ok(Json(state.ledger.transaction_history(&user_id, limit).await?))
}

pub async fn post_convert(
    State(state): State<LedgerApiState>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, LedgerError> {
    let usd_amount = state
        .ledger
        .convert_sa_to_usd(&request.user_id, request.sa_amount)
        .await?;
    Ok(Json(ConvertResponse { usd_amount }))
}

pub async fn post_withdraw(
    State(state): State<LedgerApiState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, LedgerError> {
    state
        .ledger
        .request_withdrawal(
            &request.user_id,
            request.amount,
            request.currency,
            request.method,
        )
        .await?;
    Ok(Json(WithdrawResponse {
        status: "completed",
    }))
}

pub async fn post_daily_reset(
    State(state): State<LedgerApiState>,
) -> Result<Json<ResetResponse>, LedgerError> {
    let reset_count = state.ledger.run_daily_reset().await?;
    Ok(Json(ResetResponse { reset_count }))
}

pub fn create_router(state: LedgerApiState) -> Router {
    Router::new()
        .route("/reward", post(post_reward))
        .route("/cap/{user_id}", get(get_cap))
        .route("/wallet/{user_id}", get(get_wallet))
        .route("/transactions/{user_id}", get(get_transactions))
        .route("/convert", post(post_convert))
        .route("/withdraw", post(post_withdraw))
        .route("/admin/daily-reset", post(post_daily_reset))
        .with_state(state)
}
