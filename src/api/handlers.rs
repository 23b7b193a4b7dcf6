//! Request handlers for the public game and wallet surface.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::errors::EngineError;
use crate::game::types::EntryType;
use crate::game::{self, RoundEngine};
use crate::round_store;
use crate::wallet::WalletService;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub engine: Arc<RoundEngine>,
    pub wallet: Arc<WalletService>,
    pub version: String,
    pub admin_api_key: Option<String>,
}

fn engine_err(request_id: &RequestId, err: EngineError) -> ApiError {
    ApiError::from_engine(request_id.0.clone(), err)
}

fn store_err(request_id: &RequestId, err: crate::store::StoreError) -> ApiError {
    ApiError::from_engine(request_id.0.clone(), EngineError::Persistence(err))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
    })
}

/// GET /round - current round snapshot
pub async fn current_round_handler(
    State(state): State<Arc<AppState>>,
) -> Json<RoundSnapshot> {
    let (round, live_bets, live_staked) = state.engine.snapshot().await;
    Json(RoundSnapshot::from_round(&round, live_bets, live_staked))
}

/// GET /round/:period - one round by period number
pub async fn round_detail_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(period): Path<u64>,
) -> Result<Json<SettledRoundSummary>, ApiError> {
    let round = round_store::load_round(state.engine.store(), period)
        .map_err(|e| store_err(&request_id, e))?
        .ok_or_else(|| {
            ApiError::not_found(request_id.0.clone(), format!("period {} not found", period))
        })?;
    Ok(Json(SettledRoundSummary::from(&round)))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

const MAX_PAGE: usize = 100;

/// GET /rounds?cursor={hex}&limit={n} - settled history, newest first
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.clamp(1, MAX_PAGE);
    let (rounds, next_cursor) = round_store::load_settled_rounds(
        state.engine.store(),
        query.cursor.as_deref(),
        limit,
    )
    .map_err(|e| store_err(&request_id, e))?;

    Ok(Json(HistoryResponse {
        rounds: rounds.iter().map(SettledRoundSummary::from).collect(),
        next_cursor,
    }))
}

/// POST /bet - admit a bet into the current round
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<BetResponse>, ApiError> {
    let player_name = req.player_name.as_deref().unwrap_or(&req.account_id);
    let bet = game::place_bet(&state.engine, &req.account_id, player_name, req.digit, req.amount)
        .await
        .map_err(|e| engine_err(&request_id, e))?;
    Ok(Json(BetResponse::from(&bet)))
}

/// GET /account/:id/bets?cursor={hex}&limit={n} - bet history, newest first
pub async fn account_bets_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<BetsResponse>, ApiError> {
    let limit = query.limit.clamp(1, MAX_PAGE);
    let (bets, next_cursor) = round_store::load_account_bets(
        state.engine.store(),
        &account_id,
        query.cursor.as_deref(),
        limit,
    )
    .map_err(|e| store_err(&request_id, e))?;

    Ok(Json(BetsResponse {
        bets: bets.iter().map(BetResponse::from).collect(),
        next_cursor,
    }))
}

/// GET /account/:id/stats
pub async fn account_stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = round_store::load_account_stats(state.engine.store(), &account_id)
        .map_err(|e| store_err(&request_id, e))?;
    Ok(Json(StatsResponse::from_stats(&account_id, &stats)))
}

/// GET /wallet/:id - current balance
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .wallet
        .balance(&account_id)
        .await
        .map_err(|e| engine_err(&request_id, e))?;
    Ok(Json(BalanceResponse {
        account_id,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(rename = "type")]
    #[serde(default)]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// GET /wallet/:id/transactions?type={bet|win|...}&cursor={hex}&limit={n}
pub async fn transactions_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let limit = query.limit.clamp(1, MAX_PAGE);
    let (entries, next_cursor) = round_store::load_account_entries(
        state.engine.store(),
        &account_id,
        query.entry_type,
        query.cursor.as_deref(),
        limit,
    )
    .map_err(|e| store_err(&request_id, e))?;

    Ok(Json(TransactionsResponse {
        entries: entries.iter().map(EntryResponse::from).collect(),
        next_cursor,
    }))
}

/// POST /wallet/deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state
        .wallet
        .deposit(&req.account_id, req.amount)
        .await
        .map_err(|e| engine_err(&request_id, e))?;
    Ok(Json(EntryResponse::from(&entry)))
}

/// POST /wallet/withdraw
pub async fn withdraw_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state
        .wallet
        .withdraw(&req.account_id, req.amount)
        .await
        .map_err(|e| engine_err(&request_id, e))?;
    Ok(Json(EntryResponse::from(&entry)))
}

/// POST /wallet/bonus - claim the daily bonus
pub async fn bonus_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BonusRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = state
        .wallet
        .claim_daily_bonus(&req.account_id)
        .await
        .map_err(|e| engine_err(&request_id, e))?;
    Ok(Json(EntryResponse::from(&entry)))
}
