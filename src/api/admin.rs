//! Administrator control surface.
//!
//! Gated by the `x-admin-key` header. When no key is configured the whole
//! surface answers 401, so the default deployment is locked down.

use super::{
    errors::ApiError,
    handlers::AppState,
    middleware::{RequestId, ADMIN_KEY_HEADER},
    models::{AdminRoundResponse, OverrideRequest, RoundSnapshot},
};
use crate::round_store;
use axum::{extract::State, http::HeaderMap, Extension, Json};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::warn;

fn require_admin(
    request_id: &RequestId,
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let expected = state.admin_api_key.as_deref().ok_or_else(|| {
        ApiError::unauthorized(
            request_id.0.clone(),
            "administrator surface is disabled".to_string(),
        )
    })?;
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        warn!(request_id = %request_id.0, "rejected admin request with bad key");
        return Err(ApiError::unauthorized(
            request_id.0.clone(),
            "invalid administrator key".to_string(),
        ));
    }
    Ok(())
}

fn snapshot_with_live(state: &AppState, round: &crate::game::types::Round) -> RoundSnapshot {
    RoundSnapshot::from_round(
        round,
        state.engine.live_bets.load(Ordering::Relaxed),
        state.engine.live_staked.load(Ordering::Relaxed),
    )
}

/// POST /admin/override - arm the winning digit for the current round
pub async fn set_override_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<RoundSnapshot>, ApiError> {
    require_admin(&request_id, &state, &headers)?;
    let round = state
        .engine
        .set_override(req.digit)
        .await
        .map_err(|e| ApiError::from_engine(request_id.0.clone(), e))?;
    Ok(Json(snapshot_with_live(&state, &round)))
}

/// DELETE /admin/override - return the round to random resolution
pub async fn clear_override_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RoundSnapshot>, ApiError> {
    require_admin(&request_id, &state, &headers)?;
    let round = state
        .engine
        .clear_override()
        .await
        .map_err(|e| ApiError::from_engine(request_id.0.clone(), e))?;
    Ok(Json(snapshot_with_live(&state, &round)))
}

/// GET /admin/round - current round with override state and per-digit
/// exposure, read straight from storage so it reflects committed bets.
pub async fn admin_round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminRoundResponse>, ApiError> {
    require_admin(&request_id, &state, &headers)?;

    let (round, _, _) = state.engine.snapshot().await;
    let bets = round_store::load_round_bets(state.engine.store(), round.period_number)
        .map_err(|e| {
            ApiError::from_engine(request_id.0.clone(), crate::errors::EngineError::from(e))
        })?;

    let mut staked_by_digit = [0u64; 10];
    let mut payout_by_digit = [0u64; 10];
    for bet in &bets {
        let digit = bet.digit as usize;
        staked_by_digit[digit] += bet.amount;
        payout_by_digit[digit] += bet.amount.saturating_mul(bet.multiplier as u64);
    }

    Ok(Json(AdminRoundResponse {
        period_number: round.period_number,
        phase: round.phase,
        closes_at: round.closes_at,
        override_digit: round.override_digit,
        manually_controlled: round.manually_controlled,
        total_bets: bets.len() as u64,
        total_staked: bets.iter().map(|b| b.amount).sum(),
        staked_by_digit,
        payout_by_digit,
    }))
}
