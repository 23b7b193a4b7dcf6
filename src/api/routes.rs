//! Route definitions.
//!
//! Maps URLs to handlers with type-safe routing.

use super::{admin, handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Round surface
        .route("/round", get(current_round_handler))
        .route("/round/:period", get(round_detail_handler))
        .route("/rounds", get(history_handler))
        .route("/bet", post(place_bet_handler))
        // Account surface
        .route("/account/:id/bets", get(account_bets_handler))
        .route("/account/:id/stats", get(account_stats_handler))
        // Wallet surface
        .route("/wallet/:id", get(balance_handler))
        .route("/wallet/:id/transactions", get(transactions_handler))
        .route("/wallet/deposit", post(deposit_handler))
        .route("/wallet/withdraw", post(withdraw_handler))
        .route("/wallet/bonus", post(bonus_handler))
        // Administrator surface
        .route("/admin/round", get(admin::admin_round_handler))
        .route(
            "/admin/override",
            post(admin::set_override_handler).delete(admin::clear_override_handler),
        )
        // Real-time event feed
        .route("/ws", get(websocket_handler))
        // Attach shared state
        .with_state(state)
}
