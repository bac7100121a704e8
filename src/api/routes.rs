//! Health handlers

use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

/// GET / - Static running indicator
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    format!("✅ {} Bot is Running!", state.bot_name)
}

/// GET /health - Liveness status
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "alive",
        "bot": &*state.bot_name,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
    }))
}
