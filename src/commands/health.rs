//! Health Handler
//!
//! `GET /health`: data-access connection state and the active model.

use axum::extract::State;
use axum::response::Json;

use crate::models::chat::HealthResponse;
use crate::state::AppState;

pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.data_access.is_connected().await;

    // Only count operations of a live connection; listing would reconnect.
    let operation_count = if connected {
        state
            .data_access
            .operations()
            .await
            .map(|ops| ops.len())
            .unwrap_or(0)
    } else {
        0
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        data_access_connected: connected,
        operation_count,
        model: state.model.clone(),
        active_conversations: state.sessions.len().await,
    })
}
