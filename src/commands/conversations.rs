//! Conversation Handlers
//!
//! `GET /conversations/{id}` and `DELETE /conversations/{id}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use super::ApiError;
use crate::models::chat::ConversationView;
use crate::state::AppState;

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let conversation = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Conversation not found: {}", id)))?;
    let conversation = conversation.lock().await;
    Ok(Json(ConversationView::from(&*conversation)))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        tracing::info!(conversation = %id, "conversation cleared");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Conversation not found: {}", id)))
    }
}
