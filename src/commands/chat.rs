//! Chat Handler
//!
//! `POST /chat`: run one turn in the requested (or a new) conversation.

use axum::extract::State;
use axum::response::Json;
use tokio_util::sync::CancellationToken;

use super::ApiError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::conversation::TurnError;
use crate::state::AppState;

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(TurnError::EmptyMessage.into());
    }

    let (conversation_id, conversation) = state
        .sessions
        .get_or_create(request.conversation_id.as_deref())
        .await;

    // Dropping the handler (client gone) cancels the turn.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let mut conversation = conversation.lock().await;
    let report = state
        .conversation_loop
        .run_turn(&mut conversation, &request.message, &cancel)
        .await?;

    Ok(Json(ChatResponse {
        answer: report.answer,
        tool_calls_used: report.tool_calls_used,
        degraded: report.degraded,
        conversation_id,
    }))
}
