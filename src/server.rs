//! HTTP Server
//!
//! Router for the chat API.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::commands::{delete_conversation, get_conversation, get_health, post_chat};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(post_chat))
        .route("/health", get(get_health))
        .route(
            "/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
