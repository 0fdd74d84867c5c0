//! HTTP Handlers
//!
//! Handlers behind the axum router. Every failure is rendered as
//! `{ "error": { "kind", "message" } }` with a status derived from its kind.

pub mod chat;
pub mod conversations;
pub mod health;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use wfm_chat_core::FailureKind;

use crate::models::chat::{ErrorBody, ErrorDetail};
use crate::services::conversation::TurnError;

pub use chat::post_chat;
pub use conversations::{delete_conversation, get_conversation};
pub use health::get_health;

/// Client closed the request before the turn finished
const CLIENT_CLOSED_REQUEST: u16 = 499;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        let kind = err.kind();
        let status = match kind {
            FailureKind::Validation => StatusCode::BAD_REQUEST,
            FailureKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::Upstream => StatusCode::BAD_GATEWAY,
            FailureKind::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, kind.as_str(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
