//! Chat API Models
//!
//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};
use wfm_chat_core::FailureKind;

use super::conversation::{Conversation, ToolCallRecord, Turn, TurnStatus};

/// `POST /chat` request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// `POST /chat` response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub tool_calls_used: usize,
    pub degraded: bool,
    pub conversation_id: String,
}

/// Error body: `{ "error": { "kind", "message" } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// `GET /health` response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub data_access_connected: bool,
    pub operation_count: usize,
    pub model: String,
    pub active_conversations: usize,
}

/// One history message as exposed by `GET /conversations/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct HistoryMessage {
    pub role: &'static str,
    pub content: String,
}

/// Summary of one tool call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallSummary {
    pub operation: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub elapsed_ms: u64,
}

impl From<&ToolCallRecord> for ToolCallSummary {
    fn from(record: &ToolCallRecord) -> Self {
        Self {
            operation: record.operation.clone(),
            success: record.result.success,
            error_kind: record.result.failure_kind.map(|k| k.to_string()),
            elapsed_ms: record.elapsed_ms,
        }
    }
}

/// Summary of one retained turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnSummary {
    pub user_text: String,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    pub exchanges: usize,
    pub elapsed_ms: u64,
    pub tool_calls: Vec<ToolCallSummary>,
}

impl From<&Turn> for TurnSummary {
    fn from(turn: &Turn) -> Self {
        Self {
            user_text: turn.user_text.clone(),
            status: turn.status,
            failure_kind: turn.status.failure_kind(),
            exchanges: turn.exchanges.len(),
            elapsed_ms: turn.elapsed_ms,
            tool_calls: turn.tool_calls().map(ToolCallSummary::from).collect(),
        }
    }
}

/// `GET /conversations/{id}` response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub conversation_id: String,
    pub history: Vec<HistoryMessage>,
    pub turns: Vec<TurnSummary>,
    pub created_at: String,
    pub last_active: String,
}

impl From<&Conversation> for ConversationView {
    fn from(conversation: &Conversation) -> Self {
        use wfm_chat_llm::MessageRole;

        Self {
            conversation_id: conversation.id().to_string(),
            history: conversation
                .history()
                .messages()
                .iter()
                .map(|m| HistoryMessage {
                    role: match m.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "assistant",
                    },
                    content: m.text_content(),
                })
                .collect(),
            turns: conversation.turns().map(TurnSummary::from).collect(),
            created_at: conversation.created_at().to_rfc3339(),
            last_active: conversation.last_active().to_rfc3339(),
        }
    }
}
