//! Application State
//!
//! Shared state handed to every HTTP handler.

use std::sync::Arc;

use wfm_chat_tools::DataAccess;

use crate::services::conversation::ConversationLoop;
use crate::services::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub conversation_loop: Arc<ConversationLoop>,
    pub sessions: Arc<SessionStore>,
    /// Backend used by the loop, for health reporting
    pub data_access: Arc<dyn DataAccess>,
    /// Model name reported by `/health`
    pub model: String,
}

impl AppState {
    pub fn new(
        conversation_loop: ConversationLoop,
        sessions: SessionStore,
        data_access: Arc<dyn DataAccess>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            conversation_loop: Arc::new(conversation_loop),
            sessions: Arc::new(sessions),
            data_access,
            model: model.into(),
        }
    }
}
