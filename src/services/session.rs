//! Session Store
//!
//! Owns one conversation per conversation id. Each conversation sits behind
//! its own async mutex so turns of one conversation never interleave while
//! independent conversations proceed in parallel.
//!
//! Past `max_sessions` the least recently used idle conversation is evicted.
//! A conversation whose turn is still running is never evicted, so the store
//! may briefly hold more than the limit.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::conversation::Conversation;
use crate::models::history::HistoryWindow;
use crate::models::settings::AppConfig;

struct SessionEntry {
    conversation: Arc<Mutex<Conversation>>,
    last_used: Instant,
}

/// Limits applied to conversations created by the store
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub history_max_messages: usize,
    pub history_max_chars: usize,
    pub max_retained_turns: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            history_max_messages: 20,
            history_max_chars: 60_000,
            max_retained_turns: 10,
        }
    }
}

impl From<&AppConfig> for SessionLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_sessions: config.max_sessions,
            history_max_messages: config.history_max_messages,
            history_max_chars: config.history_max_chars,
            max_retained_turns: config.max_retained_turns,
        }
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }

    /// Look up a conversation, creating it when the id is unknown or absent.
    ///
    /// Returns the id actually used alongside the conversation handle.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, Arc<Mutex<Conversation>>) {
        let id = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = Instant::now();
            return (id, entry.conversation.clone());
        }

        let conversation = Arc::new(Mutex::new(Conversation::new(
            id.clone(),
            HistoryWindow::new(
                self.limits.history_max_messages,
                self.limits.history_max_chars,
            ),
            self.limits.max_retained_turns,
        )));
        sessions.insert(
            id.clone(),
            SessionEntry {
                conversation: conversation.clone(),
                last_used: Instant::now(),
            },
        );

        let max = self.limits.max_sessions.max(1);
        while sessions.len() > max {
            let oldest = sessions
                .iter()
                .filter(|(key, entry)| **key != id && entry.conversation.try_lock().is_ok())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(
                        conversation = %key,
                        "evicting least recently used conversation"
                    );
                    sessions.remove(&key);
                }
                None => {
                    tracing::warn!(
                        active = sessions.len(),
                        max,
                        "every conversation is busy, session limit exceeded"
                    );
                    break;
                }
            }
        }

        tracing::debug!(conversation = %id, active = sessions.len(), "conversation created");
        (id, conversation)
    }

    /// Existing conversation, without creating one
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Conversation>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|entry| entry.conversation.clone())
    }

    /// Drop a conversation. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
