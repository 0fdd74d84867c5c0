//! Conversation Loop
//!
//! Drives the model through a bounded number of exchanges per turn,
//! dispatching its tool calls to the data-access backend in between.

pub mod budget;
pub mod dispatch;
pub mod outcome;
pub mod retry;
pub mod service;

use std::time::Duration;

use crate::models::settings::AppConfig;

pub use dispatch::ToolDispatcher;
pub use outcome::{TurnError, TurnReport};
pub use retry::RetryPolicy;
pub use service::ConversationLoop;

/// Limits applied to every turn
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Maximum model exchanges per turn
    pub max_exchanges: u32,
    /// Budget for one backend attempt of a tool call
    pub tool_timeout: Duration,
    pub retry: RetryPolicy,
    /// Characters of one tool result shown to the model
    pub max_tool_result_chars: usize,
    /// Database named in the system prompt
    pub database: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_exchanges: 10,
            tool_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            max_tool_result_chars: 20_000,
            database: "wfm_database".to_string(),
        }
    }
}

impl From<&AppConfig> for ConversationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_exchanges: config.max_exchanges,
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            retry: RetryPolicy {
                max_retries: config.model_max_retries,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
                max_delay: Duration::from_millis(config.retry_max_delay_ms),
            },
            max_tool_result_chars: config.max_tool_result_chars,
            database: config.database.clone(),
        }
    }
}
