//! Settings Models
//!
//! Application configuration, read once at startup.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use wfm_chat_llm::ProviderConfig;

/// Upper bound accepted for `max_exchanges`.
pub const MAX_EXCHANGES_LIMIT: u32 = 50;

/// Application configuration
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Anthropic API key (never written back out)
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
    /// Messages API endpoint override
    pub anthropic_base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Maximum tokens per model response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// HTTP timeout for one model request, in seconds
    pub request_timeout_secs: u64,
    /// Document-store connection string handed to the MCP server
    pub mongodb_connection_string: String,
    /// Database the assistant queries
    pub database: String,
    /// Command that launches the MCP server over stdio
    pub mcp_command: String,
    /// Arguments for `mcp_command`; `--readOnly` and `--connectionString` are appended
    pub mcp_args: Vec<String>,
    /// Reach an already running MCP server over HTTP instead of spawning one
    pub mcp_url: Option<String>,
    /// Per-tool-call timeout, in seconds
    pub tool_timeout_secs: u64,
    /// Maximum model exchanges per turn
    pub max_exchanges: u32,
    /// Retries for a failing model call
    pub model_max_retries: u32,
    /// First backoff delay, in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Messages replayed from earlier turns
    pub history_max_messages: usize,
    /// Characters replayed from earlier turns
    pub history_max_chars: usize,
    /// Turn traces kept per conversation
    pub max_retained_turns: usize,
    /// Characters of a single tool result shown to the model
    pub max_tool_result_chars: usize,
    /// Conversations kept in memory
    pub max_sessions: usize,
    /// HTTP listen address
    pub bind_address: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: None,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 2000,
            temperature: 0.2,
            request_timeout_secs: 120,
            mongodb_connection_string: "mongodb://localhost:27017/wfm_database".to_string(),
            database: "wfm_database".to_string(),
            mcp_command: "npx".to_string(),
            mcp_args: vec!["-y".to_string(), "mongodb-mcp-server".to_string()],
            mcp_url: None,
            tool_timeout_secs: 20,
            max_exchanges: 10,
            model_max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            history_max_messages: 20,
            history_max_chars: 60_000,
            max_retained_turns: 10,
            max_tool_result_chars: 20_000,
            max_sessions: 1_000,
            bind_address: "127.0.0.1:8000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Provider settings for the model client
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.anthropic_api_key.clone(),
            base_url: self.anthropic_base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind_address
            .parse()
            .map_err(|e| format!("Invalid bind_address '{}': {}", self.bind_address, e))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model cannot be empty".to_string());
        }

        if self.max_tokens == 0 {
            return Err("max_tokens must be at least 1".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            ));
        }

        if self.request_timeout_secs == 0 || self.tool_timeout_secs == 0 {
            return Err("timeouts must be at least 1 second".to_string());
        }

        if self.max_exchanges == 0 || self.max_exchanges > MAX_EXCHANGES_LIMIT {
            return Err(format!(
                "max_exchanges must be between 1 and {}, got {}",
                MAX_EXCHANGES_LIMIT, self.max_exchanges
            ));
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err("retry_base_delay_ms cannot exceed retry_max_delay_ms".to_string());
        }

        if self.history_max_messages < 2 {
            return Err("history_max_messages must be at least 2".to_string());
        }

        if self.history_max_chars == 0 || self.max_tool_result_chars == 0 {
            return Err("character limits must be at least 1".to_string());
        }

        if self.max_sessions == 0 {
            return Err("max_sessions must be at least 1".to_string());
        }

        if self.mcp_url.is_none() {
            if self.mcp_command.trim().is_empty() {
                return Err("mcp_command cannot be empty".to_string());
            }
            if self.mongodb_connection_string.trim().is_empty() {
                return Err("mongodb_connection_string cannot be empty".to_string());
            }
        }

        self.socket_addr()?;

        Ok(())
    }
}
