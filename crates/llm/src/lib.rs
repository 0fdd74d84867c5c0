//! WFM Chat LLM
//!
//! Provides the model-inference interface used by the conversation loop:
//! - `LlmProvider` trait with non-streaming `send_message`
//! - Anthropic Claude implementation over the Messages API
//!
//! Also includes the shared message/tool types and the HTTP client factory.

pub mod anthropic;
pub mod http_client;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use types::*;
