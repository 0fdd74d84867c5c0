//! Services
//!
//! - `conversation` - the bounded model/tool loop
//! - `data_access` - MCP-backed read-only data access
//! - `session` - per-conversation state ownership
//! - `system_prompt` - the WFM assistant system prompt

pub mod conversation;
pub mod data_access;
pub mod session;
pub mod system_prompt;
