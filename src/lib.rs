//! WFM Chat
//!
//! Conversational assistant over the workforce-management document store.
//! It includes:
//! - The bounded conversation loop (model exchanges and tool dispatch)
//! - Read-only data access over an MCP server
//! - Session storage and the HTTP chat API
//! - Configuration, logging and error types

pub mod commands;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::AppConfig;
pub use server::build_router;
pub use services::conversation::{ConversationConfig, ConversationLoop, TurnError, TurnReport};
pub use services::session::{SessionLimits, SessionStore};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
