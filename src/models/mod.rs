//! Data Models
//!
//! Conversation state, configuration and HTTP request/response bodies.

pub mod chat;
pub mod conversation;
pub mod history;
pub mod settings;
