//! Storage Layer
//!
//! Configuration loading. Conversation state lives in memory only.

pub mod config;

pub use config::ConfigService;
