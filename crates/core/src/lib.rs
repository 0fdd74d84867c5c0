//! WFM Chat Core
//!
//! Foundational error types and the failure taxonomy shared by the WFM Chat
//! workspace. This crate has zero dependencies on application-level code
//! (HTTP server, MCP transport, LLM providers, etc.).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `failure` - Failure classification used by the conversation loop (`FailureKind`)
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod failure;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Failure Taxonomy ───────────────────────────────────────────────────
pub use failure::FailureKind;
