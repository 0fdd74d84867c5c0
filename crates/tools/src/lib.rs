//! WFM Chat Tools
//!
//! Data-access seam and operation handling for the WFM Chat conversation loop.
//!
//! This crate provides the pieces that do not depend on a concrete backend:
//! - `DataAccess` trait - read-only query execution interface
//! - `OperationCatalog` - operations offered to the model, with argument validation
//! - `Records` - structured query results and their rendering
//! - `ToolResult` - per-call outcome fed back to the model
//!
//! The MCP-backed `DataAccess` implementation lives in the main crate's
//! `services::data_access` module.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod records;
pub mod schema;
pub mod trait_def;

// Re-export core types
pub use catalog::{is_read_only_operation, OperationCatalog, READ_ONLY_OPERATIONS};
pub use error::{ShimError, ShimErrorKind};
pub use executor::ToolResult;
pub use records::{truncate_chars, Records};
pub use schema::{sanitize_schema, validate_arguments};
pub use trait_def::{DataAccess, OperationSpec};
