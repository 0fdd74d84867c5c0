//! Data Access
//!
//! MCP transport and the `DataAccess` implementation built on it.

pub mod mcp_client;
pub mod mcp_shim;

pub use mcp_client::{McpClient, McpError, McpServerConfig, McpTransportConfig};
pub use mcp_shim::{server_config, McpDataAccess};
