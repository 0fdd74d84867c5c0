//! Integration Tests Module
//!
//! Tests cover the conversation loop end to end, the HTTP router and the
//! MCP-backed data access.


// Exchange bound, tool failures, retries and cancellation
mod conversation_loop_test;


// McpDataAccess against a mock stdio MCP server
mod mcp_data_access_test;
