//! MCP Data Access
//!
//! `DataAccess` backed by `mongodb-mcp-server`. The server is started with
//! `--readOnly` and only allow-listed operations are offered or executed.
//!
//! A connection-level failure drops the client; the next call reconnects.
//! A call that runs out of time keeps the connection. Nothing here retries
//! a failed call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use wfm_chat_tools::{is_read_only_operation, DataAccess, OperationSpec, Records, ShimError};

use super::mcp_client::{McpClient, McpError, McpServerConfig, McpTransportConfig};
use crate::models::settings::AppConfig;

/// JSON-RPC codes meaning the request itself was unacceptable
const REJECTED_CODES: &[i64] = &[-32600, -32601, -32602];

/// Map an MCP client error onto the data-access taxonomy.
pub fn classify_mcp_error(err: &McpError) -> ShimError {
    match err {
        e if e.is_connection_failure() => ShimError::unavailable(e.to_string()),
        McpError::Timeout(_) => ShimError::timeout(err.to_string()),
        McpError::Rpc { code, message } if REJECTED_CODES.contains(code) => {
            ShimError::rejected(message.clone())
        }
        McpError::Rpc { message, .. } => ShimError::execution(message.clone()),
        other => ShimError::execution(other.to_string()),
    }
}

/// Server configuration for the document-store MCP server.
pub fn server_config(config: &AppConfig) -> McpServerConfig {
    let transport = match &config.mcp_url {
        Some(url) => McpTransportConfig::Http {
            url: url.clone(),
            headers: HashMap::new(),
        },
        None => {
            let mut args = config.mcp_args.clone();
            args.push("--readOnly".to_string());
            args.push("--connectionString".to_string());
            args.push(config.mongodb_connection_string.clone());
            McpTransportConfig::Stdio {
                command: config.mcp_command.clone(),
                args,
                env: HashMap::new(),
            }
        }
    };

    McpServerConfig {
        name: "mongodb".to_string(),
        transport,
        response_timeout_secs: config.tool_timeout_secs.saturating_add(10),
    }
}

/// Read-only data access over an MCP server
pub struct McpDataAccess {
    config: McpServerConfig,
    client: RwLock<Option<Arc<McpClient>>>,
    operations: RwLock<Vec<OperationSpec>>,
    connect_lock: Mutex<()>,
}

impl McpDataAccess {
    pub fn new(config: McpServerConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            operations: RwLock::new(Vec::new()),
            connect_lock: Mutex::new(()),
        }
    }

    /// Establish the connection now instead of on first use.
    pub async fn connect(&self) -> Result<usize, ShimError> {
        self.client().await?;
        Ok(self.operations.read().await.len())
    }

    /// Return the live client, connecting first if needed.
    async fn client(&self) -> Result<Arc<McpClient>, ShimError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let _guard = self.connect_lock.lock().await;
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        // A server that cannot finish the handshake is unreachable, whatever the cause
        let client = McpClient::connect(&self.config)
            .await
            .map_err(|e| ShimError::unavailable(e.to_string()))?;
        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                client.disconnect().await;
                return Err(ShimError::unavailable(e.to_string()));
            }
        };

        let total = tools.len();
        let operations: Vec<OperationSpec> = tools
            .into_iter()
            .filter(|t| is_read_only_operation(&t.name))
            .map(|t| OperationSpec::new(t.name, t.description, t.input_schema))
            .collect();
        tracing::info!(
            server = %self.config.name,
            offered = total,
            read_only = operations.len(),
            "MCP tools discovered"
        );

        let client = Arc::new(client);
        *self.operations.write().await = operations;
        *self.client.write().await = Some(client.clone());
        Ok(client)
    }

    /// Forget `failed` if it is still the active client.
    async fn drop_connection(&self, failed: &Arc<McpClient>) {
        let mut slot = self.client.write().await;
        if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, failed)) {
            *slot = None;
            drop(slot);
            tracing::warn!(
                server = %self.config.name,
                "MCP connection lost, will reconnect on next call"
            );
            failed.disconnect().await;
        }
    }

    /// Stop the server process, if any.
    pub async fn shutdown(&self) {
        if let Some(client) = self.client.write().await.take() {
            client.disconnect().await;
        }
    }
}

#[async_trait]
impl DataAccess for McpDataAccess {
    async fn operations(&self) -> Result<Vec<OperationSpec>, ShimError> {
        self.client().await?;
        Ok(self.operations.read().await.clone())
    }

    async fn execute(
        &self,
        operation: &str,
        arguments: &Value,
        timeout: Duration,
    ) -> Result<Records, ShimError> {
        if !is_read_only_operation(operation) {
            return Err(ShimError::rejected(format!(
                "'{}' is not a read-only operation",
                operation
            )));
        }

        let client = self.client().await?;
        match client.call_tool(operation, arguments, timeout).await {
            Ok(output) if output.is_error => {
                let text = output.text();
                Err(ShimError::execution(if text.is_empty() {
                    format!("{} failed", operation)
                } else {
                    text
                }))
            }
            Ok(output) => Ok(Records::new(output.content)),
            Err(e) => {
                if e.is_connection_failure() {
                    self.drop_connection(&client).await;
                }
                Err(classify_mcp_error(&e))
            }
        }
    }

    async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }
}
