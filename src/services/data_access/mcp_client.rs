//! MCP Client
//!
//! JSON-RPC 2.0 client for Model Context Protocol servers over stdio or HTTP.
//!
//! Requests on one client are serialized behind an async mutex. A request's
//! wait starts once it holds the transport, so queueing behind other calls
//! never eats into its budget. Every response is matched to its request id,
//! and a response left behind by an abandoned call is skipped instead of
//! being handed to the next caller.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Protocol revision sent in `initialize`
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Header carrying the session id on the streamable HTTP transport
const SESSION_HEADER: &str = "mcp-session-id";

/// Errors from the MCP client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McpError {
    /// The server process could not be started
    #[error("Failed to spawn MCP server '{name}' (command: {command}): {message}")]
    Spawn {
        name: String,
        command: String,
        message: String,
    },

    /// Pipe or HTTP failure; the connection should be considered lost
    #[error("MCP transport error: {0}")]
    Transport(String),

    /// No response within the request's wait
    #[error("Timed out waiting for MCP server response after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server answered with a JSON-RPC error
    #[error("MCP error [{code}]: {message}")]
    Rpc { code: i64, message: String },

    /// The server answered with something that is not a valid response
    #[error("MCP protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// Whether the connection itself failed, as opposed to the request.
    ///
    /// A timeout leaves the connection usable: the late response is skipped
    /// by id when it eventually arrives.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, McpError::Spawn { .. } | McpError::Transport(_))
    }
}

pub type McpResult<T> = Result<T, McpError>;

/// Configuration for connecting to an MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Server name (for logs)
    pub name: String,
    /// Transport type
    pub transport: McpTransportConfig,
    /// Wait for handshake and listing responses, in seconds
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

fn default_response_timeout_secs() -> u64 {
    30
}

/// Transport-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McpTransportConfig {
    /// Stdio transport: spawn a child process
    #[serde(rename = "stdio")]
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// HTTP transport: POST JSON-RPC to a running server
    #[serde(rename = "http")]
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

/// A tool advertised by an MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of `tools/call`
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolOutput {
    /// Content blocks as returned by the server
    pub content: Vec<Value>,
    /// The server flagged the call as failed (`isError`)
    pub is_error: bool,
}

impl McpToolOutput {
    /// Text blocks joined by newline
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn into_result(self, method: &str) -> McpResult<Value> {
        if let Some(error) = self.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        self.result
            .ok_or_else(|| McpError::Protocol(format!("No result in {} response", method)))
    }
}

/// Parse one incoming message, returning it only if it answers `expected_id`.
///
/// Server-initiated requests and notifications carry a `method` and are
/// ignored, as are responses to other ids.
fn match_response(raw: &str, expected_id: u64) -> Option<JsonRpcResponse> {
    let value: Value = serde_json::from_str(raw).ok()?;
    if value.get("method").is_some() {
        return None;
    }
    let response: JsonRpcResponse = serde_json::from_value(value).ok()?;
    match response.id {
        Some(id) if id == expected_id => Some(response),
        other => {
            tracing::debug!(
                expected = expected_id,
                got = ?other,
                "skipping unmatched MCP response"
            );
            None
        }
    }
}

/// Internal transport state for stdio connections
struct StdioTransport {
    process: Child,
    stdin: ChildStdin,
    stdout_reader: BufReader<ChildStdout>,
}

/// Internal transport state for HTTP connections
struct HttpTransport {
    url: String,
    client: reqwest::Client,
    headers: HashMap<String, String>,
    session_id: Option<String>,
}

/// Active transport connection
enum ActiveTransport {
    Stdio(StdioTransport),
    Http(HttpTransport),
}

/// MCP client for communicating with MCP servers
pub struct McpClient {
    transport: Mutex<ActiveTransport>,
    request_id: AtomicU64,
    response_timeout: Duration,
}

impl McpClient {
    /// Connect to an MCP server and perform the initialization handshake:
    /// 1. Send `initialize` request
    /// 2. Receive server capabilities
    /// 3. Send `notifications/initialized` notification
    pub async fn connect(config: &McpServerConfig) -> McpResult<Self> {
        let transport = match &config.transport {
            McpTransportConfig::Stdio { command, args, env } => {
                ActiveTransport::Stdio(Self::spawn_stdio(&config.name, command, args, env)?)
            }
            McpTransportConfig::Http { url, headers } => {
                let client = reqwest::Client::builder().build().map_err(|e| {
                    McpError::Transport(format!("Failed to create HTTP client: {}", e))
                })?;
                ActiveTransport::Http(HttpTransport {
                    url: url.clone(),
                    client,
                    headers: headers.clone(),
                    session_id: None,
                })
            }
        };

        let client = Self {
            transport: Mutex::new(transport),
            request_id: AtomicU64::new(1),
            response_timeout: Duration::from_secs(config.response_timeout_secs),
        };

        let result = client
            .send_request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "wfm-chat",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
                client.response_timeout,
            )
            .await?;

        client.send_notification("notifications/initialized").await?;

        tracing::info!(
            server = %config.name,
            protocol = result
                .get("protocolVersion")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown"),
            "MCP server connected"
        );
        Ok(client)
    }

    fn spawn_stdio(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> McpResult<StdioTransport> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_err = |message: String| McpError::Spawn {
            name: name.to_string(),
            command: command.to_string(),
            message,
        };

        let mut process = cmd.spawn().map_err(|e| spawn_err(e.to_string()))?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| spawn_err("stdin not captured".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| spawn_err("stdout not captured".to_string()))?;

        // Drain stderr so a chatty server never blocks on a full pipe
        if let Some(stderr) = process.stderr.take() {
            let server = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(server = %server, "{}", line);
                }
            });
        }

        Ok(StdioTransport {
            process,
            stdin,
            stdout_reader: BufReader::new(stdout),
        })
    }

    /// List all tools available on the connected MCP server
    pub async fn list_tools(&self) -> McpResult<Vec<McpToolInfo>> {
        let result = self
            .send_request("tools/list", None, self.response_timeout)
            .await?;

        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tool| {
                let name = tool.get("name").and_then(Value::as_str)?.to_string();
                Some(McpToolInfo {
                    name,
                    description: tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    input_schema: tool
                        .get("inputSchema")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
            })
            .collect();

        Ok(tools)
    }

    /// Call a tool, waiting at most `wait` once the transport is free.
    pub async fn call_tool(
        &self,
        name: &str,
        args: &Value,
        wait: Duration,
    ) -> McpResult<McpToolOutput> {
        let params = serde_json::json!({
            "name": name,
            "arguments": args,
        });

        let result = self.send_request("tools/call", Some(params), wait).await?;

        let content = match result.get("content") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => vec![result.clone()],
        };
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(McpToolOutput { content, is_error })
    }

    /// Disconnect from the MCP server
    pub async fn disconnect(&self) {
        let mut transport = self.transport.lock().await;
        if let ActiveTransport::Stdio(stdio) = &mut *transport {
            let _ = stdio.stdin.shutdown().await;
            let _ = stdio.process.kill().await;
        }
    }

    /// Send a JSON-RPC request and wait for its matching response.
    ///
    /// `wait` is measured from the moment the transport lock is held.
    async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        wait: Duration,
    ) -> McpResult<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };

        let mut transport = self.transport.lock().await;
        let response = match &mut *transport {
            ActiveTransport::Stdio(stdio) => {
                // Only the read is bounded; a half-written line would corrupt the pipe
                write_stdio_message(&mut stdio.stdin, &request).await?;
                let read = read_stdio_response(&mut stdio.stdout_reader, id);
                tokio::time::timeout(wait, read)
                    .await
                    .map_err(|_| McpError::Timeout(wait))??
            }
            ActiveTransport::Http(http) => send_http_request(http, &request, Some(wait))
                .await?
                .ok_or_else(|| McpError::Protocol(format!("Empty response to {}", method)))?,
        };
        response.into_result(method)
    }

    /// Send a notification (no id, no response)
    async fn send_notification(&self, method: &str) -> McpResult<()> {
        let notification = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: Some(serde_json::json!({})),
        };

        let mut transport = self.transport.lock().await;
        match &mut *transport {
            ActiveTransport::Stdio(stdio) => {
                write_stdio_message(&mut stdio.stdin, &notification).await
            }
            ActiveTransport::Http(http) => {
                send_http_request(http, &notification, None).await?;
                Ok(())
            }
        }
    }
}

/// Write one newline-delimited JSON message to the server's stdin
async fn write_stdio_message(
    stdin: &mut ChildStdin,
    message: &JsonRpcRequest<'_>,
) -> McpResult<()> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| McpError::Protocol(format!("Failed to serialize request: {}", e)))?;
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|e| McpError::Transport(format!("Failed to write to MCP server stdin: {}", e)))?;
    stdin
        .flush()
        .await
        .map_err(|e| McpError::Transport(format!("Failed to flush MCP server stdin: {}", e)))
}

/// Read lines until the response for `expected_id` arrives.
///
/// Blank lines, non-JSON output and unmatched messages are skipped.
async fn read_stdio_response(
    reader: &mut BufReader<ChildStdout>,
    expected_id: u64,
) -> McpResult<JsonRpcResponse> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(|e| {
            McpError::Transport(format!("Failed to read from MCP server stdout: {}", e))
        })?;
        if bytes_read == 0 {
            return Err(McpError::Transport(
                "MCP server closed stdout (process may have exited)".to_string(),
            ));
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(response) = match_response(trimmed, expected_id) {
            return Ok(response);
        }
    }
}

/// POST one JSON-RPC message. Accepts a JSON body or an SSE stream carrying
/// the response in `data:` lines. `wait` is `None` for notifications.
async fn send_http_request(
    transport: &mut HttpTransport,
    message: &JsonRpcRequest<'_>,
    wait: Option<Duration>,
) -> McpResult<Option<JsonRpcResponse>> {
    let mut builder = transport
        .client
        .post(&transport.url)
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream")
        .json(message);
    for (key, value) in &transport.headers {
        builder = builder.header(key, value);
    }
    if let Some(session) = &transport.session_id {
        builder = builder.header(SESSION_HEADER, session);
    }
    if let Some(wait) = wait {
        builder = builder.timeout(wait);
    }

    let response = builder.send().await.map_err(|e| match wait {
        Some(wait) if e.is_timeout() => McpError::Timeout(wait),
        _ => McpError::Transport(format!("HTTP request failed: {}", e)),
    })?;

    if let Some(session) = response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        transport.session_id = Some(session.to_string());
    }

    let status = response.status();
    let is_sse = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));
    let body = response
        .text()
        .await
        .map_err(|e| McpError::Transport(format!("Failed to read response body: {}", e)))?;

    if status.is_server_error() {
        return Err(McpError::Transport(format!(
            "MCP server returned HTTP {}: {}",
            status, body
        )));
    }
    if !status.is_success() {
        return Err(McpError::Protocol(format!(
            "MCP server returned HTTP {}: {}",
            status, body
        )));
    }
    let Some(expected_id) = message.id.filter(|_| wait.is_some()) else {
        return Ok(None);
    };

    let found = if is_sse {
        body.lines()
            .filter_map(|l| l.strip_prefix("data:"))
            .find_map(|data| match_response(data.trim(), expected_id))
    } else {
        match_response(body.trim(), expected_id)
    };

    found
        .map(Some)
        .ok_or_else(|| McpError::Protocol(format!("No response for request {}", expected_id)))
}
