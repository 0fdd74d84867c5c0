//! MCP Data Access Integration Tests
//!
//! Runs `McpDataAccess` against a mock MCP server written in Python and
//! spoken to over stdio. The server handles one request at a time, like a
//! real stdio server, so concurrent calls queue on the pipe.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wfm_chat::services::conversation::ToolDispatcher;
use wfm_chat::services::data_access::{
    McpClient, McpDataAccess, McpError, McpServerConfig, McpTransportConfig,
};
use wfm_chat_llm::ToolCall;
use wfm_chat_tools::{DataAccess, OperationCatalog, ShimErrorKind};

const BUDGET: Duration = Duration::from_secs(10);

const MOCK_SERVER: &str = r#"
import sys, json, time

def send(message):
    sys.stdout.write(json.dumps(message) + "\n")
    sys.stdout.flush()

def respond(msg_id, result):
    send({"jsonrpc": "2.0", "id": msg_id, "result": result})

def fail(msg_id, code, message):
    send({"jsonrpc": "2.0", "id": msg_id, "error": {"code": code, "message": message}})

sys.stderr.write("mock mongodb server starting\n")
sys.stderr.flush()

for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    try:
        msg = json.loads(line)
    except Exception:
        continue

    method = msg.get("method", "")
    msg_id = msg.get("id")

    if method == "initialize":
        respond(msg_id, {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "mock-mongodb", "version": "0.1.0"}
        })
    elif method == "notifications/initialized":
        # unsolicited server notification before any response
        send({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}})
    elif method == "tools/list":
        respond(msg_id, {"tools": [
            {"name": "find", "description": "Find documents",
             "inputSchema": {"type": "object", "properties": {
                 "database": {"type": "string"}, "collection": {"type": "string"},
                 "filter": {"type": "object"}, "delay": {"type": "number"}},
                 "required": ["database", "collection"]}},
            {"name": "count", "description": "Count documents",
             "inputSchema": {"type": "object", "properties": {
                 "database": {"type": "string"}, "collection": {"type": "string"}}}},
            {"name": "insert-many", "description": "Insert documents",
             "inputSchema": {"type": "object"}}
        ]})
    elif method == "tools/call":
        params = msg.get("params", {})
        name = params.get("name", "")
        args = params.get("arguments", {})
        if name == "find":
            time.sleep(args.get("delay", 0))
            collection = args.get("collection", "?")
            respond(msg_id, {"content": [
                {"type": "text", "text": "Found 1 documents in " + collection},
                {"type": "text", "text": json.dumps({"EMP_ID": 2114, "EMP_NAME": "Ada Moreno"})}
            ]})
        elif name == "count":
            respond(msg_id, {"content": [{"type": "text", "text": "ns not found"}],
                             "isError": True})
        else:
            fail(msg_id, -32601, "Unknown tool: " + name)
"#;

fn mock_config(dir: &TempDir) -> McpServerConfig {
    let script_path = dir.path().join("mock_mongodb_mcp.py");
    std::fs::write(&script_path, MOCK_SERVER).unwrap();
    McpServerConfig {
        name: "mock-mongodb".to_string(),
        transport: McpTransportConfig::Stdio {
            command: "python3".to_string(),
            args: vec![script_path.to_string_lossy().to_string()],
            env: HashMap::new(),
        },
        response_timeout_secs: 10,
    }
}

#[tokio::test]
async fn test_connect_offers_only_read_only_operations() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));

    assert!(!access.is_connected().await);
    let count = access.connect().await.unwrap();
    assert_eq!(count, 2);
    assert!(access.is_connected().await);

    let names: Vec<String> = access
        .operations()
        .await
        .unwrap()
        .into_iter()
        .map(|op| op.name)
        .collect();
    assert_eq!(names, vec!["find", "count"]);

    access.shutdown().await;
    assert!(!access.is_connected().await);
}

#[tokio::test]
async fn test_execute_returns_records() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));

    // Connects lazily on first use
    let arguments = json!({
        "database": "wfm_database",
        "collection": "ITMS_EMP_MASTER",
        "filter": {"EMP_ID": 2114}
    });
    let records = access.execute("find", &arguments, BUDGET).await.unwrap();

    assert_eq!(records.len(), 2);
    let rendered = records.render(10_000);
    assert!(rendered.contains("Found 1 documents in ITMS_EMP_MASTER"));
    assert!(rendered.contains("Ada Moreno"));

    access.shutdown().await;
}

#[tokio::test]
async fn test_tool_error_result_is_execution_failure() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));

    let err = access
        .execute(
            "count",
            &json!({"database": "wfm_database", "collection": "ITMS_NOPE"}),
            BUDGET,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ShimErrorKind::Execution);
    assert_eq!(err.message, "ns not found");
    // Execution failures keep the connection
    assert!(access.is_connected().await);

    access.shutdown().await;
}

#[tokio::test]
async fn test_write_operation_is_rejected_without_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));

    let err = access
        .execute("insert-many", &json!({"documents": []}), BUDGET)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ShimErrorKind::Rejected);
    assert!(!access.is_connected().await);
}

#[tokio::test]
async fn test_unknown_tool_is_rpc_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = McpClient::connect(&mock_config(&dir)).await.unwrap();

    let err = client
        .call_tool("drop-database", &json!({}), BUDGET)
        .await
        .unwrap_err();
    match err {
        McpError::Rpc { code, ref message } => {
            assert_eq!(code, -32601);
            assert!(message.contains("drop-database"));
        }
        other => panic!("expected rpc error, got {:?}", other),
    }

    client.disconnect().await;
}

#[tokio::test]
async fn test_missing_server_binary_is_unavailable() {
    let access = McpDataAccess::new(McpServerConfig {
        name: "missing".to_string(),
        transport: McpTransportConfig::Stdio {
            command: "wfm-chat-no-such-mcp-server".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
        },
        response_timeout_secs: 5,
    });

    let err = access.connect().await.unwrap_err();
    assert_eq!(err.kind, ShimErrorKind::Unavailable);
    let err = access.operations().await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_queued_calls_each_get_their_own_budget() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));
    let catalog = OperationCatalog::new(access.operations().await.unwrap());

    // Three 0.7s calls run back to back on one pipe: the last finishes
    // about 2.1s after dispatch, well past a single 1s budget.
    let calls: Vec<ToolCall> = (1..=3)
        .map(|i| ToolCall {
            id: format!("c{}", i),
            name: "find".to_string(),
            arguments: json!({
                "database": "wfm_database",
                "collection": "ITMS_EMP_MASTER",
                "delay": 0.7
            }),
        })
        .collect();

    let dispatcher = ToolDispatcher::new(&access, &catalog, Duration::from_secs(1), 10_000);
    let records = dispatcher.dispatch_all(&calls).await.unwrap();

    assert_eq!(records.len(), 3);
    for record in &records {
        assert!(
            record.succeeded(),
            "{} failed: {:?}",
            record.call_id,
            record.result.error
        );
        assert_eq!(record.attempts, 1);
    }
    assert_eq!(
        records.iter().map(|r| r.call_id.as_str()).collect::<Vec<_>>(),
        vec!["c1", "c2", "c3"]
    );

    access.shutdown().await;
}

#[tokio::test]
async fn test_slow_call_times_out_and_connection_survives() {
    let dir = tempfile::tempdir().unwrap();
    let access = McpDataAccess::new(mock_config(&dir));

    let slow = json!({"database": "wfm_database", "collection": "ITMS_PAYROLL", "delay": 1.5});
    let err = access
        .execute("find", &slow, Duration::from_millis(500))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ShimErrorKind::Timeout);
    assert!(access.is_connected().await);

    // The late answer to the abandoned call is skipped by id
    let records = access
        .execute(
            "find",
            &json!({"database": "wfm_database", "collection": "ITMS_EMP_MASTER"}),
            BUDGET,
        )
        .await
        .unwrap();
    assert!(records.render(10_000).contains("ITMS_EMP_MASTER"));

    access.shutdown().await;
}
