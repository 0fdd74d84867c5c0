//! Conversation Loop Integration Tests
//!
//! Drives full turns against a scripted model and an in-memory backend:
//! - Exchange counting and the exchange bound
//! - Tool timeouts, validation failures and backend outages
//! - Model retry/backoff and cancellation

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wfm_chat::models::conversation::Conversation;
use wfm_chat::models::history::HistoryWindow;
use wfm_chat::{ConversationConfig, ConversationLoop, TurnError};
use wfm_chat_core::FailureKind;
use wfm_chat_llm::{LlmError, LlmProvider, Message, MessageContent, MessageRole};
use wfm_chat_tools::DataAccess;

use crate::support::{
    call, text_response, tool_response, Behavior, MockDataAccess, ScriptedProvider,
};

const NOTE: &str =
    "[Note: Reached maximum interaction limit of 10 exchanges. Response may be incomplete.]";

fn build(provider: &Arc<ScriptedProvider>, shim: &Arc<MockDataAccess>) -> ConversationLoop {
    build_with(provider, shim, ConversationConfig::default())
}

fn build_with(
    provider: &Arc<ScriptedProvider>,
    shim: &Arc<MockDataAccess>,
    config: ConversationConfig,
) -> ConversationLoop {
    let provider: Arc<dyn LlmProvider> = provider.clone();
    let shim: Arc<dyn DataAccess> = shim.clone();
    ConversationLoop::new(provider, shim, config)
}

fn conversation() -> Conversation {
    Conversation::new("test-conversation", HistoryWindow::new(20, 60_000), 10)
}

/// Tool-result blocks of a message as (call id, content, is_error)
fn tool_results(message: &Message) -> Vec<(String, String, bool)> {
    message
        .content
        .iter()
        .filter_map(|block| match block {
            MessageContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some((tool_use_id.clone(), content.clone(), is_error.unwrap_or(false))),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Basic flow
// ============================================================================

#[tokio::test]
async fn test_employee_lookup_takes_two_exchanges() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "employeeLookup", json!({"badge": 2114}))]),
        text_response("Badge 2114 belongs to Ada Moreno in Operations."),
    ]));
    let shim = Arc::new(MockDataAccess::new().on(
        "employeeLookup",
        Behavior::Records(vec![json!({
            "type": "text",
            "text": "{\"EMP_NAME\":\"Ada Moreno\",\"DEPT\":\"Operations\"}"
        })]),
    ));
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Who has badge 2114?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exchanges, 2);
    assert_eq!(report.tool_calls_used, 1);
    assert!(!report.degraded);
    assert_eq!(report.answer, "Badge 2114 belongs to Ada Moreno in Operations.");
    assert_eq!(provider.calls(), 2);

    // Second exchange carries the assistant tool call and its result
    let second = provider.request(1);
    assert_eq!(second.len(), 3);
    assert_eq!(second[1].role, MessageRole::Assistant);
    let results = tool_results(&second[2]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "c1");
    assert!(results[0].1.contains("Ada Moreno"));
    assert!(!results[0].2);

    assert_eq!(shim.executed(), vec![("employeeLookup".to_string(), json!({"badge": 2114}))]);
    assert_eq!(conv.turn_count(), 1);
    assert_eq!(conv.history().len(), 2);
}

#[tokio::test]
async fn test_no_tool_calls_is_a_single_exchange() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response(
        "I can answer questions about employees, schedules and payroll.",
    )]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "What can you do?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exchanges, 1);
    assert_eq!(report.tool_calls_used, 0);
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.tools_offered(0), 3);
    assert_eq!(shim.execute_count(), 0);
}

#[tokio::test]
async fn test_empty_message_makes_no_calls() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("unused")]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let err = chat
        .run_turn(&mut conv, "   \n", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, TurnError::EmptyMessage);
    assert_eq!(err.kind(), FailureKind::Validation);
    assert_eq!(provider.calls(), 0);
    assert_eq!(shim.execute_count(), 0);
    assert_eq!(conv.turn_count(), 0);
}

#[tokio::test]
async fn test_history_is_replayed_on_next_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_response("There are 42 active employees."),
        text_response("Of those, 12 work in Operations."),
    ]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();
    let cancel = CancellationToken::new();

    chat.run_turn(&mut conv, "How many active employees?", &cancel)
        .await
        .unwrap();
    chat.run_turn(&mut conv, "How many in Operations?", &cancel)
        .await
        .unwrap();

    let second_turn = provider.request(1);
    let texts: Vec<String> = second_turn.iter().map(|m| m.text_content()).collect();
    assert_eq!(
        texts,
        vec![
            "How many active employees?",
            "There are 42 active employees.",
            "How many in Operations?"
        ]
    );
    assert_eq!(conv.turn_count(), 2);
}

#[tokio::test]
async fn test_system_prompt_lists_operations() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("Hello.")]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    chat.run_turn(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap();

    let system = provider.system(0);
    assert!(system.contains("wfm_database"));
    assert!(system.contains("employeeLookup"));
    assert!(system.contains("payrollAnalyze"));
}

// ============================================================================
// Tool failures fed back to the model
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timeout_then_narrower_retry_succeeds() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            Some("Let me total the payroll hours."),
            vec![call("c1", "payrollAnalyze", json!({"from": "2024-01-01", "to": "2024-12-31"}))],
        ),
        tool_response(
            None,
            vec![call(
                "c2",
                "payrollAnalyze",
                json!({"from": "2024-12-01", "to": "2024-12-31", "department": "Operations"}),
            )],
        ),
        text_response("Operations logged 1,204 hours in December."),
    ]));
    let shim = Arc::new(
        MockDataAccess::new()
            .on_with(
                "payrollAnalyze",
                "department",
                Behavior::Records(vec![json!({"type": "text", "text": "TOTAL_HOURS: 1204"})]),
            )
            .on(
                "payrollAnalyze",
                Behavior::Slow(Duration::from_secs(60), vec![json!({"TOTAL_HOURS": 15000})]),
            ),
    );
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Payroll hours for Operations last year?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exchanges, 3);
    assert_eq!(report.tool_calls_used, 2);
    assert!(!report.degraded);
    assert_eq!(report.failed_calls().count(), 1);
    assert_eq!(report.tool_calls[0].result.failure_kind, Some(FailureKind::Timeout));
    assert!(report.tool_calls[1].succeeded());
    assert!(report.elapsed >= Duration::from_secs(20));

    let timeout_result = tool_results(&provider.request(1)[2]);
    assert!(timeout_result[0].2);
    assert!(timeout_result[0].1.contains("did not finish within 20 seconds"));

    let success_result = tool_results(&provider.request(2)[4]);
    assert_eq!(success_result[0].1, "TOTAL_HOURS: 1204");
}

#[tokio::test]
async fn test_unknown_operation_is_reported_as_validation_failure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "dropDatabase", json!({}))]),
        text_response("I can only read data."),
    ]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Delete everything", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(shim.execute_count(), 0);
    let record = &report.tool_calls[0];
    assert_eq!(record.result.failure_kind, Some(FailureKind::Validation));
    assert_eq!(record.attempts, 0);

    let results = tool_results(&provider.request(1)[2]);
    assert!(results[0].2);
    assert!(results[0].1.contains("Unknown operation 'dropDatabase'"));
}

#[tokio::test]
async fn test_missing_required_argument_is_rejected_before_dispatch() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "employeeLookup", json!({"name": "Ada"}))]),
        tool_response(None, vec![call("c2", "employeeLookup", json!({"badge": 2114}))]),
        text_response("Found her."),
    ]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Find Ada", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exchanges, 3);
    assert_eq!(shim.execute_count(), 1);
    assert_eq!(report.tool_calls[0].result.failure_kind, Some(FailureKind::Validation));
    assert!(report.tool_calls[0]
        .result
        .error
        .as_deref()
        .unwrap()
        .contains("badge"));
}

#[tokio::test]
async fn test_execution_error_is_fed_back() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "count", json!({"collection": "ITMS_NOPE"}))]),
        text_response("That collection does not exist."),
    ]));
    let shim = Arc::new(
        MockDataAccess::new().on("count", Behavior::Execution("ns not found".to_string())),
    );
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Count ITMS_NOPE", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.tool_calls[0].result.failure_kind, Some(FailureKind::Execution));
    let results = tool_results(&provider.request(1)[2]);
    assert_eq!(results[0].1, "Error (execution): ns not found");
}

#[tokio::test(start_paused = true)]
async fn test_calls_in_one_exchange_run_concurrently_in_order() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            None,
            vec![
                call("c1", "employeeLookup", json!({"badge": 1})),
                call("c2", "count", json!({"collection": "ITMS_EMP_MASTER"})),
            ],
        ),
        text_response("Done."),
    ]));
    let shim = Arc::new(
        MockDataAccess::new()
            .on(
                "employeeLookup",
                Behavior::Slow(Duration::from_secs(3), vec![json!("first")]),
            )
            .on(
                "count",
                Behavior::Slow(Duration::from_secs(3), vec![json!("second")]),
            ),
    );
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Both please", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.elapsed < Duration::from_secs(6));
    let ids: Vec<&str> = report.tool_calls.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);

    let results = tool_results(&provider.request(1)[2]);
    assert_eq!(results[0].1, "first");
    assert_eq!(results[1].1, "second");
}

// ============================================================================
// Backend outages
// ============================================================================

#[tokio::test]
async fn test_backend_unavailable_twice_fails_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "employeeLookup", json!({"badge": 2114}))]),
        text_response("unused"),
    ]));
    let shim = Arc::new(MockDataAccess::new().on("employeeLookup", Behavior::Unavailable));
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let err = chat
        .run_turn(&mut conv, "Who has badge 2114?", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Unavailable(_)));
    assert_eq!(err.kind(), FailureKind::Unavailable);
    assert_eq!(shim.execute_count(), 2);
    assert_eq!(provider.calls(), 1);
    assert_eq!(conv.turn_count(), 0);
    assert!(conv.history().is_empty());
}

#[tokio::test]
async fn test_backend_unavailable_once_is_retried() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "employeeLookup", json!({"badge": 2114}))]),
        text_response("Ada Moreno."),
    ]));
    let shim = Arc::new(
        MockDataAccess::new()
            .failing_executions(1)
            .on("employeeLookup", Behavior::Records(vec![json!("Ada Moreno")])),
    );
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Who has badge 2114?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(shim.execute_count(), 2);
    assert_eq!(report.tool_calls[0].attempts, 2);
    assert!(report.tool_calls[0].succeeded());
}

#[tokio::test]
async fn test_operation_listing_retried_once() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("Hello.")]));
    let shim = Arc::new(MockDataAccess::new().failing_listings(1));
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.exchanges, 1);

    let provider = Arc::new(ScriptedProvider::new(vec![text_response("unused")]));
    let shim = Arc::new(MockDataAccess::new().failing_listings(2));
    let chat = build(&provider, &shim);

    let err = chat
        .run_turn(&mut conv, "Hi again", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Unavailable(_)));
    assert_eq!(provider.calls(), 0);
    assert_eq!(conv.turn_count(), 1);
}

// ============================================================================
// Exchange bound
// ============================================================================

#[tokio::test]
async fn test_exchange_bound_yields_degraded_answer() {
    let responses = (1..=10)
        .map(|week| {
            let text = format!("Checked week {}.", week);
            tool_response(
                Some(text.as_str()),
                vec![call(
                    &format!("c{}", week),
                    "count",
                    json!({"collection": "ITMS_ATTENDANCE"}),
                )],
            )
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(responses));
    let shim = Arc::new(MockDataAccess::new().on("count", Behavior::Records(vec![json!(7)])));
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Attendance trend for the year", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.degraded);
    assert_eq!(report.failure_kind, Some(FailureKind::Exhausted));
    assert_eq!(report.exchanges, 10);
    assert_eq!(provider.calls(), 10);
    // The final exchange's call is never dispatched
    assert_eq!(shim.execute_count(), 9);
    assert_eq!(report.tool_calls_used, 9);
    assert!(report.answer.starts_with("Checked week 10."));
    assert!(report.answer.ends_with(NOTE));

    let turn = conv.last_turn().unwrap();
    assert!(turn.is_degraded());
    assert_eq!(turn.exchanges.last().unwrap().undispatched_calls, 1);
    assert_eq!(conv.history().messages()[1].text_content(), report.answer);
}

#[tokio::test]
async fn test_custom_exchange_bound() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "count", json!({"collection": "A"}))]),
        tool_response(None, vec![call("c2", "count", json!({"collection": "B"}))]),
    ]));
    let shim = Arc::new(MockDataAccess::new());
    let config = ConversationConfig {
        max_exchanges: 2,
        ..ConversationConfig::default()
    };
    let chat = build_with(&provider, &shim, config);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Count things", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.degraded);
    assert_eq!(report.exchanges, 2);
    assert!(report.answer.contains("limit of 2 exchanges"));
}

#[tokio::test]
async fn test_large_results_are_omitted_to_fit_context_window() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![
            tool_response(None, vec![call("c1", "count", json!({"collection": "ITMS_PAYROLL"}))]),
            tool_response(None, vec![call("c2", "count", json!({"collection": "ITMS_EMP"}))]),
            text_response("Both collections are large."),
        ])
        .with_context_window(10_000),
    );
    let shim = Arc::new(
        MockDataAccess::new().on("count", Behavior::Records(vec![json!("z".repeat(15_000))])),
    );
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "How big are payroll and employees?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exchanges, 3);
    assert!(!report.degraded);
    assert_eq!(report.failure_kind, None);

    // One result fits; the second request is sent as-is
    assert_eq!(tool_results(&provider.request(1)[2])[0].1.len(), 15_000);

    // Two do not: the older one is replaced, the newest is kept whole
    let last = provider.request(2);
    let older = tool_results(&last[2]);
    assert!(older[0].1.contains("omitted to fit the context window: 15000 characters"));
    assert_eq!(tool_results(&last[4])[0].1.len(), 15_000);
    let request_chars: usize = last.iter().map(Message::char_len).sum();
    assert!(request_chars + provider.system(2).len() <= 8_000 * 3);
}

// ============================================================================
// Model failures and cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transient_model_errors_are_retried_with_backoff() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(LlmError::ServerError {
            message: "internal error".to_string(),
            status: Some(500),
        }),
        Err(LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(2),
        }),
        text_response("Recovered."),
    ]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let report = chat
        .run_turn(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.answer, "Recovered.");
    assert_eq!(provider.calls(), 3);
    // 500ms backoff, then the 2s retry-after hint
    assert!(report.elapsed >= Duration::from_millis(2500));
    assert_eq!(report.exchanges, 1);
}

#[tokio::test(start_paused = true)]
async fn test_model_retries_exhausted_is_upstream_failure() {
    let errors = (0..4)
        .map(|_| {
            Err(LlmError::ProviderUnavailable {
                message: "overloaded".to_string(),
            })
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(errors));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let err = chat
        .run_turn(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Upstream(_)));
    assert_eq!(provider.calls(), 4);
    assert_eq!(conv.turn_count(), 0);
}

#[tokio::test]
async fn test_non_retryable_model_error_fails_immediately() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(LlmError::AuthenticationFailed {
        message: "invalid x-api-key".to_string(),
    })]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();

    let err = chat
        .run_turn(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Upstream);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("unused")]));
    let shim = Arc::new(MockDataAccess::new());
    let chat = build(&provider, &shim);
    let mut conv = conversation();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = chat.run_turn(&mut conv, "Hi", &cancel).await.unwrap_err();

    assert_eq!(err, TurnError::Cancelled);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_tool_call_leaves_conversation_unchanged() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(None, vec![call("c1", "employeeLookup", json!({"badge": 2114}))]),
        text_response("unused"),
    ]));
    let shim = Arc::new(MockDataAccess::new().on(
        "employeeLookup",
        Behavior::Slow(Duration::from_secs(15), vec![json!("Ada")]),
    ));
    let chat = build(&provider, &shim);
    let mut conv = conversation();
    let cancel = CancellationToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
    };
    let (result, _) = tokio::join!(
        chat.run_turn(&mut conv, "Who has badge 2114?", &cancel),
        canceller
    );

    assert_eq!(result.unwrap_err(), TurnError::Cancelled);
    assert_eq!(provider.calls(), 1);
    assert_eq!(conv.turn_count(), 0);
    assert!(conv.history().is_empty());
}
