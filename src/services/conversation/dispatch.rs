//! Tool Dispatch
//!
//! Runs the tool calls of one exchange against the data-access backend.
//! Calls run concurrently; results come back in the model's call order.
//!
//! Per call: validate against the catalog, then execute with the per-call
//! timeout. Recoverable failures become error results for the model. An
//! unavailable backend gets one immediate retry; if that fails too the whole
//! dispatch fails and the turn ends.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;
use wfm_chat_core::FailureKind;
use wfm_chat_llm::{Message, ToolCall};
use wfm_chat_tools::{DataAccess, OperationCatalog, Records, ShimError, ToolResult};

use super::outcome::TurnError;
use crate::models::conversation::ToolCallRecord;

/// Backend attempts per call when the backend is unreachable
const MAX_ATTEMPTS: u32 = 2;

pub struct ToolDispatcher<'a> {
    shim: &'a dyn DataAccess,
    catalog: &'a OperationCatalog,
    timeout: Duration,
    max_result_chars: usize,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(
        shim: &'a dyn DataAccess,
        catalog: &'a OperationCatalog,
        timeout: Duration,
        max_result_chars: usize,
    ) -> Self {
        Self {
            shim,
            catalog,
            timeout,
            max_result_chars,
        }
    }

    /// Dispatch every call of an exchange and wait for all of them.
    pub async fn dispatch_all(
        &self,
        calls: &[ToolCall],
    ) -> Result<Vec<ToolCallRecord>, TurnError> {
        // Calls may queue behind each other on one backend connection; the
        // backend enforces each call's own budget once it starts running.
        let backstop = self.timeout.saturating_mul(calls.len() as u32 + 1);
        let outcomes = join_all(calls.iter().map(|call| self.dispatch_one(call, backstop))).await;
        outcomes.into_iter().collect()
    }

    async fn dispatch_one(
        &self,
        call: &ToolCall,
        backstop: Duration,
    ) -> Result<ToolCallRecord, TurnError> {
        let started = Instant::now();
        let record = |result: ToolResult, records: Option<Records>, attempts: u32| ToolCallRecord {
            call_id: call.id.clone(),
            operation: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            records,
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if let Err(message) = self.catalog.validate_call(&call.name, &call.arguments) {
            tracing::debug!(operation = %call.name, %message, "tool call rejected");
            return Ok(record(
                ToolResult::err(FailureKind::Validation, message),
                None,
                0,
            ));
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::debug!(
                operation = %call.name,
                call_id = %call.id,
                attempts,
                "dispatching tool call"
            );

            let execution = self.shim.execute(&call.name, &call.arguments, self.timeout);
            let error = match tokio::time::timeout(backstop, execution).await {
                Ok(Ok(records)) => {
                    let result = ToolResult::from_records(&records, self.max_result_chars);
                    return Ok(record(result, Some(records), attempts));
                }
                Ok(Err(e)) => e,
                Err(_) => ShimError::timeout(format!("no answer after {}ms", backstop.as_millis())),
            };

            let kind = error.failure_kind();
            if kind == FailureKind::Timeout {
                tracing::warn!(
                    operation = %call.name,
                    timeout_secs = self.timeout.as_secs(),
                    error = %error,
                    "tool call timed out"
                );
                return Ok(record(
                    ToolResult::err(FailureKind::Timeout, self.timeout_message(&call.name)),
                    None,
                    attempts,
                ));
            }
            if kind.is_recoverable() {
                tracing::debug!(operation = %call.name, error = %error, "tool call failed");
                return Ok(record(ToolResult::from_shim_error(&error), None, attempts));
            }
            if attempts < MAX_ATTEMPTS {
                tracing::warn!(
                    operation = %call.name,
                    error = %error,
                    "data access unavailable, retrying once"
                );
                continue;
            }
            tracing::error!(
                operation = %call.name,
                error = %error,
                "data access unavailable after retry"
            );
            return Err(TurnError::Unavailable(error.message));
        }
    }

    fn timeout_message(&self, operation: &str) -> String {
        format!(
            "Operation '{}' did not finish within {} seconds. Try narrower arguments \
             (fewer documents, a tighter date range, or a limit).",
            operation,
            self.timeout.as_secs()
        )
    }
}

/// The user message carrying one exchange's results, tagged by call id.
pub fn tool_results_message(records: &[ToolCallRecord]) -> Message {
    Message::tool_results(
        records
            .iter()
            .map(|r| (r.call_id.clone(), r.result.to_content(), !r.result.success))
            .collect(),
    )
}
