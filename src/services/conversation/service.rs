//! Conversation Loop Service
//!
//! One turn is an explicit state machine:
//!
//! ```text
//! AwaitingModel --tool calls--> DispatchingTools --results--> AwaitingModel
//!       |                                                        ...
//!       +--final text--> Final          bound reached --> Degraded
//! ```
//!
//! Before every model request the messages are fitted to the provider's
//! context window. Any error ends the turn as failed. The conversation is
//! only updated when the turn ends in `Final` or `Degraded`.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use wfm_chat_llm::{LlmProvider, LlmResponse, Message};
use wfm_chat_tools::{DataAccess, OperationCatalog, OperationSpec};

use super::budget::{fit_to_budget, message_budget};
use super::dispatch::{tool_results_message, ToolDispatcher};
use super::outcome::{TurnError, TurnReport};
use super::retry::send_with_retry;
use super::ConversationConfig;
use crate::models::conversation::{Conversation, Exchange, Turn, TurnStatus};
use crate::services::system_prompt::build_system_prompt;

/// Answer used when the model ends a turn without any text
const EMPTY_ANSWER: &str = "I wasn't able to produce an answer to that question.";

/// Base text of a degraded answer when the model never produced text
const DEGRADED_FALLBACK: &str = "I gathered some information but could not finish the analysis \
                                 within the allowed number of steps.";

enum LoopState {
    AwaitingModel,
    DispatchingTools(LlmResponse),
    Final(String),
    Degraded,
}

/// Append the incompleteness note to a degraded answer.
pub fn degraded_answer(partial: Option<&str>, max_exchanges: u32) -> String {
    format!(
        "{}\n\n[Note: Reached maximum interaction limit of {} exchanges. \
         Response may be incomplete.]",
        partial.unwrap_or(DEGRADED_FALLBACK),
        max_exchanges
    )
}

/// Runs turns against a model provider and a data-access backend.
pub struct ConversationLoop {
    provider: Arc<dyn LlmProvider>,
    shim: Arc<dyn DataAccess>,
    config: ConversationConfig,
}

impl ConversationLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        shim: Arc<dyn DataAccess>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            provider,
            shim,
            config,
        }
    }

    /// Answer one user message within `conversation`.
    ///
    /// On success the turn is committed to the conversation. On any error,
    /// including cancellation, the conversation is left untouched.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, TurnError> {
        let text = user_message.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let history = conversation.history().messages().to_vec();
        let span = tracing::info_span!("turn", conversation = %conversation.id());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            r = self.drive(history, text.to_string(), cancel).instrument(span.clone()) => r,
        };

        match outcome {
            Ok((turn, report)) => {
                let _enter = span.enter();
                tracing::info!(
                    exchanges = report.exchanges,
                    tool_calls = report.tool_calls_used,
                    degraded = report.degraded,
                    failure = report.failure_kind.map(|k| k.as_str()),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "turn finished"
                );
                conversation.record_turn(turn);
                Ok(report)
            }
            Err(e) => {
                let _enter = span.enter();
                let kind = e.kind();
                if kind.is_fatal() {
                    tracing::error!(%kind, error = %e, "turn failed");
                } else {
                    tracing::warn!(%kind, error = %e, "turn rejected");
                }
                Err(e)
            }
        }
    }

    async fn load_operations(&self) -> Result<Vec<OperationSpec>, TurnError> {
        match self.shim.operations().await {
            Ok(ops) => Ok(ops),
            Err(first) => {
                tracing::warn!(error = %first, "listing operations failed, retrying once");
                self.shim
                    .operations()
                    .await
                    .map_err(|e| TurnError::Unavailable(e.message))
            }
        }
    }

    async fn drive(
        &self,
        history: Vec<Message>,
        user_text: String,
        cancel: &CancellationToken,
    ) -> Result<(Turn, TurnReport), TurnError> {
        let started = Instant::now();
        let started_at = Utc::now();
        let max_exchanges = self.config.max_exchanges.max(1) as usize;

        let catalog = OperationCatalog::new(self.load_operations().await?);
        let tools = catalog.tool_definitions();
        let system = build_system_prompt(&self.config.database, &catalog.names(), started_at);
        let budget = message_budget(
            self.provider.context_window(),
            self.provider.config().max_tokens,
            system.len(),
        );
        let dispatcher = ToolDispatcher::new(
            self.shim.as_ref(),
            &catalog,
            self.config.tool_timeout,
            self.config.max_tool_result_chars,
        );

        let mut history_len = history.len();
        let mut messages = history;
        messages.push(Message::user(user_text.clone()));
        let mut exchanges: Vec<Exchange> = Vec::new();
        let mut last_text: Option<String> = None;
        let mut state = LoopState::AwaitingModel;

        let (answer, status) = loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let index = exchanges.len();
                    tracing::info!(
                        exchange = index + 1,
                        max = max_exchanges,
                        "requesting model response"
                    );

                    let fit = fit_to_budget(&mut messages, &mut history_len, budget);
                    if fit.changed() {
                        tracing::warn!(
                            omitted_results = fit.omitted_results,
                            dropped_history = fit.dropped_history,
                            chars = fit.chars,
                            budget,
                            "request trimmed to fit the context window"
                        );
                    }

                    let response = send_with_retry(
                        self.provider.as_ref(),
                        &self.config.retry,
                        &messages,
                        &system,
                        &tools,
                        cancel,
                    )
                    .await?;

                    if let Some(text) = response.text_content() {
                        last_text = Some(text.to_string());
                    }
                    exchanges.push(Exchange {
                        index,
                        request: messages.clone(),
                        response_text: response.content.clone(),
                        tool_calls: Vec::new(),
                        undispatched_calls: 0,
                        usage: response.usage.clone(),
                    });

                    if !response.has_tool_calls() {
                        let answer = response
                            .text_content()
                            .map(str::to_string)
                            .or_else(|| last_text.clone())
                            .unwrap_or_else(|| EMPTY_ANSWER.to_string());
                        LoopState::Final(answer)
                    } else if exchanges.len() >= max_exchanges {
                        if let Some(last) = exchanges.last_mut() {
                            last.undispatched_calls = response.tool_calls.len();
                        }
                        tracing::warn!(
                            max = max_exchanges,
                            pending_calls = response.tool_calls.len(),
                            "exchange bound reached without a final answer"
                        );
                        LoopState::Degraded
                    } else {
                        LoopState::DispatchingTools(response)
                    }
                }
                LoopState::DispatchingTools(response) => {
                    messages.push(Message::assistant_tool_calls(
                        response.content.as_deref(),
                        &response.tool_calls,
                    ));
                    let records = dispatcher.dispatch_all(&response.tool_calls).await?;
                    messages.push(tool_results_message(&records));
                    if let Some(last) = exchanges.last_mut() {
                        last.tool_calls = records;
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Final(answer) => break (answer, TurnStatus::Final),
                LoopState::Degraded => {
                    break (
                        degraded_answer(last_text.as_deref(), max_exchanges as u32),
                        TurnStatus::Degraded,
                    )
                }
            };
        };

        let tool_calls: Vec<_> = exchanges
            .iter()
            .flat_map(|e| e.tool_calls.iter().cloned())
            .collect();
        let elapsed = started.elapsed();

        let turn = Turn {
            user_text,
            exchanges,
            answer: answer.clone(),
            status,
            elapsed_ms: elapsed.as_millis() as u64,
            tool_call_count: tool_calls.len(),
            started_at,
        };
        let report = TurnReport {
            answer,
            degraded: status == TurnStatus::Degraded,
            failure_kind: status.failure_kind(),
            tool_calls_used: tool_calls.len(),
            exchanges: turn.exchanges.len(),
            usage: turn.usage(),
            tool_calls,
            elapsed,
        };
        Ok((turn, report))
    }
}
