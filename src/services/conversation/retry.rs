//! Model Call Retry
//!
//! Exponential backoff around a single model request. Only errors the
//! provider marks retryable are retried; a `retry-after` hint extends the
//! wait but never shortens it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wfm_chat_llm::{LlmProvider, LlmResponse, Message, ToolDefinition};

use super::outcome::TurnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1` (zero-based `attempt`).
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        retry_after_secs.map_or(delay, |r| delay.max(Duration::from_secs(r)))
    }
}

/// Send one model request, retrying transient failures.
///
/// Returns `Upstream` once retries are exhausted or on a non-retryable
/// error, and `Cancelled` if the token fires while waiting.
pub async fn send_with_retry(
    provider: &dyn LlmProvider,
    policy: &RetryPolicy,
    messages: &[Message],
    system: &str,
    tools: &[ToolDefinition],
    cancel: &CancellationToken,
) -> Result<LlmResponse, TurnError> {
    let mut attempt = 0;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            r = provider.send_message(
                messages.to_vec(),
                Some(system.to_string()),
                tools.to_vec(),
            ) => r,
        };

        match result {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let wait = policy.delay_for(attempt, e.retry_after_secs());
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "model call failed, retrying"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempts = attempt + 1, "model call failed");
                return Err(TurnError::Upstream(e));
            }
        }
    }
}
