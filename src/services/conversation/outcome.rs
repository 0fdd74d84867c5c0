//! Turn Outcomes
//!
//! What a finished turn reports to its caller, and the failures that end a
//! turn without an answer.

use std::time::Duration;

use thiserror::Error;
use wfm_chat_core::FailureKind;
use wfm_chat_llm::{LlmError, UsageStats};

use crate::models::conversation::ToolCallRecord;

/// Result of a turn that produced an answer.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub answer: String,
    /// The exchange bound was reached before a final answer
    pub degraded: bool,
    /// `Exhausted` for a degraded turn
    pub failure_kind: Option<FailureKind>,
    /// Tool calls dispatched during the turn
    pub tool_calls_used: usize,
    pub exchanges: usize,
    /// Every dispatched call with its outcome, in dispatch order
    pub tool_calls: Vec<ToolCallRecord>,
    pub elapsed: Duration,
    pub usage: UsageStats,
}

impl TurnReport {
    /// Calls that ended in a failure fed back to the model
    pub fn failed_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls.iter().filter(|r| !r.succeeded())
    }
}

/// A turn that ended without an answer. The conversation is left as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("The workforce database is unavailable: {0}")]
    Unavailable(String),

    #[error("The language model service failed: {0}")]
    Upstream(LlmError),

    #[error("turn cancelled")]
    Cancelled,
}

impl TurnError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TurnError::EmptyMessage => FailureKind::Validation,
            TurnError::Unavailable(_) => FailureKind::Unavailable,
            TurnError::Upstream(_) => FailureKind::Upstream,
            TurnError::Cancelled => FailureKind::Cancelled,
        }
    }
}
