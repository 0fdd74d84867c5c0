//! Tool Execution Results
//!
//! The outcome of dispatching one tool call, in the form that is both
//! recorded in the turn trace and fed back to the model.

use serde::{Deserialize, Serialize};
use wfm_chat_core::FailureKind;

use crate::error::ShimError;
use crate::records::Records;

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Rendered records (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Number of records returned (if successful)
    #[serde(default)]
    pub record_count: usize,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>, record_count: usize) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            failure_kind: None,
            record_count,
        }
    }

    /// Create a successful result from backend records
    pub fn from_records(records: &Records, max_chars: usize) -> Self {
        Self::ok(records.render(max_chars), records.len())
    }

    /// Create an error result
    pub fn err(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            failure_kind: Some(kind),
            record_count: 0,
        }
    }

    /// Create an error result from a backend error
    pub fn from_shim_error(error: &ShimError) -> Self {
        Self::err(error.failure_kind(), error.message.clone())
    }

    /// Convert to string for LLM consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!(
                "Error ({}): {}",
                self.failure_kind.unwrap_or(FailureKind::Execution),
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}
