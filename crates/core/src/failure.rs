//! Failure Taxonomy
//!
//! Every failure the conversation loop can observe is classified into one of
//! these kinds. The loop branches on the kind, never on error strings.

use serde::{Deserialize, Serialize};

/// Classification of a failure inside a turn.
///
/// Only `Unavailable`, `Upstream` and `Cancelled` ever end a turn with an error.
/// `Exhausted` ends it with a degraded answer; the remaining kinds are reported
/// back to the model as tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed tool-call arguments or an operation outside the catalog
    Validation,
    /// A tool call exceeded its time budget
    Timeout,
    /// The data-access backend could not be reached
    Unavailable,
    /// The exchange bound was reached without a final answer
    Exhausted,
    /// The model-inference service failed
    Upstream,
    /// The backend rejected a well-formed operation (bad pipeline, server error)
    Execution,
    /// The turn was abandoned by its caller
    Cancelled,
}

impl FailureKind {
    /// Stable lowercase identifier used in logs and HTTP error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Timeout => "timeout",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Exhausted => "exhausted",
            FailureKind::Upstream => "upstream",
            FailureKind::Execution => "execution",
            FailureKind::Cancelled => "cancelled",
        }
    }

    /// Whether a failure of this kind is fed back to the model as data
    /// instead of ending the turn.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FailureKind::Validation | FailureKind::Timeout | FailureKind::Execution
        )
    }

    /// Whether this kind terminates the turn with an error visible to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FailureKind::Unavailable | FailureKind::Upstream | FailureKind::Cancelled
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
