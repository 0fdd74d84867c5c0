//! Data-Access Errors
//!
//! Errors reported by a `DataAccess` implementation. The shim only
//! classifies; retry decisions belong to the conversation loop.

use thiserror::Error;
use wfm_chat_core::FailureKind;

/// How a data-access call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimErrorKind {
    /// Backend unreachable: spawn failure, broken pipe, HTTP send error, closed connection
    Unavailable,
    /// Backend refused the request shape (unknown method, invalid params)
    Rejected,
    /// Backend accepted the request but the operation failed
    Execution,
    /// The backend did not answer within the call's budget
    Timeout,
}

/// Error returned by a data-access operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ShimError {
    pub kind: ShimErrorKind,
    pub message: String,
}

impl ShimError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            kind: ShimErrorKind::Unavailable,
            message: msg.into(),
        }
    }

    /// Create a rejected error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self {
            kind: ShimErrorKind::Rejected,
            message: msg.into(),
        }
    }

    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self {
            kind: ShimErrorKind::Execution,
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self {
            kind: ShimErrorKind::Timeout,
            message: msg.into(),
        }
    }

    /// Loop-level classification of this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self.kind {
            ShimErrorKind::Unavailable => FailureKind::Unavailable,
            ShimErrorKind::Rejected => FailureKind::Validation,
            ShimErrorKind::Execution => FailureKind::Execution,
            ShimErrorKind::Timeout => FailureKind::Timeout,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ShimErrorKind::Unavailable
    }
}
