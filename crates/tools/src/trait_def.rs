//! Data-Access Trait
//!
//! The seam between the conversation loop and the backend that executes
//! read-only queries. Implementations must not retry; the caller owns the
//! retry policy and picks the time budget for every call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ShimError;
use crate::records::Records;

/// An operation the backend can execute, as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name, used verbatim as the tool name
    pub name: String,
    /// Human-readable description shown to the model
    pub description: String,
    /// JSON Schema for the argument payload
    pub input_schema: Value,
}

impl OperationSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Read-only data access used by the conversation loop.
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Operations currently offered by the backend.
    ///
    /// Fails with an `Unavailable` error when the backend cannot be reached.
    async fn operations(&self) -> Result<Vec<OperationSpec>, ShimError>;

    /// Execute one operation with the given argument payload.
    ///
    /// `timeout` bounds the backend's own work on this call. Time spent
    /// waiting behind other calls for a shared connection does not count
    /// against it. Once it elapses the call fails with a `Timeout` error.
    async fn execute(
        &self,
        operation: &str,
        arguments: &Value,
        timeout: Duration,
    ) -> Result<Records, ShimError>;

    /// Whether the backend connection is currently established.
    async fn is_connected(&self) -> bool;
}
