//! Operation Catalog
//!
//! The set of operations offered to the model during a turn. Built from a
//! `DataAccess` backend's advertised operations with schemas sanitized,
//! and used to reject malformed tool calls before they reach the backend.

use std::collections::HashSet;

use serde_json::Value;
use wfm_chat_llm::ToolDefinition;

use crate::schema::{sanitize_schema, validate_arguments};
use crate::trait_def::OperationSpec;

/// Operation names from `mongodb-mcp-server` that never write.
pub const READ_ONLY_OPERATIONS: &[&str] = &[
    "find",
    "aggregate",
    "count",
    "list-collections",
    "list-databases",
    "collection-schema",
    "collection-indexes",
    "collection-storage-size",
    "db-stats",
    "explain",
];

/// Whether an operation name is on the read-only allow-list.
pub fn is_read_only_operation(name: &str) -> bool {
    READ_ONLY_OPERATIONS.contains(&name)
}

/// Operations available during a turn.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: Vec<OperationSpec>,
}

impl OperationCatalog {
    /// Build a catalog, sanitizing schemas and keeping the first
    /// occurrence of each operation name.
    pub fn new(operations: Vec<OperationSpec>) -> Self {
        let mut seen = HashSet::new();
        let operations = operations
            .into_iter()
            .filter(|op| {
                let first = seen.insert(op.name.clone());
                if !first {
                    tracing::warn!(operation = %op.name, "duplicate operation ignored");
                }
                first
            })
            .map(|mut op| {
                sanitize_schema(&mut op.input_schema);
                if !op.input_schema.is_object() {
                    op.input_schema = serde_json::json!({"type": "object", "properties": {}});
                }
                op
            })
            .collect();
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    /// Tool definitions sent to the model, in catalog order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.operations
            .iter()
            .map(|op| ToolDefinition {
                name: op.name.clone(),
                description: op.description.clone(),
                input_schema: op.input_schema.clone(),
            })
            .collect()
    }

    /// Check a tool call against the catalog.
    ///
    /// Fails when the operation is not offered or the arguments do not fit
    /// its schema. The message is written for the model to act on.
    pub fn validate_call(&self, name: &str, arguments: &Value) -> Result<(), String> {
        let Some(op) = self.get(name) else {
            return Err(format!(
                "Unknown operation '{}'. Available operations: {}",
                name,
                self.names().join(", ")
            ));
        };
        validate_arguments(&op.input_schema, arguments)
            .map_err(|e| format!("Invalid arguments for '{}': {}", name, e))
    }
}
