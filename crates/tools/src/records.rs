//! Query Records
//!
//! Structured values returned by a data-access operation and their
//! rendering into tool-result text for the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Records returned by one data-access operation.
///
/// Items are kept as raw JSON values. MCP servers return content blocks of
/// the form `{"type": "text", "text": "..."}`; other backends may return
/// documents directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Records {
    pub items: Vec<Value>,
}

impl Records {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render the records for the model, truncated to `max_chars`.
    ///
    /// Text blocks and bare strings are emitted as-is, anything else as
    /// pretty-printed JSON; items are separated by a newline.
    pub fn render(&self, max_chars: usize) -> String {
        if self.items.is_empty() {
            return "No records returned.".to_string();
        }

        let rendered = self
            .items
            .iter()
            .map(render_item)
            .collect::<Vec<_>>()
            .join("\n");

        truncate_chars(&rendered, max_chars)
    }
}

fn render_item(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match (obj.get("type").and_then(Value::as_str), obj.get("text")) {
            (Some("text"), Some(Value::String(text))) => text.clone(),
            _ => serde_json::to_string_pretty(item).unwrap_or_else(|_| item.to_string()),
        },
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Truncate to at most `max_chars` characters, appending a marker with the
/// number of characters dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!(
        "{}\n... [truncated: {} more characters]",
        kept,
        total - max_chars
    )
}
