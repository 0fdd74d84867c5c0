//! Conversation Models
//!
//! Conversation state owned by one chat session: the history window
//! replayed to the model and the retained traces of finished turns.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use wfm_chat_core::FailureKind;
use wfm_chat_llm::{Message, UsageStats};
use wfm_chat_tools::{Records, ToolResult};

use super::history::HistoryWindow;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The model produced a final answer
    Final,
    /// The exchange bound was reached first
    Degraded,
}

impl TurnStatus {
    /// Failure recorded against a turn that still produced an answer.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TurnStatus::Final => None,
            TurnStatus::Degraded => Some(FailureKind::Exhausted),
        }
    }
}

/// One dispatched tool call and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Model-assigned call id
    pub call_id: String,
    pub operation: String,
    pub arguments: Value,
    pub result: ToolResult,
    /// Raw records on success
    #[serde(skip)]
    pub records: Option<Records>,
    /// Backend attempts made (0 when rejected before dispatch)
    pub attempts: u32,
    pub elapsed_ms: u64,
}

impl ToolCallRecord {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

/// One model request/response pair within a turn.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    /// Zero-based position within the turn
    pub index: usize,
    /// Messages sent to the model
    #[serde(skip)]
    pub request: Vec<Message>,
    /// Text returned by the model, if any
    pub response_text: Option<String>,
    /// Tool calls requested by the model and dispatched
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tool calls requested but not dispatched because the bound was reached
    pub undispatched_calls: usize,
    pub usage: UsageStats,
}

/// One user message and the exchanges that resolved it.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub user_text: String,
    pub exchanges: Vec<Exchange>,
    pub answer: String,
    pub status: TurnStatus,
    pub elapsed_ms: u64,
    pub tool_call_count: usize,
    pub started_at: DateTime<Utc>,
}

impl Turn {
    pub fn is_degraded(&self) -> bool {
        self.status == TurnStatus::Degraded
    }

    /// Tool calls across all exchanges, in dispatch order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.exchanges.iter().flat_map(|e| e.tool_calls.iter())
    }

    pub fn usage(&self) -> UsageStats {
        let mut total = UsageStats::default();
        for exchange in &self.exchanges {
            total.accumulate(&exchange.usage);
        }
        total
    }
}

/// Conversation state for one session.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    history: HistoryWindow,
    turns: VecDeque<Turn>,
    max_retained_turns: usize,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, history: HistoryWindow, max_retained_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history,
            turns: VecDeque::new(),
            max_retained_turns: max_retained_turns.max(1),
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.back()
    }

    /// Retained turn traces.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Commit a finished turn: extend the history window and keep its trace.
    pub fn record_turn(&mut self, turn: Turn) {
        self.history
            .push_pair(turn.user_text.clone(), turn.answer.clone());
        self.turns.push_back(turn);
        while self.turns.len() > self.max_retained_turns {
            self.turns.pop_front();
        }
        self.touch();
    }
}
