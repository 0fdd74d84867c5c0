//! History Window
//!
//! The text-only transcript of earlier turns replayed into each new
//! exchange. Only the user question and the final answer of a turn are
//! kept; the intermediate tool traffic is not replayed.
//!
//! Truncation drops the oldest user/assistant pair first until both the
//! message and character limits hold. The most recent pair is always kept,
//! and the window always starts with a user message.

use serde::Serialize;
use wfm_chat_llm::Message;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryWindow {
    messages: Vec<Message>,
    max_messages: usize,
    max_chars: usize,
}

impl HistoryWindow {
    pub fn new(max_messages: usize, max_chars: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(2),
            max_chars,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total size of the window in characters.
    pub fn char_len(&self) -> usize {
        self.messages.iter().map(Message::char_len).sum()
    }

    /// Append a finished turn and re-apply the limits.
    pub fn push_pair(&mut self, user_text: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(answer));
        self.truncate();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn truncate(&mut self) {
        while self.messages.len() > 2
            && (self.messages.len() > self.max_messages || self.char_len() > self.max_chars)
        {
            self.messages.drain(0..2);
        }
    }
}
