//! Context Budget
//!
//! Keeps the messages of one model request inside the provider's context
//! window. Sizes are estimated from character counts.
//!
//! When a request is over budget, earlier tool results are replaced by a
//! short marker, oldest first. If that is not enough, replayed history pairs
//! are dropped, oldest first. The current question and the tool traffic of
//! the running turn are never removed, only shortened.

use wfm_chat_llm::{Message, MessageContent};

/// Characters assumed per token
const CHARS_PER_TOKEN: usize = 3;

/// Results at or below this size are left alone
const MIN_OMITTED_CHARS: usize = 200;

/// Character budget for the messages of one request.
pub fn message_budget(context_window: u32, max_output_tokens: u32, system_chars: usize) -> usize {
    (context_window.saturating_sub(max_output_tokens) as usize)
        .saturating_mul(CHARS_PER_TOKEN)
        .saturating_sub(system_chars)
}

/// What fitting a request changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitOutcome {
    /// Tool results replaced by the omission marker
    pub omitted_results: usize,
    /// History messages dropped from the front
    pub dropped_history: usize,
    /// Size of the request after fitting
    pub chars: usize,
}

impl FitOutcome {
    pub fn changed(&self) -> bool {
        self.omitted_results > 0 || self.dropped_history > 0
    }
}

fn omitted_marker(chars: usize) -> String {
    format!("[Earlier result omitted to fit the context window: {} characters]", chars)
}

fn total_chars(messages: &[Message]) -> usize {
    messages.iter().map(Message::char_len).sum()
}

/// Shrink `messages` until it fits `budget` characters.
///
/// `history_len` is the number of leading messages replayed from earlier
/// turns; it is reduced by the number of messages dropped. A request that
/// still does not fit after every reduction is left as small as possible.
pub fn fit_to_budget(
    messages: &mut Vec<Message>,
    history_len: &mut usize,
    budget: usize,
) -> FitOutcome {
    let mut outcome = FitOutcome {
        chars: total_chars(messages),
        ..FitOutcome::default()
    };

    'results: for message in messages.iter_mut() {
        for block in message.content.iter_mut() {
            if outcome.chars <= budget {
                break 'results;
            }
            let MessageContent::ToolResult { content, .. } = block else {
                continue;
            };
            let original = content.len();
            if original <= MIN_OMITTED_CHARS {
                continue;
            }
            *content = omitted_marker(original);
            outcome.chars = outcome.chars - original + content.len();
            outcome.omitted_results += 1;
        }
    }

    while outcome.chars > budget && *history_len >= 2 {
        let dropped: usize = messages.drain(0..2).map(|m| m.char_len()).sum();
        *history_len -= 2;
        outcome.chars -= dropped;
        outcome.dropped_history += 2;
    }

    outcome
}
