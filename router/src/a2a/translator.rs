//! A2A → AG-UI stream translator.
//!
//! A feed/finish state machine: `start()` opens the run, `next()` maps one
//! incoming frame to zero or more AG-UI events, `finish()` closes the
//! message and the run. One assistant message id spans the whole stream.
//!
//! A2A agents frequently re-send the complete reply as a final `Task`
//! history entry after delta-streaming it via status updates; the
//! duplicate-suppression heuristic keeps the client from seeing the reply
//! twice.

use agui_event::{
    AguiEvent, RunFinished, RunStarted, TextMessageContent, TextMessageEnd, TextMessageStart,
};
use serde_json::Map;
use uuid::Uuid;

use super::types::A2aFrame;

/// Minimum accumulated length before the fuzzy length-ratio duplicate check
/// applies.
const FUZZY_DUPLICATE_MIN_LEN: usize = 50;

/// Translates one A2A response stream into AG-UI events.
pub struct A2aTranslator {
    thread_id: String,
    run_id: String,
    display_name: Option<String>,
    message_id: String,
    message_started: bool,
    accumulated: String,
}

impl A2aTranslator {
    pub fn new(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        display_name: Option<String>,
    ) -> A2aTranslator {
        A2aTranslator {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            display_name,
            message_id: Uuid::new_v4().to_string(),
            message_started: false,
            accumulated: String::new(),
        }
    }

    /// Opens the stream: RUN_STARTED, carrying `displayName` when the
    /// serving agent is known.
    pub fn start(&mut self) -> AguiEvent {
        AguiEvent::RunStarted(RunStarted {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            display_name: self.display_name.clone(),
            extra: Map::new(),
        })
    }

    /// Maps one incoming frame to its AG-UI events. Frames without text
    /// leave the state machine unchanged; `Task` frames go through
    /// duplicate suppression first.
    pub fn next(&mut self, frame: &A2aFrame) -> Vec<AguiEvent> {
        let mut out = Vec::new();
        let Some(text) = frame.text() else { return out };
        if text.is_empty() {
            return out;
        }
        if matches!(frame, A2aFrame::Task(_)) && self.is_duplicate(text) {
            tracing::debug!("suppressing duplicate final task content ({} chars)", text.len());
            return out;
        }
        self.emit_text(text, &mut out);
        out
    }

    /// Closes the stream: TEXT_MESSAGE_END iff a message was opened, then
    /// RUN_FINISHED.
    pub fn finish(&mut self) -> Vec<AguiEvent> {
        let mut out = Vec::new();
        if self.message_started {
            out.push(AguiEvent::TextMessageEnd(TextMessageEnd {
                message_id: self.message_id.clone(),
                extra: Map::new(),
            }));
            self.message_started = false;
        }
        out.push(AguiEvent::RunFinished(RunFinished {
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
            extra: Map::new(),
        }));
        out
    }

    /// Emits START (once) and the new content for `text`.
    ///
    /// Delta vs cumulative: when `text` extends what we have already
    /// emitted, only the suffix goes out; otherwise `text` is an
    /// independent delta and is emitted whole.
    fn emit_text(&mut self, text: &str, out: &mut Vec<AguiEvent>) {
        if !self.message_started {
            out.push(AguiEvent::TextMessageStart(TextMessageStart {
                message_id: self.message_id.clone(),
                role: "assistant".to_string(),
                extra: Map::new(),
            }));
            self.message_started = true;
        }

        let delta = if text.starts_with(&self.accumulated) {
            let delta = text[self.accumulated.len()..].to_string();
            self.accumulated = text.to_string();
            delta
        } else {
            self.accumulated.push_str(text);
            text.to_string()
        };

        if !delta.is_empty() {
            out.push(AguiEvent::TextMessageContent(TextMessageContent {
                message_id: self.message_id.clone(),
                delta,
                extra: Map::new(),
            }));
        }
    }

    /// Duplicate detection for final `Task` payloads, in order:
    ///
    /// 1. nothing accumulated → new content;
    /// 2. exact equality → duplicate;
    /// 3. substring of accumulated → duplicate;
    /// 4. accumulated is a prefix of `text` → append, not duplicate;
    /// 5. whitespace-normalized equality → duplicate;
    /// 6. near-equal length (±10%) with >80% matching leading characters →
    ///    duplicate (reformatted re-send);
    /// 7. otherwise new content.
    fn is_duplicate(&self, text: &str) -> bool {
        let accumulated = &self.accumulated;
        if accumulated.is_empty() {
            return false;
        }
        if text == accumulated {
            return true;
        }
        if accumulated.contains(text) {
            return true;
        }
        if text.starts_with(accumulated.as_str()) {
            return false;
        }

        let text_normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let accumulated_normalized = accumulated.split_whitespace().collect::<Vec<_>>().join(" ");
        if text_normalized == accumulated_normalized {
            return true;
        }

        let accumulated_len = accumulated.chars().count();
        if accumulated_len > FUZZY_DUPLICATE_MIN_LEN {
            let text_len = text.chars().count();
            let ratio = text_len as f64 / accumulated_len as f64;
            if (0.9..=1.1).contains(&ratio) {
                let common_prefix = text
                    .chars()
                    .zip(accumulated.chars())
                    .take_while(|(a, b)| a == b)
                    .count();
                if common_prefix as f64 > accumulated_len as f64 * 0.8 {
                    return true;
                }
            }
        }
        false
    }
}
