//! Stream buffer: passthrough capture of TEXT_MESSAGE_* events so the
//! completed message can be audit-logged at stream end.

use agui_event::AguiEvent;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One captured event in a streaming message.
#[derive(Clone, Debug)]
pub struct StreamFrame {
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub sequence_num: u64,
}

/// A complete message reassembled from stream frames.
#[derive(Clone, Debug, Default)]
pub struct BufferedMessage {
    pub message_id: String,
    pub thread_id: String,
    pub run_id: String,
    pub frames: Vec<StreamFrame>,
    /// True once TEXT_MESSAGE_END (or RUN_ERROR) was seen.
    pub complete: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    /// Content accumulated from deltas, capped by the buffer's byte limit.
    pub accumulated_content: String,
}

impl BufferedMessage {
    /// Milliseconds from first to last frame, when both are known.
    pub fn duration_ms(&self) -> Option<f64> {
        let start = self.start_time?;
        let end = self.completion_time?;
        Some((end - start).num_microseconds().unwrap_or(0) as f64 / 1000.0)
    }
}

/// Accumulates streaming message events without delaying them.
///
/// The pipeline records every outbound event here right before framing it
/// onto the wire; at stream end the buffered message feeds the
/// `message_complete` audit record.
pub struct StreamBuffer {
    thread_id: String,
    run_id: String,
    request_id: String,
    max_content_size: usize,
    message: Option<BufferedMessage>,
    sequence_num: u64,
    content_size: usize,
}

impl StreamBuffer {
    pub fn new(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        request_id: impl Into<String>,
        max_content_size: usize,
    ) -> StreamBuffer {
        StreamBuffer {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            request_id: request_id.into(),
            max_content_size,
            message: None,
            sequence_num: 0,
            content_size: 0,
        }
    }

    /// The buffered message so far, if any TEXT_MESSAGE_* event arrived.
    pub fn message(&self) -> Option<&BufferedMessage> {
        self.message.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.message.as_ref().map(|m| m.complete).unwrap_or(false)
    }

    /// Records one outbound event. Passthrough-style: the caller forwards
    /// the event unchanged regardless of what happens here.
    pub fn record(&mut self, event: &AguiEvent) {
        let frame = StreamFrame {
            event_type: event.event_type().to_string(),
            data: serde_json::to_value(event).unwrap_or(Value::Null),
            timestamp: Utc::now(),
            sequence_num: self.sequence_num,
        };
        self.sequence_num += 1;

        match event {
            AguiEvent::TextMessageStart(start) => {
                self.message = Some(BufferedMessage {
                    message_id: start.message_id.clone(),
                    thread_id: self.thread_id.clone(),
                    run_id: self.run_id.clone(),
                    frames: vec![frame],
                    start_time: Some(Utc::now()),
                    ..Default::default()
                });
                self.content_size = 0;
                tracing::debug!(
                    "message started (request_id={}, message_id={})",
                    self.request_id,
                    start.message_id
                );
            }
            AguiEvent::TextMessageContent(content) => {
                let message = self.message.get_or_insert_with(|| BufferedMessage {
                    message_id: content.message_id.clone(),
                    thread_id: self.thread_id.clone(),
                    run_id: self.run_id.clone(),
                    start_time: Some(Utc::now()),
                    ..Default::default()
                });
                message.frames.push(frame);
                if self.content_size < self.max_content_size {
                    let remaining = self.max_content_size - self.content_size;
                    let taken: String = content.delta.chars().take(remaining).collect();
                    self.content_size += taken.chars().count();
                    message.accumulated_content.push_str(&taken);
                    if content.delta.chars().count() > remaining {
                        tracing::warn!(
                            "content truncated at max size (request_id={}, max={})",
                            self.request_id,
                            self.max_content_size
                        );
                    }
                }
            }
            AguiEvent::TextMessageEnd(_) => {
                if let Some(message) = &mut self.message {
                    message.frames.push(frame);
                    message.complete = true;
                    message.completion_time = Some(Utc::now());
                    tracing::debug!(
                        "message complete (request_id={}, message_id={}, content_length={})",
                        self.request_id,
                        message.message_id,
                        message.accumulated_content.len()
                    );
                }
            }
            AguiEvent::RunError(error) => {
                if let Some(message) = &mut self.message {
                    message.frames.push(frame);
                    message.complete = true;
                    message.completion_time = Some(Utc::now());
                }
                tracing::debug!(
                    "stream error (request_id={}, error={})",
                    self.request_id,
                    error.message.chars().take(100).collect::<String>()
                );
            }
            _ => {}
        }
    }
}
