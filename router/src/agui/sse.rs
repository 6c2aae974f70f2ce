//! Incremental SSE parser for upstream agent responses.
//!
//! Pure: feed it body chunks, get complete frames back. `event:` lines set
//! the pending type, `data:` lines accumulate (joined by `\n`), a blank
//! line flushes, `:` comments and unknown fields are ignored.

/// One flushed SSE frame: the `event:` header (if any) and the joined data.
#[derive(Clone, Debug, PartialEq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental line-oriented SSE parser. Handles frames split across
/// arbitrary chunk boundaries.
#[derive(Default)]
pub struct SseParser {
    buffer: String,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> SseParser {
        SseParser::default()
    }

    /// Feeds one body chunk; returns every frame completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(frame) = self.process_line(line.trim()) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes any trailing frame once the stream ends (agents that omit
    /// the final blank line).
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            if let Some(frame) = self.process_line(line.trim()) {
                return Some(frame);
            }
        }
        self.flush()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.flush();
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        } else if line.starts_with(':') {
            // comment
        }
        None
    }

    fn flush(&mut self) -> Option<SseFrame> {
        if self.data_lines.is_empty() {
            self.event_type = None;
            return None;
        }
        let frame = SseFrame {
            event: self.event_type.take(),
            data: self.data_lines.join("\n"),
        };
        self.data_lines.clear();
        Some(frame)
    }
}
