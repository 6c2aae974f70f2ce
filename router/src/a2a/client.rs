//! A2A streaming client: JSON-RPC `message/stream` over SSE.

use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agui::SseParser;
use crate::error::UpstreamError;
use crate::headers::ForwardHeaders;

use super::types::A2aFrame;

/// JSON-RPC response envelope wrapping each streamed frame.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// HTTP client for A2A protocol agents. Cheap to clone; all clones share
/// the process-wide connection pool.
#[derive(Clone)]
pub struct A2aClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl A2aClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> A2aClient {
        A2aClient { http, timeout }
    }

    /// Opens a streaming `message/stream` call: a single user text part
    /// under the given context id, non-blocking, accepting text output.
    ///
    /// The POST and status check happen here, before any event reaches the
    /// client, so connect failures stay retryable.
    pub async fn connect(
        &self,
        url: &str,
        content: &str,
        context_id: &str,
        headers: &ForwardHeaders,
    ) -> Result<A2aStream, UpstreamError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": "message/stream",
            "params": {
                "message": {
                    "messageId": Uuid::new_v4().to_string(),
                    "contextId": context_id,
                    "role": "user",
                    "parts": [{"kind": "text", "text": content}],
                },
                "configuration": {
                    "blocking": false,
                    "acceptedOutputModes": ["text", "text/plain"],
                },
            },
        });

        tracing::debug!("sending A2A streaming request to {} (context_id={})", url, context_id);

        let mut outbound = self
            .http
            .post(url)
            .json(&payload)
            .header(ACCEPT, "text/event-stream")
            .header("X-Request-ID", headers.request_id.as_str())
            .timeout(self.timeout);
        if let Some(authorization) = &headers.authorization {
            outbound = outbound.header(AUTHORIZATION, authorization.as_str());
        }

        let response = outbound.send().await.map_err(UpstreamError::from_reqwest)?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            tracing::error!("A2A agent returned error: status={}, body={}", status, preview);
            return Err(UpstreamError::Http { status, preview });
        }

        Ok(A2aStream {
            body: response.bytes_stream().boxed(),
            parser: SseParser::new(),
            pending: Vec::new(),
            done: false,
        })
    }
}

/// A live A2A response stream, pulled one frame at a time.
pub struct A2aStream {
    body: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    parser: SseParser,
    pending: Vec<A2aFrame>,
    done: bool,
}

impl A2aStream {
    /// The next frame, `Ok(None)` at end of stream, or a transport error.
    pub async fn next_frame(&mut self) -> Result<Option<A2aFrame>, UpstreamError> {
        loop {
            if !self.pending.is_empty() {
                return Ok(Some(self.pending.remove(0)));
            }
            if self.done {
                return Ok(None);
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    let text = String::from_utf8_lossy(&chunk);
                    for frame in self.parser.feed(&text) {
                        if let Some(parsed) = decode_frame(&frame.data) {
                            self.pending.push(parsed);
                        }
                    }
                }
                Some(Err(e)) => return Err(UpstreamError::from_reqwest(e)),
                None => {
                    self.done = true;
                    if let Some(frame) = self.parser.finish() {
                        if let Some(parsed) = decode_frame(&frame.data) {
                            self.pending.push(parsed);
                        }
                    }
                }
            }
        }
    }
}

/// Decodes one SSE data payload into a frame: JSON-RPC envelope, then the
/// `kind`-tagged result. Error envelopes and garbage are skipped with a
/// warning.
fn decode_frame(data: &str) -> Option<A2aFrame> {
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let envelope: JsonRpcResponse = match serde_json::from_str(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("failed to parse A2A response JSON: {}", e);
            return None;
        }
    };
    if let Some(error) = envelope.error {
        tracing::warn!("A2A agent returned JSON-RPC error: {}", error);
        return None;
    }
    let result = envelope.result?;
    let frame = A2aFrame::from_result(result);
    if frame.is_none() {
        tracing::warn!("unexpected A2A response frame shape");
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a JSON-RPC success envelope decodes into its frame.
    #[test]
    fn decodes_success_envelope() {
        let data = r#"{"jsonrpc":"2.0","id":"1","result":{"kind":"status-update","final":false,"status":{"state":"working"}}}"#;
        let frame = decode_frame(data).unwrap();
        assert!(matches!(frame, A2aFrame::StatusUpdate(_)));
    }

    /// **Scenario**: error envelopes, sentinels, and garbage are skipped.
    #[test]
    fn skips_errors_and_garbage() {
        assert!(decode_frame(r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32000}}"#).is_none());
        assert!(decode_frame("[DONE]").is_none());
        assert!(decode_frame("").is_none());
        assert!(decode_frame("not json").is_none());
    }
}
