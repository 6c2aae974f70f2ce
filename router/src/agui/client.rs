//! AG-UI upstream client: POST a RunAgentInput, stream back typed events.

use std::time::Duration;

use agui_event::{AguiEvent, ChatRequest, RunAgentInput};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::UpstreamError;
use crate::headers::ForwardHeaders;

use super::sse::{SseFrame, SseParser};

const SSE_DONE_SENTINEL: &str = "[DONE]";

/// HTTP client for AG-UI protocol agents. Cheap to clone; all clones share
/// the process-wide connection pool.
#[derive(Clone)]
pub struct AguiClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl AguiClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> AguiClient {
        AguiClient { http, timeout }
    }

    /// Sends the request to an AG-UI agent and forwards every parsed event
    /// into `tx`. Completes when the upstream stream ends; fails on HTTP
    /// error status, transport errors, deadline, or a closed `tx`.
    pub async fn send(
        &self,
        url: &str,
        request: &ChatRequest,
        headers: &ForwardHeaders,
        tx: mpsc::Sender<AguiEvent>,
    ) -> Result<(), UpstreamError> {
        let run_id = Uuid::new_v4().to_string();
        let input = RunAgentInput::from_request(request, run_id.clone());

        tracing::debug!(
            "sending AG-UI request to {} (thread_id={}, run_id={})",
            url,
            request.thread_id,
            run_id
        );

        let mut outbound = self
            .http
            .post(url)
            .json(&input)
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
            tracing::error!("AG-UI agent returned error: status={}, body={}", status, preview);
            return Err(UpstreamError::Http { status, preview });
        }

        let mut parser = SseParser::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(UpstreamError::from_reqwest)?;
            let text = String::from_utf8_lossy(&chunk);
            for frame in parser.feed(&text) {
                self.deliver(frame, &tx).await?;
            }
        }
        if let Some(frame) = parser.finish() {
            self.deliver(frame, &tx).await?;
        }
        Ok(())
    }

    async fn deliver(
        &self,
        frame: SseFrame,
        tx: &mpsc::Sender<AguiEvent>,
    ) -> Result<(), UpstreamError> {
        let Some(event) = parse_event(&frame) else { return Ok(()) };
        tx.send(event)
            .await
            .map_err(|_| UpstreamError::Transport("event channel closed".to_string()))
    }
}

/// Turns one SSE frame into a typed event. `[DONE]` sentinels and empty
/// frames are dropped; a missing `type` field is backfilled from the
/// `event:` header; frames with neither are dropped with a warning.
pub fn parse_event(frame: &SseFrame) -> Option<AguiEvent> {
    if frame.data.is_empty() || frame.data == SSE_DONE_SENTINEL {
        return None;
    }

    let parsed: Value = match serde_json::from_str(&frame.data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse SSE event JSON: {}", e);
            return None;
        }
    };
    let Value::Object(mut object) = parsed else {
        tracing::warn!("SSE event payload is not an object");
        return None;
    };

    let has_type = object.get("type").map(|t| t.is_string()).unwrap_or(false);
    if !has_type {
        match &frame.event {
            Some(event_type) => {
                object.insert("type".to_string(), Value::String(event_type.clone()));
            }
            None => {
                tracing::warn!("SSE event missing type field");
                return None;
            }
        }
    }

    let event = AguiEvent::from_value(Value::Object(object));
    if event.is_none() {
        tracing::warn!("failed to create AG-UI event from SSE frame");
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: Option<&str>, data: &str) -> SseFrame {
        SseFrame {
            event: event.map(String::from),
            data: data.to_string(),
        }
    }

    /// **Scenario**: a typed payload parses into its concrete variant.
    #[test]
    fn parses_typed_payload() {
        let event = parse_event(&frame(
            None,
            r#"{"type":"TEXT_MESSAGE_CONTENT","messageId":"m1","delta":"hi"}"#,
        ))
        .unwrap();
        assert_eq!(event.event_type(), "TEXT_MESSAGE_CONTENT");
    }

    /// **Scenario**: a missing type field is backfilled from the `event:`
    /// header; with neither, the frame is dropped.
    #[test]
    fn backfills_type_from_header() {
        let event = parse_event(&frame(
            Some("TEXT_MESSAGE_END"),
            r#"{"messageId":"m1"}"#,
        ))
        .unwrap();
        assert_eq!(event.event_type(), "TEXT_MESSAGE_END");

        assert!(parse_event(&frame(None, r#"{"messageId":"m1"}"#)).is_none());
    }

    /// **Scenario**: [DONE] sentinels, empty frames, and non-JSON payloads
    /// are dropped.
    #[test]
    fn drops_sentinels_and_garbage() {
        assert!(parse_event(&frame(None, "[DONE]")).is_none());
        assert!(parse_event(&frame(None, "")).is_none());
        assert!(parse_event(&frame(None, "not json")).is_none());
        assert!(parse_event(&frame(None, "42")).is_none());
    }

    /// **Scenario**: unknown event kinds come through as passthrough with
    /// their payload intact.
    #[test]
    fn passthrough_for_unknown_kinds() {
        let event = parse_event(&frame(
            None,
            r#"{"type":"STATE_DELTA","delta":[{"op":"add"}]}"#,
        ))
        .unwrap();
        assert_eq!(event.event_type(), "STATE_DELTA");
    }
}
