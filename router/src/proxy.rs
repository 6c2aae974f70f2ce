//! Streaming agent proxy: protocol dispatch, retry with backoff, and the
//! RUN_ERROR / AgentProxyError failure surface.
//!
//! Events are delivered through an mpsc sender; the chat pipeline drains
//! the receiver into the client's SSE stream. Retries cover only attempts
//! that have not yet emitted an event: once anything has been sent the
//! attempt is committed, and a later failure becomes a single in-stream
//! RUN_ERROR instead of a retry or fallback.

use std::time::Duration;

use agui_event::{AguiEvent, ChatRequest};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::a2a::{A2aClient, A2aTranslator};
use crate::agui::AguiClient;
use crate::catalog::{Agent, Protocol};
use crate::error::UpstreamError;
use crate::headers::ForwardHeaders;
use crate::retry::{is_retryable, RetryConfig};

/// Buffered events between the proxy and the pipeline relay.
pub(crate) const EVENT_QUEUE_CAPACITY: usize = 128;

/// Default per-request deadline for upstream calls.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Raised when an agent could not be reached before streaming anything;
/// the pipeline catches this to fall back to the default agent.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AgentProxyError {
    pub message: String,
    pub agent_id: String,
    pub agent_name: String,
    pub attempts: u32,
    pub is_retryable: bool,
}

/// Forwards chat requests to agents over their protocol and streams AG-UI
/// events back. One instance per process, built over the shared HTTP
/// client; cheap to clone.
#[derive(Clone)]
pub struct AgentProxy {
    agui: AguiClient,
    a2a: A2aClient,
    retry: RetryConfig,
}

impl AgentProxy {
    pub fn new(http: reqwest::Client, retry: RetryConfig, timeout: Duration) -> AgentProxy {
        AgentProxy {
            agui: AguiClient::new(http.clone(), timeout),
            a2a: A2aClient::new(http, timeout),
            retry,
        }
    }

    /// Forwards the request to `agent`, sending every resulting AG-UI event
    /// into `tx`.
    ///
    /// Retry behavior: transient failures before any event has been sent
    /// retry with exponential backoff, up to `max_attempts` total attempts.
    /// On exhaustion or a permanent failure the proxy sends exactly one
    /// RUN_ERROR and returns [`AgentProxyError`]. Failures after events
    /// have flowed end the stream with one RUN_ERROR and return `Ok`;
    /// mid-stream failures never trigger fallback.
    ///
    /// Takes `tx` by value: when the forward completes, every sender clone
    /// is gone and the receiving relay loop observes end-of-stream.
    pub async fn forward(
        &self,
        agent: &Agent,
        request: &ChatRequest,
        headers: &ForwardHeaders,
        tx: mpsc::Sender<AguiEvent>,
    ) -> Result<(), AgentProxyError> {
        tracing::info!(
            "forwarding request to agent {} ({}) via {}",
            agent.name,
            agent.id,
            agent.protocol.as_str()
        );

        let mut last_error: Option<UpstreamError> = None;
        let mut attempts = 0u32;

        for attempt in 0..self.retry.max_attempts {
            attempts = attempt + 1;
            if attempt > 0 {
                self.retry.wait_before_retry(attempt).await;
                tracing::info!(
                    "retrying request to agent {} (attempt {}/{})",
                    agent.name,
                    attempts,
                    self.retry.max_attempts
                );
            }

            let mut sent = 0usize;
            let result = match agent.protocol {
                Protocol::AgUi => {
                    self.forward_agui(agent, request, headers, &tx, &mut sent).await
                }
                Protocol::A2a => {
                    self.forward_a2a(agent, request, headers, &tx, &mut sent).await
                }
            };

            match result {
                Ok(()) => return Ok(()),
                Err(error) => {
                    if sent > 0 {
                        // Committed attempt: close this stream with one
                        // RUN_ERROR and stop. No retry, no fallback.
                        tracing::warn!(
                            "agent {} failed mid-stream after {} event(s): {}",
                            agent.name,
                            sent,
                            error
                        );
                        let _ = tx
                            .send(AguiEvent::run_error(format!(
                                "Error processing agent response: {error}"
                            )))
                            .await;
                        return Ok(());
                    }
                    let retryable = is_retryable(&error);
                    if !retryable {
                        tracing::error!("agent request failed with non-retryable error: {}", error);
                        last_error = Some(error);
                        break;
                    }
                    if attempts < self.retry.max_attempts {
                        tracing::warn!(
                            "agent request failed (attempt {}/{}): {}",
                            attempts,
                            self.retry.max_attempts,
                            error
                        );
                    } else {
                        tracing::error!("agent request failed after {} attempts: {}", attempts, error);
                    }
                    last_error = Some(error);
                }
            }
        }

        let detail = last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown error".to_string());
        let message = format!("Agent {} failed after {} attempt(s): {}", agent.name, attempts, detail);
        let _ = tx.send(AguiEvent::run_error(message.clone())).await;
        Err(AgentProxyError {
            message,
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            attempts,
            is_retryable: last_error.as_ref().map(is_retryable).unwrap_or(false),
        })
    }

    /// AG-UI path: forward the request as-is, injecting `displayName` into
    /// RUN_STARTED events on the way through.
    async fn forward_agui(
        &self,
        agent: &Agent,
        request: &ChatRequest,
        headers: &ForwardHeaders,
        tx: &mpsc::Sender<AguiEvent>,
        sent: &mut usize,
    ) -> Result<(), UpstreamError> {
        let (inner_tx, mut inner_rx) = mpsc::channel::<AguiEvent>(EVENT_QUEUE_CAPACITY);
        let client_call = self.agui.send(&agent.url, request, headers, inner_tx);
        let relay = async {
            while let Some(event) = inner_rx.recv().await {
                let event = event.with_display_name(&agent.name);
                if send_event(tx, event, sent).await.is_err() {
                    inner_rx.close();
                    return Err(UpstreamError::Transport("event channel closed".to_string()));
                }
            }
            Ok(())
        };
        let (client_result, relay_result) = tokio::join!(client_call, relay);
        relay_result?;
        client_result
    }

    /// A2A path: extract the last user message, open the stream, and drive
    /// the translator.
    async fn forward_a2a(
        &self,
        agent: &Agent,
        request: &ChatRequest,
        headers: &ForwardHeaders,
        tx: &mpsc::Sender<AguiEvent>,
        sent: &mut usize,
    ) -> Result<(), UpstreamError> {
        let Some(content) = request.last_user_message_text() else {
            tracing::error!("cannot forward to A2A agent: no user message in request");
            let _ = tx
                .send(AguiEvent::run_error(
                    "Invalid request: no user message found in request",
                ))
                .await;
            return Ok(());
        };

        // threadId maps onto contextId unchanged; the thread is the session.
        let context_id = request.thread_id.clone();
        let run_id = Uuid::new_v4().to_string();

        let mut stream = self
            .a2a
            .connect(&agent.url, &content, &context_id, headers)
            .await?;

        let mut translator =
            A2aTranslator::new(request.thread_id.clone(), run_id, Some(agent.name.clone()));
        let started = translator.start();
        send_event(tx, started, sent).await?;

        while let Some(frame) = stream.next_frame().await? {
            for event in translator.next(&frame) {
                send_event(tx, event, sent).await?;
            }
        }
        for event in translator.finish() {
            send_event(tx, event, sent).await?;
        }
        Ok(())
    }
}

/// Sends one event downstream, counting it. A closed channel means the
/// client went away; surfaced as a transport error so callers unwind.
pub(crate) async fn send_event(
    tx: &mpsc::Sender<AguiEvent>,
    event: AguiEvent,
    sent: &mut usize,
) -> Result<(), UpstreamError> {
    tx.send(event)
        .await
        .map_err(|_| UpstreamError::Transport("event channel closed".to_string()))?;
    *sent += 1;
    Ok(())
}
