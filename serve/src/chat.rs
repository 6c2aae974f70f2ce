//! The chat endpoint pipeline: validate, route, forward, stream.
//!
//! Each request spawns one producer task that drives the proxy (and the
//! default-agent fallback) into an mpsc channel; the SSE response body
//! drains it. Client disconnects drop the receiver, and the pipeline winds
//! down at its next send.

use std::convert::Infallible;
use std::sync::Arc;

use agui_event::{
    AguiEvent, ChatRequest, TextMessageContent, TextMessageEnd, TextMessageStart,
};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Map;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use router::catalog::Agent;
use router::observability::{AuditLogger, StreamBuffer};
use router::routing::{strip_mentions_from_request, RoutingMethod};
use router::{AgentProxy, AgentProxyError, ForwardHeaders};

use super::app::AppState;
use super::error::ApiError;

/// Buffered events between the producer task and the SSE body.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// POST /api/agui/chat: route the request and stream AG-UI events back
/// over SSE.
pub async fn chat(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(chat_request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let request_id =
        header_value(&headers, "x-request-id").unwrap_or_else(|| Uuid::new_v4().to_string());
    let authorization = header_value(&headers, "authorization");

    chat_request
        .validate()
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    let audit = AuditLogger::new(&request_id, &chat_request.thread_id, app.settings.audit_enabled);
    tracing::info!(
        "received chat request (thread_id={}, request_id={}, messages={})",
        chat_request.thread_id,
        request_id,
        chat_request.messages.len()
    );

    let user_message = chat_request.last_user_message_text();
    audit.request_received(
        chat_request.messages.len(),
        authorization.is_some(),
        user_message.as_deref(),
    );

    let Some(state) = app.router_state.load_full() else {
        return Err(ApiError::NotReady("configuration not loaded"));
    };

    let forward_headers = ForwardHeaders::new(&request_id, authorization);

    let user_message = match user_message {
        Some(message) if !message.is_empty() => message,
        _ => {
            tracing::warn!("no user message found in request");
            return Err(ApiError::BadRequest("No user message found".to_string()));
        }
    };

    let decision = app
        .engine
        .route(
            &state,
            app.sessions.as_deref(),
            &chat_request.thread_id,
            &user_message,
            &forward_headers,
        )
        .await;

    audit.routing_decision(
        &decision.agent.id,
        &decision.agent.name,
        decision.method.as_str(),
        decision.score,
        decision.topic_drift,
    );
    if decision.topic_drift {
        audit.session_event("deleted", None, Some("topic_drift"));
    }
    if state.catalog.session.sticky_enabled && app.sessions.is_some() {
        let action = if decision.method == RoutingMethod::Sticky {
            "updated"
        } else {
            "created"
        };
        audit.session_event(action, Some(&decision.agent.id), None);
    }

    // Agents receive clean content; the mention has done its routing job.
    let forwarding_request = strip_mentions_from_request(&chat_request);

    let run_id = Uuid::new_v4().to_string();
    let buffer = app.settings.stream_buffer_enabled.then(|| {
        StreamBuffer::new(
            &chat_request.thread_id,
            &run_id,
            &request_id,
            app.settings.stream_buffer_max_size,
        )
    });

    let pipeline = ChatPipeline {
        proxy: app.proxy.clone(),
        audit,
        agent: decision.agent.clone(),
        default_agent: state.catalog.default_agent().clone(),
        agent_is_default: state.catalog.is_default_agent(&decision.agent),
        request: forwarding_request,
        headers: forward_headers,
        run_id,
        buffer,
    };

    let (out_tx, out_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(pipeline.run(out_tx));

    let stream = ReceiverStream::new(out_rx).map(Ok::<_, Infallible>);
    let mut response = Sse::new(stream).into_response();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    Ok(response)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// Frames one AG-UI event for the wire: the event's type discriminator as
/// the `event:` field and its camelCase JSON as the `data:` field.
fn sse_frame(event: &AguiEvent) -> Event {
    Event::default()
        .event(event.event_type())
        .data(event.to_json().unwrap_or_else(|_| "{}".to_string()))
}

/// One request's event production: primary agent, then the default-agent
/// fallback with a visible notice when the primary was not the default.
struct ChatPipeline {
    proxy: AgentProxy,
    audit: AuditLogger,
    agent: Agent,
    default_agent: Agent,
    agent_is_default: bool,
    request: ChatRequest,
    headers: ForwardHeaders,
    run_id: String,
    buffer: Option<StreamBuffer>,
}

impl ChatPipeline {
    async fn run(mut self, out_tx: mpsc::Sender<Event>) {
        self.audit
            .agent_forwarded(&self.agent.id, self.agent.protocol.as_str(), 1);
        self.audit.stream_started(&self.run_id);

        match stream_agent(
            &self.proxy,
            &self.agent,
            &self.request,
            &self.headers,
            &self.audit,
            &mut self.buffer,
            &out_tx,
        )
        .await
        {
            Ok(true) => {}
            // Client went away; nothing left to deliver.
            Ok(false) => return,
            Err(error) => {
                self.handle_primary_failure(error, &out_tx).await;
            }
        }

        if let Some(buffer) = &self.buffer {
            if buffer.is_complete() {
                if let Some(message) = buffer.message() {
                    self.audit.message_complete(message);
                }
            }
        }
    }

    async fn handle_primary_failure(&mut self, error: AgentProxyError, out_tx: &mpsc::Sender<Event>) {
        let failure_context = format!(
            "Agent '{}' unavailable after {} attempt(s). ",
            error.agent_name, error.attempts
        );
        self.audit.agent_error(
            &self.agent.id,
            &error.message,
            None,
            error.is_retryable,
            error.attempts,
        );

        if self.agent_is_default {
            // The default agent itself failed; there is nowhere to fall
            // back to.
            let message = format!("Default agent unavailable: {failure_context}");
            emit_event(&AguiEvent::run_error(message), &mut self.buffer, out_tx).await;
            return;
        }

        tracing::warn!(
            "primary agent failed, attempting fallback to default agent: {}",
            error
        );
        self.audit
            .fallback_triggered(&self.agent.id, &self.default_agent.id, &failure_context);
        tracing::info!("falling back to default agent (original={})", self.agent.name);

        if !emit_fallback_notice(&failure_context, &mut self.buffer, out_tx).await {
            return;
        }
        self.audit
            .agent_forwarded(&self.default_agent.id, self.default_agent.protocol.as_str(), 1);

        match stream_agent(
            &self.proxy,
            &self.default_agent,
            &self.request,
            &self.headers,
            &self.audit,
            &mut self.buffer,
            out_tx,
        )
        .await
        {
            Ok(_) => {}
            Err(fallback_error) => {
                tracing::error!("fallback to default agent also failed: {}", fallback_error);
                self.audit.agent_error(
                    &self.default_agent.id,
                    &fallback_error.message,
                    None,
                    fallback_error.is_retryable,
                    fallback_error.attempts,
                );
                let message = format!(
                    "All agents unavailable. Primary: {failure_context}Fallback: {fallback_error}"
                );
                emit_event(&AguiEvent::run_error(message), &mut self.buffer, out_tx).await;
            }
        }
    }
}

/// Drives one proxy forward, relaying events to the wire as they arrive.
/// `Ok(true)` on success, `Ok(false)` when the client disconnected, the
/// proxy error when the agent could not be reached.
async fn stream_agent(
    proxy: &AgentProxy,
    agent: &Agent,
    request: &ChatRequest,
    headers: &ForwardHeaders,
    audit: &AuditLogger,
    buffer: &mut Option<StreamBuffer>,
    out_tx: &mpsc::Sender<Event>,
) -> Result<bool, AgentProxyError> {
    let (ev_tx, mut ev_rx) = mpsc::channel::<AguiEvent>(EVENT_CHANNEL_CAPACITY);
    let forward = proxy.forward(agent, request, headers, ev_tx);
    let relay = async {
        let mut connected = true;
        let mut chunk_number = 0u64;
        while let Some(event) = ev_rx.recv().await {
            if let Some(buffer) = buffer.as_mut() {
                buffer.record(&event);
            }
            if let AguiEvent::TextMessageContent(content) = &event {
                chunk_number += 1;
                audit.stream_chunk(&content.message_id, chunk_number, content.delta.len());
            }
            if out_tx.send(sse_frame(&event)).await.is_err() {
                connected = false;
                ev_rx.close();
                // Drain buffered events so the proxy unwinds promptly.
                while ev_rx.recv().await.is_some() {}
                break;
            }
        }
        connected
    };
    let (forward_result, connected) = tokio::join!(forward, relay);
    if !connected {
        tracing::debug!("client disconnected mid-stream (agent={})", agent.id);
        return Ok(false);
    }
    forward_result.map(|_| true)
}

/// Emits one synthetic event through the buffer onto the wire. False when
/// the client is gone.
async fn emit_event(
    event: &AguiEvent,
    buffer: &mut Option<StreamBuffer>,
    out_tx: &mpsc::Sender<Event>,
) -> bool {
    if let Some(buffer) = buffer.as_mut() {
        buffer.record(event);
    }
    out_tx.send(sse_frame(event)).await.is_ok()
}

/// The visible fallback notice: a short assistant message explaining the
/// hand-off before the default agent's stream begins.
async fn emit_fallback_notice(
    failure_context: &str,
    buffer: &mut Option<StreamBuffer>,
    out_tx: &mpsc::Sender<Event>,
) -> bool {
    let message = format!("[Notice: {failure_context}Routing to general assistant.]\n\n");
    let message_id = Uuid::new_v4().to_string();

    let start = AguiEvent::TextMessageStart(TextMessageStart {
        message_id: message_id.clone(),
        role: "assistant".to_string(),
        extra: Map::new(),
    });
    let content = AguiEvent::TextMessageContent(TextMessageContent {
        message_id: message_id.clone(),
        delta: message,
        extra: Map::new(),
    });
    let end = AguiEvent::TextMessageEnd(TextMessageEnd {
        message_id,
        extra: Map::new(),
    });

    emit_event(&start, buffer, out_tx).await
        && emit_event(&content, buffer, out_tx).await
        && emit_event(&end, buffer, out_tx).await
}
