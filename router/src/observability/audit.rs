//! Structured audit logging.
//!
//! Audit records are single-line JSON emitted on the dedicated `audit`
//! tracing target, so operators can filter and route them separately from
//! application logs. Every record carries `event_type`, an RFC 3339
//! `timestamp`, and (for per-request records) the request and thread
//! correlators. Emission is best-effort and never affects request
//! processing.

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::observability::buffer::BufferedMessage;

/// Tracing target for audit records.
pub const AUDIT_TARGET: &str = "audit";

/// Longest error message recorded in an audit event, in characters.
const MAX_ERROR_LEN: usize = 200;
/// Longest user-message preview recorded in an audit event, in characters.
const MAX_PREVIEW_LEN: usize = 100;

/// Emits a non-request-scoped audit record (reload lifecycle and similar).
pub fn log_system_event(event_type: &str, mut fields: Map<String, Value>) {
    fields.insert("event_type".to_string(), Value::String(event_type.to_string()));
    fields.insert("timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
    if let Ok(line) = serde_json::to_string(&Value::Object(fields)) {
        tracing::info!(target: "audit", "{}", line);
    }
}

/// Per-request audit logger: a small value constructed per request,
/// carrying the correlation ids.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    request_id: String,
    thread_id: String,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(request_id: impl Into<String>, thread_id: impl Into<String>, enabled: bool) -> AuditLogger {
        AuditLogger {
            request_id: request_id.into(),
            thread_id: thread_id.into(),
            enabled,
        }
    }

    fn emit(&self, event_type: &str, mut fields: Map<String, Value>) {
        if !self.enabled {
            return;
        }
        fields.insert("event_type".to_string(), Value::String(event_type.to_string()));
        fields.insert("timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
        fields.insert("request_id".to_string(), Value::String(self.request_id.clone()));
        fields.insert("thread_id".to_string(), Value::String(self.thread_id.clone()));
        if let Ok(line) = serde_json::to_string(&Value::Object(fields)) {
            tracing::info!(target: "audit", "{}", line);
        }
    }

    pub fn request_received(
        &self,
        message_count: usize,
        has_authorization: bool,
        user_message_preview: Option<&str>,
    ) {
        let mut fields = Map::new();
        fields.insert("message_count".into(), json!(message_count));
        fields.insert("has_authorization".into(), json!(has_authorization));
        if let Some(preview) = user_message_preview {
            fields.insert(
                "user_message_preview".into(),
                json!(truncate(preview, MAX_PREVIEW_LEN)),
            );
        }
        self.emit("request_received", fields);
    }

    pub fn routing_decision(
        &self,
        agent_id: &str,
        agent_name: &str,
        routing_method: &str,
        confidence_score: Option<f32>,
        topic_drift_detected: bool,
    ) {
        let mut fields = Map::new();
        fields.insert("agent_id".into(), json!(agent_id));
        fields.insert("agent_name".into(), json!(agent_name));
        fields.insert("routing_method".into(), json!(routing_method));
        if let Some(score) = confidence_score {
            fields.insert("confidence_score".into(), json!((score * 10_000.0).round() / 10_000.0));
        }
        if topic_drift_detected {
            fields.insert("topic_drift_detected".into(), json!(true));
        }
        self.emit("routing_decision", fields);
    }

    pub fn agent_forwarded(&self, agent_id: &str, agent_protocol: &str, attempt_number: u32) {
        let mut fields = Map::new();
        fields.insert("agent_id".into(), json!(agent_id));
        fields.insert("agent_protocol".into(), json!(agent_protocol));
        fields.insert("attempt_number".into(), json!(attempt_number));
        self.emit("agent_forwarded", fields);
    }

    pub fn stream_started(&self, run_id: &str) {
        let mut fields = Map::new();
        fields.insert("run_id".into(), json!(run_id));
        self.emit("stream_started", fields);
    }

    /// High-volume per-chunk record; only emitted when the audit target is
    /// enabled at DEBUG.
    pub fn stream_chunk(&self, message_id: &str, chunk_number: u64, delta_length: usize) {
        if !self.enabled || !tracing::enabled!(target: "audit", tracing::Level::DEBUG) {
            return;
        }
        let mut fields = Map::new();
        fields.insert("message_id".into(), json!(message_id));
        fields.insert("chunk_number".into(), json!(chunk_number));
        fields.insert("delta_length".into(), json!(delta_length));
        self.emit("stream_chunk", fields);
    }

    pub fn message_complete(&self, message: &BufferedMessage) {
        let mut fields = Map::new();
        fields.insert("message_id".into(), json!(message.message_id));
        fields.insert("content_length".into(), json!(message.accumulated_content.len()));
        fields.insert("frame_count".into(), json!(message.frames.len()));
        if let Some(duration_ms) = message.duration_ms() {
            fields.insert("duration_ms".into(), json!((duration_ms * 100.0).round() / 100.0));
        }
        self.emit("message_complete", fields);
    }

    /// Session lifecycle record; `action` is one of created/updated/
    /// expired/deleted.
    pub fn session_event(&self, action: &str, agent_id: Option<&str>, reason: Option<&str>) {
        let event_type = match action {
            "created" => "session_created",
            "expired" => "session_expired",
            "deleted" => "session_deleted",
            _ => "session_updated",
        };
        let mut fields = Map::new();
        fields.insert("action".into(), json!(action));
        if let Some(agent_id) = agent_id {
            fields.insert("agent_id".into(), json!(agent_id));
        }
        if let Some(reason) = reason {
            fields.insert("reason".into(), json!(reason));
        }
        self.emit(event_type, fields);
    }

    pub fn agent_error(
        &self,
        agent_id: &str,
        error_message: &str,
        status_code: Option<u16>,
        is_retryable: bool,
        attempt_number: u32,
    ) {
        let mut fields = Map::new();
        fields.insert("agent_id".into(), json!(agent_id));
        fields.insert("error_message".into(), json!(truncate(error_message, MAX_ERROR_LEN)));
        fields.insert("is_retryable".into(), json!(is_retryable));
        fields.insert("attempt_number".into(), json!(attempt_number));
        if let Some(status) = status_code {
            fields.insert("status_code".into(), json!(status));
        }
        self.emit("agent_error", fields);
    }

    pub fn fallback_triggered(&self, original_agent_id: &str, fallback_agent_id: &str, reason: &str) {
        let mut fields = Map::new();
        fields.insert("original_agent_id".into(), json!(original_agent_id));
        fields.insert("fallback_agent_id".into(), json!(fallback_agent_id));
        fields.insert("reason".into(), json!(truncate(reason, MAX_ERROR_LEN)));
        self.emit("fallback_triggered", fields);
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
