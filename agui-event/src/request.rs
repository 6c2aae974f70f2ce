//! Ingress chat request and outbound RunAgentInput models.
//!
//! Field names serialize as camelCase (the AG-UI wire standard) while
//! deserialization accepts both camelCase and snake_case via aliases.
//! Message `content` can be a string or an array of parts; we accept both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Longest accepted `thread_id`, in characters.
pub const MAX_THREAD_ID_LEN: usize = 100;
/// Most messages accepted in one request.
pub const MAX_MESSAGES: usize = 100;

const VALID_ROLES: [&str; 4] = ["user", "assistant", "system", "tool"];

/// Request body for the chat endpoint: the minimum clients must send.
/// The router populates the remaining [`RunAgentInput`] fields (run id,
/// forwarded props) before forwarding to AG-UI agents.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation identifier; the canonical session key.
    #[serde(alias = "thread_id")]
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

/// One conversation message. Unknown fields (tool calls, names, …) are
/// preserved and forwarded verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// "user", "assistant", "system", or "tool".
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message content: either a plain string or an array of parts, each with an
/// optional `text` field.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The textual content: the string variant as-is, or the `text` fields of
    /// all parts joined by single spaces. Parts without text are skipped.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One part of a multi-part message content array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub part_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validation errors for an ingress [`ChatRequest`].
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("thread_id must not be empty")]
    EmptyThreadId,
    #[error("thread_id exceeds {MAX_THREAD_ID_LEN} characters")]
    ThreadIdTooLong,
    #[error("messages must not be empty")]
    NoMessages,
    #[error("messages exceed {MAX_MESSAGES} entries")]
    TooManyMessages,
    #[error("invalid message role: {0}")]
    InvalidRole(String),
}

impl ChatRequest {
    /// Checks the ingress bounds: thread id 1..=100 chars, 1..=100 messages,
    /// roles restricted to the known set.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.thread_id.is_empty() {
            return Err(RequestError::EmptyThreadId);
        }
        if self.thread_id.chars().count() > MAX_THREAD_ID_LEN {
            return Err(RequestError::ThreadIdTooLong);
        }
        if self.messages.is_empty() {
            return Err(RequestError::NoMessages);
        }
        if self.messages.len() > MAX_MESSAGES {
            return Err(RequestError::TooManyMessages);
        }
        for message in &self.messages {
            if !VALID_ROLES.iter().any(|r| message.role.eq_ignore_ascii_case(r)) {
                return Err(RequestError::InvalidRole(message.role.clone()));
            }
        }
        Ok(())
    }

    /// The text of the last message with role "user", or `None` when the
    /// request has no user message. An empty string counts as present; the
    /// caller decides whether that is acceptable.
    pub fn last_user_message_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role.eq_ignore_ascii_case("user"))
            .map(|m| m.content.as_ref().map(MessageContent::as_text).unwrap_or_default())
    }
}

/// Full request body sent to AG-UI agents.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    pub thread_id: String,
    pub run_id: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Value>,
    pub context: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Always present, an empty object unless a caller supplies one.
    pub forwarded_props: Value,
}

impl RunAgentInput {
    /// Builds the outbound input from an ingress request and a fresh run id.
    pub fn from_request(request: &ChatRequest, run_id: impl Into<String>) -> RunAgentInput {
        RunAgentInput {
            thread_id: request.thread_id.clone(),
            run_id: run_id.into(),
            messages: request.messages.clone(),
            tools: request.tools.clone(),
            context: request.context.clone(),
            state: request.state.clone(),
            forwarded_props: Value::Object(Map::new()),
        }
    }
}
