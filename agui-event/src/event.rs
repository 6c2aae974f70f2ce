//! AG-UI protocol events: a closed set of typed variants plus passthrough.
//! Every event serializes with a string `type` discriminator and camelCase
//! field names; unknown wire fields survive round-trips via flattened maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire discriminator for [`AguiEvent::RunStarted`].
pub const EVENT_RUN_STARTED: &str = "RUN_STARTED";
/// Wire discriminator for [`AguiEvent::RunFinished`].
pub const EVENT_RUN_FINISHED: &str = "RUN_FINISHED";
/// Wire discriminator for [`AguiEvent::RunError`].
pub const EVENT_RUN_ERROR: &str = "RUN_ERROR";
/// Wire discriminator for [`AguiEvent::TextMessageStart`].
pub const EVENT_TEXT_MESSAGE_START: &str = "TEXT_MESSAGE_START";
/// Wire discriminator for [`AguiEvent::TextMessageContent`].
pub const EVENT_TEXT_MESSAGE_CONTENT: &str = "TEXT_MESSAGE_CONTENT";
/// Wire discriminator for [`AguiEvent::TextMessageEnd`].
pub const EVENT_TEXT_MESSAGE_END: &str = "TEXT_MESSAGE_END";

/// AG-UI stream event: one concrete variant per known wire kind, plus a
/// passthrough variant holding the raw object for forward compatibility
/// (tool calls, state deltas, thinking events).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AguiEvent {
    #[serde(rename = "RUN_STARTED")]
    RunStarted(RunStarted),
    #[serde(rename = "RUN_FINISHED")]
    RunFinished(RunFinished),
    #[serde(rename = "RUN_ERROR")]
    RunError(RunError),
    #[serde(rename = "TEXT_MESSAGE_START")]
    TextMessageStart(TextMessageStart),
    #[serde(rename = "TEXT_MESSAGE_CONTENT")]
    TextMessageContent(TextMessageContent),
    #[serde(rename = "TEXT_MESSAGE_END")]
    TextMessageEnd(TextMessageEnd),
    /// Any other event kind, preserved verbatim (including its `type` key).
    #[serde(untagged)]
    Passthrough(Value),
}

/// Run lifecycle start. `display_name` is injected by the proxy/translator
/// when the serving agent is known; absent otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStarted {
    pub thread_id: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFinished {
    pub thread_id: String,
    pub run_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageStart {
    pub message_id: String,
    #[serde(default = "assistant_role")]
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageContent {
    pub message_id: String,
    pub delta: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageEnd {
    pub message_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn assistant_role() -> String {
    "assistant".to_string()
}

impl AguiEvent {
    /// Builds an event from a parsed wire object. Returns `None` when the
    /// object carries no string `type` (callers drop such frames) or when a
    /// known `type` arrives with a malformed payload.
    pub fn from_value(value: Value) -> Option<AguiEvent> {
        value.get("type")?.as_str()?;
        serde_json::from_value(value).ok()
    }

    /// The wire `type` discriminator, used as the SSE `event:` field.
    pub fn event_type(&self) -> &str {
        match self {
            AguiEvent::RunStarted(_) => EVENT_RUN_STARTED,
            AguiEvent::RunFinished(_) => EVENT_RUN_FINISHED,
            AguiEvent::RunError(_) => EVENT_RUN_ERROR,
            AguiEvent::TextMessageStart(_) => EVENT_TEXT_MESSAGE_START,
            AguiEvent::TextMessageContent(_) => EVENT_TEXT_MESSAGE_CONTENT,
            AguiEvent::TextMessageEnd(_) => EVENT_TEXT_MESSAGE_END,
            AguiEvent::Passthrough(v) => {
                v.get("type").and_then(Value::as_str).unwrap_or("UNKNOWN")
            }
        }
    }

    /// Serializes this event to its wire JSON (camelCase keys, nulls omitted).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Attaches `display_name` when this is a RUN_STARTED event; all other
    /// events pass through unchanged.
    pub fn with_display_name(mut self, display_name: &str) -> AguiEvent {
        if let AguiEvent::RunStarted(ref mut started) = self {
            started.display_name = Some(display_name.to_string());
        }
        self
    }

    /// Convenience constructor for an error event without a code.
    pub fn run_error(message: impl Into<String>) -> AguiEvent {
        AguiEvent::RunError(RunError {
            message: message.into(),
            code: None,
            extra: Map::new(),
        })
    }
}
