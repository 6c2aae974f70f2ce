//! A2A streaming wire types: the `kind`-tagged frames a streaming
//! `message/stream` call yields inside JSON-RPC responses.

use serde::Deserialize;
use serde_json::Value;

/// One frame of an A2A streaming response.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum A2aFrame {
    /// Full task snapshot; typically the final frame, with the complete
    /// conversation history.
    #[serde(rename = "task")]
    Task(Task),
    /// Incremental status update carrying an optional agent message.
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdate),
    /// Incremental artifact update carrying content parts.
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdate),
    /// Any other frame kind; ignored by the translator.
    #[serde(untagged)]
    Other(Value),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<A2aMessage>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: String,
    #[serde(default)]
    pub message: Option<A2aMessage>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdate {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub last_chunk: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2aMessage {
    #[serde(default)]
    pub message_id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One content part; only text parts matter to the translator.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(untagged)]
    Other(Value),
}

/// First text part in a part list, if any.
pub fn first_text(parts: &[Part]) -> Option<&str> {
    parts.iter().find_map(|part| match part {
        Part::Text { text } => Some(text.as_str()),
        Part::Other(_) => None,
    })
}

impl A2aFrame {
    /// Parses a JSON-RPC `result` value into a frame. Unknown kinds land in
    /// [`A2aFrame::Other`]; structurally broken frames return `None`.
    pub fn from_result(result: Value) -> Option<A2aFrame> {
        serde_json::from_value(result).ok()
    }

    /// The textual content of this frame, per the translator's extraction
    /// rules: status message parts, artifact parts, or, for a full task,
    /// the first agent message in history that carries text.
    pub fn text(&self) -> Option<&str> {
        match self {
            A2aFrame::Task(task) => task
                .history
                .iter()
                .filter(|m| m.role == "agent")
                .find_map(|m| first_text(&m.parts)),
            A2aFrame::StatusUpdate(update) => update
                .status
                .as_ref()
                .and_then(|s| s.message.as_ref())
                .and_then(|m| first_text(&m.parts)),
            A2aFrame::ArtifactUpdate(update) => {
                update.artifact.as_ref().and_then(|a| first_text(&a.parts))
            }
            A2aFrame::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: a status-update frame parses and exposes its text.
    #[test]
    fn status_update_text() {
        let frame = A2aFrame::from_result(json!({
            "kind": "status-update",
            "taskId": "task-1",
            "final": false,
            "status": {
                "state": "working",
                "message": {
                    "messageId": "m1",
                    "role": "agent",
                    "parts": [{"kind": "text", "text": "Hello"}]
                }
            }
        }))
        .unwrap();
        assert_eq!(frame.text(), Some("Hello"));
        assert!(matches!(frame, A2aFrame::StatusUpdate(ref u) if !u.is_final));
    }

    /// **Scenario**: a task frame takes its text from the first agent
    /// history message with a text part, skipping user messages.
    #[test]
    fn task_text_from_agent_history() {
        let frame = A2aFrame::from_result(json!({
            "kind": "task",
            "id": "task-1",
            "status": {"state": "completed"},
            "history": [
                {"messageId": "u1", "role": "user", "parts": [{"kind": "text", "text": "question"}]},
                {"messageId": "a0", "role": "agent", "parts": [{"kind": "data", "data": {}}]},
                {"messageId": "a1", "role": "agent", "parts": [{"kind": "text", "text": "answer"}]}
            ]
        }))
        .unwrap();
        assert_eq!(frame.text(), Some("answer"));
    }

    /// **Scenario**: artifact-update text comes from the artifact's parts;
    /// non-text parts are skipped.
    #[test]
    fn artifact_update_text() {
        let frame = A2aFrame::from_result(json!({
            "kind": "artifact-update",
            "lastChunk": true,
            "artifact": {
                "artifactId": "art-1",
                "parts": [{"kind": "file", "file": {}}, {"kind": "text", "text": "chunk"}]
            }
        }))
        .unwrap();
        assert_eq!(frame.text(), Some("chunk"));
        assert!(matches!(frame, A2aFrame::ArtifactUpdate(ref u) if u.last_chunk));
    }

    /// **Scenario**: unknown kinds become Other and carry no text.
    #[test]
    fn unknown_kind_is_other() {
        let frame = A2aFrame::from_result(json!({
            "kind": "message",
            "messageId": "m1",
            "role": "agent",
            "parts": []
        }))
        .unwrap();
        assert!(matches!(frame, A2aFrame::Other(_)));
        assert_eq!(frame.text(), None);
    }
}
