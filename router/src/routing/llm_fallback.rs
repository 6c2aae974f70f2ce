//! LLM fallback classification for messages no semantic rule matched.
//!
//! Asks the default agent (as an LLM, over a non-streaming A2A call) which
//! specialist should handle the message, then maps its answer back onto a
//! configured agent id.

use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Agent;
use crate::headers::ForwardHeaders;

/// Longest message excerpt quoted in the classification prompt.
pub const MAX_CLASSIFY_MESSAGE_LEN: usize = 500;

/// Deadline for the classification call.
const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum LlmFallbackError {
    #[error("LLM classification failed: HTTP {status}")]
    Http { status: u16 },
    #[error("LLM classification request failed: {0}")]
    Transport(String),
}

/// Builds the classification prompt: truncated message plus one
/// `- <id>: <description>` line per agent.
pub fn build_classification_prompt(message: &str, agents: &[Agent]) -> String {
    let mut truncated: String = message.chars().take(MAX_CLASSIFY_MESSAGE_LEN).collect();
    if message.chars().count() > MAX_CLASSIFY_MESSAGE_LEN {
        truncated.push_str("...");
    }

    let agent_list = agents
        .iter()
        .map(|agent| {
            let description = agent.description.trim();
            let description = if description.is_empty() {
                "No description available"
            } else {
                description
            };
            format!("- {}: {}", agent.id, description)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "User query: {truncated}\n\nAvailable specialist agents:\n{agent_list}\n\nWhich agent should handle this query? Respond with ONLY the agent ID."
    )
}

/// Maps the LLM's answer onto a configured agent: first line, quotes and
/// whitespace stripped, then exact id match → case-insensitive match →
/// word-boundary id search within the text.
pub fn parse_llm_response<'a>(response: &str, agents: &'a [Agent]) -> Option<&'a Agent> {
    if response.trim().is_empty() {
        tracing::warn!("empty LLM response for classification");
        return None;
    }

    let first_line = response.trim().lines().next().unwrap_or_default().trim();
    let cleaned = first_line.trim_matches(|c| c == '"' || c == '\'');

    if let Some(agent) = agents.iter().find(|a| a.id == cleaned) {
        tracing::debug!("LLM classification matched agent: {}", agent.id);
        return Some(agent);
    }

    if let Some(agent) = agents.iter().find(|a| a.id.eq_ignore_ascii_case(cleaned)) {
        tracing::debug!("LLM classification matched agent (case-insensitive): {}", agent.id);
        return Some(agent);
    }

    for agent in agents {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&agent.id));
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(cleaned) {
                tracing::debug!("LLM classification found agent ID in response: {}", agent.id);
                return Some(agent);
            }
        }
    }

    tracing::warn!(
        "LLM response {:?} did not match any known agent",
        cleaned.chars().take(100).collect::<String>()
    );
    None
}

/// Extracts text from a non-streaming A2A JSON-RPC response, trying
/// `result.artifacts[*].parts[*]`, then `result.message.parts[*]`, then
/// `result.text`.
pub fn extract_text_from_a2a_response(response: &Value) -> Option<String> {
    let result = response.get("result")?;

    if let Some(artifacts) = result.get("artifacts").and_then(Value::as_array) {
        for artifact in artifacts {
            if let Some(text) = first_part_text(artifact.get("parts")) {
                return Some(text);
            }
        }
    }

    if let Some(text) = first_part_text(result.get("message").and_then(|m| m.get("parts"))) {
        return Some(text);
    }

    if let Some(text) = result.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    tracing::debug!("could not extract text from A2A response");
    None
}

fn first_part_text(parts: Option<&Value>) -> Option<String> {
    for part in parts?.as_array()? {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    None
}

/// Asks the default agent to classify the message. Returns the matched
/// agent, `None` when the answer maps to nothing, or an error on transport
/// or HTTP failure. Authorization is forwarded; X-Request-ID is not (this
/// is a separate request).
pub async fn classify_with_llm(
    http: &reqwest::Client,
    message: &str,
    agents: &[Agent],
    default_agent_url: &str,
    headers: &ForwardHeaders,
) -> Result<Option<Agent>, LlmFallbackError> {
    if agents.is_empty() {
        tracing::debug!("no agents configured for LLM classification");
        return Ok(None);
    }

    let prompt = build_classification_prompt(message, agents);
    tracing::debug!(
        "calling LLM fallback for classification (message_len={}, agents={})",
        message.chars().count(),
        agents.len()
    );

    let payload = json!({
        "jsonrpc": "2.0",
        "id": Uuid::new_v4().to_string(),
        "method": "message/send",
        "params": {
            "message": {
                "messageId": Uuid::new_v4().to_string(),
                "role": "user",
                "parts": [{"kind": "text", "text": prompt}],
            },
            "contextId": Uuid::new_v4().to_string(),
            "configuration": {
                "acceptedOutputModes": ["text"],
            },
        },
    });

    let mut request = http
        .post(default_agent_url)
        .json(&payload)
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(CLASSIFY_TIMEOUT);
    if let Some(authorization) = &headers.authorization {
        request = request.header(reqwest::header::AUTHORIZATION, authorization.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| LlmFallbackError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            "LLM classification request failed with status {}: {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        );
        return Err(LlmFallbackError::Http {
            status: status.as_u16(),
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| LlmFallbackError::Transport(e.to_string()))?;

    let Some(text) = extract_text_from_a2a_response(&body) else {
        tracing::warn!("no text content in LLM classification response");
        return Ok(None);
    };

    Ok(parse_llm_response(&text, agents).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent(id: &str, description: &str) -> Agent {
        Agent {
            id: id.into(),
            name: id.into(),
            handles: vec![id.into()],
            url: "http://localhost:1".into(),
            protocol: Default::default(),
            routing: None,
            description: description.into(),
        }
    }

    /// **Scenario**: the prompt lists agents as `- id: description` and
    /// truncates long messages with an ellipsis.
    #[test]
    fn prompt_shape_and_truncation() {
        let agents = vec![
            agent("metrics-agent", "Prometheus queries"),
            agent("general-agent", ""),
        ];
        let prompt = build_classification_prompt("help me", &agents);
        assert!(prompt.contains("- metrics-agent: Prometheus queries"));
        assert!(prompt.contains("- general-agent: No description available"));
        assert!(prompt.contains("Respond with ONLY the agent ID."));

        let long = "x".repeat(MAX_CLASSIFY_MESSAGE_LEN + 10);
        let prompt = build_classification_prompt(&long, &agents);
        assert!(prompt.contains(&format!("{}...", "x".repeat(MAX_CLASSIFY_MESSAGE_LEN))));
    }

    /// **Scenario**: exact, case-insensitive, quoted, and embedded id
    /// answers all resolve; unknown answers do not.
    #[test]
    fn response_parsing_ladder() {
        let agents = vec![agent("metrics-agent", ""), agent("general-agent", "")];

        assert_eq!(parse_llm_response("metrics-agent", &agents).unwrap().id, "metrics-agent");
        assert_eq!(parse_llm_response("METRICS-AGENT", &agents).unwrap().id, "metrics-agent");
        assert_eq!(parse_llm_response("\"metrics-agent\"", &agents).unwrap().id, "metrics-agent");
        assert_eq!(
            parse_llm_response("I suggest metrics-agent for this.", &agents).unwrap().id,
            "metrics-agent"
        );
        assert_eq!(
            parse_llm_response("metrics-agent\nbecause it is best", &agents).unwrap().id,
            "metrics-agent"
        );
        assert!(parse_llm_response("weather-agent", &agents).is_none());
        assert!(parse_llm_response("", &agents).is_none());
        // Substring inside a larger token must not match.
        assert!(parse_llm_response("supermetrics-agentx", &agents).is_none());
    }

    /// **Scenario**: text extraction tries artifacts, then message, then a
    /// bare text field.
    #[test]
    fn extraction_order() {
        let artifacts = json!({"result": {"artifacts": [
            {"parts": [{"kind": "data"}, {"kind": "text", "text": "from-artifact"}]}
        ]}});
        assert_eq!(
            extract_text_from_a2a_response(&artifacts).as_deref(),
            Some("from-artifact")
        );

        let message = json!({"result": {"message": {"parts": [{"kind": "text", "text": "from-message"}]}}});
        assert_eq!(
            extract_text_from_a2a_response(&message).as_deref(),
            Some("from-message")
        );

        let bare = json!({"result": {"text": "bare"}});
        assert_eq!(extract_text_from_a2a_response(&bare).as_deref(), Some("bare"));

        let nothing = json!({"result": {}});
        assert!(extract_text_from_a2a_response(&nothing).is_none());
        assert!(extract_text_from_a2a_response(&json!({})).is_none());
    }
}
