//! `@mention` parsing for explicit agent override routing.

use std::sync::OnceLock;

use agui_event::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use regex::Regex;

/// `@` followed by alphanumerics, hyphens, or underscores. No word-boundary
/// prefix is required, so `foo@bar` yields mention `bar` and the local part
/// of an email address matches its domain-side token.
fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_-]+)").unwrap())
}

/// Parses the first `@mention` from a message, lowercased. The first
/// mention wins; `None` for empty input or no match.
pub fn parse_mention(message: &str) -> Option<String> {
    if message.is_empty() {
        return None;
    }
    mention_pattern()
        .captures(message)
        .map(|caps| caps[1].to_lowercase())
}

/// Removes **all** `@mentions` from a message, then collapses whitespace
/// runs to single spaces and trims. The routing layer consumes the first
/// mention; agents receive clean content.
pub fn strip_mentions(message: &str) -> String {
    if message.is_empty() {
        return message.to_string();
    }
    let stripped = mention_pattern().replace_all(message, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Copies a request with mentions stripped from every **user** message.
/// Messages of other roles are byte-identical; the original is untouched.
pub fn strip_mentions_from_request(request: &ChatRequest) -> ChatRequest {
    let messages = request
        .messages
        .iter()
        .map(|message| {
            if !message.role.eq_ignore_ascii_case("user") {
                return message.clone();
            }
            let content = message.content.as_ref().map(|content| match content {
                MessageContent::Text(text) => MessageContent::Text(strip_mentions(text)),
                MessageContent::Parts(parts) => MessageContent::Parts(
                    parts
                        .iter()
                        .map(|part| ContentPart {
                            part_type: part.part_type.clone(),
                            text: part.text.as_deref().map(strip_mentions),
                            extra: part.extra.clone(),
                        })
                        .collect(),
                ),
            });
            ChatMessage {
                content,
                ..message.clone()
            }
        })
        .collect();
    ChatRequest {
        messages,
        ..request.clone()
    }
}
