//! Routing: mention override, semantic matching, drift detection, LLM
//! fallback, and the cascade that composes them.

mod drift;
mod engine;
mod llm_fallback;
mod mention;
mod semantic;

pub use drift::{detect_topic_drift, DriftResult};
pub use engine::{RouteDecision, RoutingEngine, RoutingMethod};
pub use llm_fallback::{
    build_classification_prompt, classify_with_llm, extract_text_from_a2a_response,
    parse_llm_response, LlmFallbackError, MAX_CLASSIFY_MESSAGE_LEN,
};
pub use mention::{parse_mention, strip_mentions, strip_mentions_from_request};
pub use semantic::{
    MatchError, RouteMatch, SemanticIndex, SemanticMatcher, MAX_MESSAGE_LENGTH,
};
