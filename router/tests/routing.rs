//! Routing cascade laws: precedence of mention > sticky > semantic >
//! llm_fallback > default, drift-driven re-routing, and session write-back.

use std::sync::Arc;

use async_trait::async_trait;
use router::catalog::{Agent, Catalog, DefaultAgent, Protocol, RoutingConfig, SessionPolicy};
use router::embed::{EmbedError, Embedder};
use router::routing::{RoutingEngine, RoutingMethod, SemanticIndex, SemanticMatcher};
use router::session::SessionStore;
use router::state::RouterState;
use router::ForwardHeaders;

/// Maps known keywords onto unit basis vectors so scores are exact: pod /
/// crash topics score 1.0 against troubleshooting examples, CPU / metric
/// topics against metrics examples, everything else is orthogonal.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                if lower.contains("pod") || lower.contains("crash") {
                    vec![1.0, 0.0, 0.0]
                } else if lower.contains("cpu") || lower.contains("metric") {
                    vec![0.0, 1.0, 0.0]
                } else {
                    vec![0.0, 0.0, 1.0]
                }
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        3
    }
}

fn agent(id: &str, handle: &str, examples: &[&str]) -> Agent {
    Agent {
        id: id.into(),
        name: id.into(),
        handles: vec![handle.into()],
        // Port 9 is unroutable on loopback, so LLM fallback calls fail fast.
        url: "http://127.0.0.1:9".into(),
        protocol: Protocol::A2a,
        routing: if examples.is_empty() {
            None
        } else {
            Some(RoutingConfig {
                priority: 1,
                threshold: 0.5,
                examples: examples.iter().map(|s| s.to_string()).collect(),
            })
        },
        description: String::new(),
    }
}

fn catalog(sticky_enabled: bool) -> Catalog {
    Catalog {
        session: SessionPolicy {
            sticky_enabled,
            timeout_minutes: 30,
            topic_drift_threshold: 0.5,
        },
        default_agent: DefaultAgent {
            id: "general-agent".into(),
        },
        agents: vec![
            agent("general-agent", "general", &[]),
            agent(
                "troubleshooting-agent",
                "troubleshoot",
                &["Why is my pod crashing?", "Debug pod failures"],
            ),
            agent("metrics-agent", "metrics", &["Show me CPU usage", "Query metrics"]),
        ],
    }
}

async fn state(sticky_enabled: bool) -> RouterState {
    let catalog = catalog(sticky_enabled);
    let index = SemanticIndex::build(&KeywordEmbedder, &catalog).await.unwrap();
    RouterState { catalog, index }
}

fn engine() -> RoutingEngine {
    let matcher = SemanticMatcher::new(Arc::new(KeywordEmbedder));
    RoutingEngine::new(matcher, reqwest::Client::new())
}

fn headers() -> ForwardHeaders {
    ForwardHeaders::new("req-1", None)
}

/// **Scenario**: an explicit @mention beats a semantic match that would
/// have chosen another agent, and the session sticks to the mentioned one.
#[tokio::test]
async fn mention_override_beats_semantic() {
    let state = state(true).await;
    let store = SessionStore::new(30);
    let decision = engine()
        .route(
            &state,
            Some(&store),
            "t1",
            "@metrics why is my pod crashing?",
            &headers(),
        )
        .await;

    assert_eq!(decision.agent.id, "metrics-agent");
    assert_eq!(decision.method, RoutingMethod::Mention);
    assert!(!decision.topic_drift);

    let session = store.get("t1").expect("session created");
    assert_eq!(session.agent_id, "metrics-agent");
    assert_eq!(session.agent_handle, "metrics");
}

/// **Scenario**: an unknown @mention handle falls through to semantic
/// matching.
#[tokio::test]
async fn unknown_mention_falls_through() {
    let state = state(true).await;
    let decision = engine()
        .route(&state, None, "t1", "@nobody why is my pod crashing?", &headers())
        .await;
    assert_eq!(decision.agent.id, "troubleshooting-agent");
    assert_eq!(decision.method, RoutingMethod::Semantic);
}

/// **Scenario**: sticky until drift: the first message routes
/// semantically and creates a session; a same-topic follow-up reuses it;
/// an off-topic follow-up deletes it and re-routes.
#[tokio::test]
async fn sticky_until_drift() {
    let state = state(true).await;
    let store = SessionStore::new(30);
    let engine = engine();

    let first = engine
        .route(&state, Some(&store), "t2", "Why is my pod crashing?", &headers())
        .await;
    assert_eq!(first.agent.id, "troubleshooting-agent");
    assert_eq!(first.method, RoutingMethod::Semantic);
    assert_eq!(store.get("t2").unwrap().agent_id, "troubleshooting-agent");

    let second = engine
        .route(&state, Some(&store), "t2", "The pod crash is back", &headers())
        .await;
    assert_eq!(second.agent.id, "troubleshooting-agent");
    assert_eq!(second.method, RoutingMethod::Sticky);
    assert!(second.score.unwrap() > 0.9);

    let third = engine
        .route(
            &state,
            Some(&store),
            "t2",
            "Show me CPU usage for the cluster",
            &headers(),
        )
        .await;
    assert_eq!(third.agent.id, "metrics-agent");
    assert_eq!(third.method, RoutingMethod::Semantic);
    assert!(third.topic_drift);
    assert_eq!(store.get("t2").unwrap().agent_id, "metrics-agent");
}

/// **Scenario**: cascade precedence: with a live session, a mention still
/// wins without touching the session's drift state.
#[tokio::test]
async fn mention_beats_sticky() {
    let state = state(true).await;
    let store = SessionStore::new(30);
    let engine = engine();

    engine
        .route(&state, Some(&store), "t3", "Why is my pod crashing?", &headers())
        .await;
    let decision = engine
        .route(&state, Some(&store), "t3", "@general help me out", &headers())
        .await;
    assert_eq!(decision.agent.id, "general-agent");
    assert_eq!(decision.method, RoutingMethod::Mention);
    // Write-back re-sticks the thread to the mentioned agent.
    assert_eq!(store.get("t3").unwrap().agent_id, "general-agent");
}

/// **Scenario**: when nothing matches semantically and the LLM fallback is
/// unreachable, the default agent serves, with no score.
#[tokio::test]
async fn default_when_nothing_matches() {
    let state = state(true).await;
    let store = SessionStore::new(30);
    let decision = engine()
        .route(&state, Some(&store), "t4", "tell me a joke", &headers())
        .await;
    assert_eq!(decision.agent.id, "general-agent");
    assert_eq!(decision.method, RoutingMethod::Default);
    assert!(decision.score.is_none());
    assert_eq!(store.get("t4").unwrap().agent_id, "general-agent");
}

/// **Scenario**: with sticky disabled in the catalog, routing works but no
/// session is written.
#[tokio::test]
async fn sticky_disabled_skips_write_back() {
    let state = state(false).await;
    let store = SessionStore::new(30);
    let decision = engine()
        .route(&state, Some(&store), "t5", "Why is my pod crashing?", &headers())
        .await;
    assert_eq!(decision.agent.id, "troubleshooting-agent");
    assert!(store.get("t5").is_none());
}

/// **Scenario**: a session whose agent vanished from the catalog is
/// ignored and the message re-routes semantically.
#[tokio::test]
async fn stale_session_agent_reroutes() {
    let state = state(true).await;
    let store = SessionStore::new(30);
    store.set("t6", "retired-agent", "retired");
    let decision = engine()
        .route(&state, Some(&store), "t6", "Show me CPU usage", &headers())
        .await;
    assert_eq!(decision.agent.id, "metrics-agent");
    assert_eq!(decision.method, RoutingMethod::Semantic);
}
