//! Routing decision engine: the deterministic cascade that picks an agent
//! for each request and keeps the session store in step.

use crate::catalog::Agent;
use crate::headers::ForwardHeaders;
use crate::session::SessionStore;
use crate::state::RouterState;

use super::drift::detect_topic_drift;
use super::llm_fallback::classify_with_llm;
use super::mention::parse_mention;
use super::semantic::SemanticMatcher;

/// How an agent was selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutingMethod {
    Mention,
    Sticky,
    Semantic,
    LlmFallback,
    Default,
}

impl RoutingMethod {
    /// Wire/audit name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMethod::Mention => "mention",
            RoutingMethod::Sticky => "sticky",
            RoutingMethod::Semantic => "semantic",
            RoutingMethod::LlmFallback => "llm_fallback",
            RoutingMethod::Default => "default",
        }
    }
}

/// The outcome of one routing decision.
#[derive(Clone, Debug)]
pub struct RouteDecision {
    pub agent: Agent,
    pub method: RoutingMethod,
    /// Similarity score, when the method produced one (sticky/semantic).
    pub score: Option<f32>,
    /// Whether topic drift evicted a sticky session on the way here.
    pub topic_drift: bool,
}

/// Composes the mention parser, drift detector, semantic matcher, and LLM
/// fallback into the routing cascade. Holds no mutable state of its own;
/// the catalog/index pair and the session store are passed per call.
#[derive(Clone)]
pub struct RoutingEngine {
    matcher: SemanticMatcher,
    http: reqwest::Client,
}

impl RoutingEngine {
    pub fn new(matcher: SemanticMatcher, http: reqwest::Client) -> RoutingEngine {
        RoutingEngine { matcher, http }
    }

    pub fn matcher(&self) -> &SemanticMatcher {
        &self.matcher
    }

    /// Routes one message. Cascade, fast paths first:
    ///
    /// 1. `@mention` override, when the handle resolves.
    /// 2. Sticky session, unless topic drift evicts it.
    /// 3. Semantic match against routing examples.
    /// 4. LLM fallback classification via the default agent.
    /// 5. The default agent.
    ///
    /// When sticky sessions are enabled the chosen agent is written back to
    /// the store under the thread id.
    pub async fn route(
        &self,
        state: &RouterState,
        sessions: Option<&SessionStore>,
        thread_id: &str,
        user_message: &str,
        headers: &ForwardHeaders,
    ) -> RouteDecision {
        let catalog = &state.catalog;
        let mut chosen: Option<Agent> = None;
        let mut method = RoutingMethod::Default;
        let mut score: Option<f32> = None;
        let mut topic_drift = false;

        // Step 1: explicit @mention override.
        if let Some(handle) = parse_mention(user_message) {
            if let Some(agent) = catalog.agent_by_handle(&handle) {
                tracing::info!("routing via @mention (handle={}, agent={})", handle, agent.name);
                chosen = Some(agent.clone());
                method = RoutingMethod::Mention;
            } else {
                tracing::warn!("unknown @mention handle: {}, falling back to other routing", handle);
            }
        }

        // Step 2: sticky session, evicted on topic drift.
        if chosen.is_none() {
            if let Some(store) = sessions {
                if let Some(session) = store.get(thread_id) {
                    if let Some(sticky_agent) = catalog.agent_by_id(&session.agent_id) {
                        let drift = detect_topic_drift(
                            &self.matcher,
                            &state.index,
                            user_message,
                            sticky_agent,
                            catalog.session.topic_drift_threshold,
                        )
                        .await;
                        if !drift.drifted {
                            tracing::info!(
                                "using sticky session (thread_id={}, agent={}, score={:.3})",
                                thread_id,
                                sticky_agent.name,
                                drift.similarity_score
                            );
                            chosen = Some(sticky_agent.clone());
                            method = RoutingMethod::Sticky;
                            score = Some(drift.similarity_score);
                            store.touch(thread_id);
                        } else {
                            tracing::info!(
                                "topic drift detected, re-routing (thread_id={}, old_agent={})",
                                thread_id,
                                sticky_agent.name
                            );
                            topic_drift = true;
                            store.delete(thread_id);
                        }
                    }
                }
            }
        }

        // Step 3: semantic match.
        if chosen.is_none() {
            match self.matcher.match_best(&state.index, user_message).await {
                Ok(Some(best)) => {
                    tracing::info!(
                        "routed via semantic matching (agent={}, score={:.3}, example={})",
                        best.agent.name,
                        best.score,
                        best.example.chars().take(50).collect::<String>()
                    );
                    score = Some(best.score);
                    chosen = Some(best.agent);
                    method = RoutingMethod::Semantic;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("semantic matching unavailable: {}", e),
            }
        }

        // Step 4: LLM fallback classification.
        if chosen.is_none() && !catalog.agents.is_empty() {
            let default_agent = catalog.default_agent();
            match classify_with_llm(
                &self.http,
                user_message,
                &catalog.agents,
                &default_agent.url,
                headers,
            )
            .await
            {
                Ok(Some(agent)) => {
                    tracing::info!("routed via LLM classification (agent={})", agent.name);
                    chosen = Some(agent);
                    method = RoutingMethod::LlmFallback;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("LLM fallback classification failed, using default agent: {}", e)
                }
            }
        }

        // Step 5: the default agent.
        let agent = chosen.unwrap_or_else(|| {
            tracing::info!("no match found, using default agent");
            method = RoutingMethod::Default;
            catalog.default_agent().clone()
        });

        // Write-back: stick the thread to the chosen agent.
        if catalog.session.sticky_enabled {
            if let Some(store) = sessions {
                store.set(thread_id, &agent.id, agent.primary_handle());
            }
        }

        tracing::debug!(
            "routing complete (thread_id={}, agent={}, method={})",
            thread_id,
            agent.id,
            method.as_str()
        );

        RouteDecision {
            agent,
            method,
            score,
            topic_drift,
        }
    }
}
