//! Topic drift detection for sticky sessions.

use crate::catalog::Agent;

use super::semantic::{SemanticIndex, SemanticMatcher};

/// Outcome of a drift check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriftResult {
    pub drifted: bool,
    pub similarity_score: f32,
    pub threshold: f32,
}

/// Decides whether a message still fits the sticky agent's topic.
///
/// `drifted` iff the message's similarity to the agent's examples falls
/// below the threshold. Matcher failures force `drifted = true` with a zero
/// score so the request re-routes instead of failing.
pub async fn detect_topic_drift(
    matcher: &SemanticMatcher,
    index: &SemanticIndex,
    message: &str,
    agent: &Agent,
    drift_threshold: f32,
) -> DriftResult {
    match matcher.compute_similarity(index, message, agent).await {
        Ok(similarity) => {
            let drifted = similarity < drift_threshold;
            if drifted {
                tracing::info!(
                    "topic drift detected (agent={}, score={:.3}, threshold={:.3})",
                    agent.id,
                    similarity,
                    drift_threshold
                );
            } else {
                tracing::debug!(
                    "no topic drift (agent={}, score={:.3}, threshold={:.3})",
                    agent.id,
                    similarity,
                    drift_threshold
                );
            }
            DriftResult {
                drifted,
                similarity_score: similarity,
                threshold: drift_threshold,
            }
        }
        Err(e) => {
            tracing::warn!("error computing drift, assuming drifted: {}", e);
            DriftResult {
                drifted: true,
                similarity_score: 0.0,
                threshold: drift_threshold,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DefaultAgent, RoutingConfig, SessionPolicy};
    use crate::embed::{EmbedError, Embedder};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedEmbedder {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            if self.fail {
                return Err(EmbedError::Embedding("model unavailable".into()));
            }
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }

        fn dimension(&self) -> usize {
            self.vector.len()
        }
    }

    fn agent_with_examples() -> Agent {
        Agent {
            id: "metrics".into(),
            name: "Metrics".into(),
            handles: vec!["metrics".into()],
            url: "http://localhost:1".into(),
            protocol: Default::default(),
            routing: Some(RoutingConfig {
                priority: 1,
                threshold: 0.8,
                examples: vec!["CPU usage".into()],
            }),
            description: String::new(),
        }
    }

    async fn index_for(agent: &Agent, embedder: &dyn Embedder) -> SemanticIndex {
        let catalog = Catalog {
            session: SessionPolicy::default(),
            default_agent: DefaultAgent { id: agent.id.clone() },
            agents: vec![agent.clone()],
        };
        SemanticIndex::build(embedder, &catalog).await.unwrap()
    }

    /// **Scenario**: drift iff similarity < threshold: the drift symmetry
    /// law. Identical vectors score 1.0, so a 0.9 threshold keeps the
    /// session and a 1.0+ score never drifts.
    #[tokio::test]
    async fn drift_symmetry() {
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            fail: false,
        });
        let agent = agent_with_examples();
        let index = index_for(&agent, embedder.as_ref()).await;
        let matcher = SemanticMatcher::new(embedder);

        let result = detect_topic_drift(&matcher, &index, "CPU usage now", &agent, 0.9).await;
        assert!(!result.drifted);
        assert!((result.similarity_score - 1.0).abs() < 1e-6);
        assert_eq!(result.threshold, 0.9);
    }

    /// **Scenario**: a score below the threshold drifts.
    #[tokio::test]
    async fn below_threshold_drifts() {
        // Index built with one vector, query embeds orthogonal: build with
        // e1 for examples, then swap the matcher's embedder to e2.
        let example_embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
            fail: false,
        });
        let agent = agent_with_examples();
        let index = index_for(&agent, example_embedder.as_ref()).await;

        let query_embedder = Arc::new(FixedEmbedder {
            vector: vec![0.0, 1.0],
            fail: false,
        });
        let matcher = SemanticMatcher::new(query_embedder);

        let result = detect_topic_drift(&matcher, &index, "unrelated", &agent, 0.5).await;
        assert!(result.drifted);
        assert!(result.similarity_score.abs() < 1e-6);
    }

    /// **Scenario**: matcher failures force drift with a zero score rather
    /// than failing the request.
    #[tokio::test]
    async fn matcher_error_forces_drift() {
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0],
            fail: true,
        });
        let agent = agent_with_examples();
        let index = SemanticIndex::empty();
        let matcher = SemanticMatcher::new(embedder);

        let result = detect_topic_drift(&matcher, &index, "anything", &agent, 0.5).await;
        assert!(result.drifted);
        assert_eq!(result.similarity_score, 0.0);
        assert_eq!(result.threshold, 0.5);
    }
}
