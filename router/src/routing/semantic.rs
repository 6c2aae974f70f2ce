//! Semantic matcher: scores messages against pre-embedded agent examples.
//!
//! The index is built once per catalog load and swapped together with the
//! catalog; matching is dot products over unit-norm vectors.

use std::cmp::Ordering;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{Agent, Catalog};
use crate::embed::{dot, EmbedError, Embedder};

/// Longest message the matcher accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {MAX_MESSAGE_LENGTH} characters")]
    MessageTooLong,
    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

/// One agent's best match against a message.
#[derive(Clone, Debug)]
pub struct RouteMatch {
    pub agent: Agent,
    pub score: f32,
    /// The example utterance that produced the score.
    pub example: String,
}

/// Pre-embedded routing examples for one catalog.
///
/// One row per example utterance across all agents that carry
/// `routing.examples`; agents without routing or examples are intentionally
/// absent. Immutable after build.
pub struct SemanticIndex {
    agents: Vec<Agent>,
    embeddings: Vec<Vec<f32>>,
    /// Parallel to `embeddings`: (index into `agents`, example text).
    example_to_agent: Vec<(usize, String)>,
}

impl SemanticIndex {
    /// An index with no examples; every match comes back empty.
    pub fn empty() -> SemanticIndex {
        SemanticIndex {
            agents: Vec::new(),
            embeddings: Vec::new(),
            example_to_agent: Vec::new(),
        }
    }

    /// Embeds all routing examples of all agents in the catalog.
    pub async fn build(
        embedder: &dyn Embedder,
        catalog: &Catalog,
    ) -> Result<SemanticIndex, MatchError> {
        let agents: Vec<Agent> = catalog.agents.clone();
        let mut all_examples: Vec<String> = Vec::new();
        let mut example_to_agent: Vec<(usize, String)> = Vec::new();

        for (agent_idx, agent) in agents.iter().enumerate() {
            let Some(routing) = &agent.routing else { continue };
            for example in &routing.examples {
                all_examples.push(example.clone());
                example_to_agent.push((agent_idx, example.clone()));
            }
        }

        if all_examples.is_empty() {
            tracing::warn!("no routing examples found in configuration");
            return Ok(SemanticIndex {
                agents,
                embeddings: Vec::new(),
                example_to_agent,
            });
        }

        tracing::info!("embedding {} routing examples", all_examples.len());
        let embeddings = embedder.embed(&all_examples).await?;
        tracing::info!("route index built with {} embeddings", embeddings.len());
        Ok(SemanticIndex {
            agents,
            embeddings,
            example_to_agent,
        })
    }

    /// Number of embedded examples.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    fn agent_index(&self, agent_id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.id == agent_id)
    }

    /// Rows belonging to one agent, by its position in the snapshot.
    fn rows_for_agent(&self, agent_idx: usize) -> impl Iterator<Item = &Vec<f32>> {
        self.example_to_agent
            .iter()
            .enumerate()
            .filter(move |(_, (idx, _))| *idx == agent_idx)
            .map(|(row, _)| &self.embeddings[row])
    }
}

/// Matches messages to agents via their example utterances.
#[derive(Clone)]
pub struct SemanticMatcher {
    embedder: Arc<dyn Embedder>,
}

impl SemanticMatcher {
    pub fn new(embedder: Arc<dyn Embedder>) -> SemanticMatcher {
        SemanticMatcher { embedder }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    fn validate(message: &str) -> Result<(), MatchError> {
        if message.trim().is_empty() {
            return Err(MatchError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(MatchError::MessageTooLong);
        }
        Ok(())
    }

    async fn embed_query(&self, message: &str) -> Result<Vec<f32>, MatchError> {
        let vectors = self.embedder.embed(&[message.to_string()]).await?;
        vectors.into_iter().next().ok_or_else(|| {
            MatchError::Embedding(EmbedError::Embedding("no vector returned".into()))
        })
    }

    /// All agents whose best example beats their own threshold, sorted by
    /// descending score, ties broken by ascending priority. The reported
    /// score and example are the agent's best-scoring example.
    pub async fn match_agents(
        &self,
        index: &SemanticIndex,
        message: &str,
    ) -> Result<Vec<RouteMatch>, MatchError> {
        Self::validate(message)?;
        if index.is_empty() {
            tracing::debug!("no embeddings in index, returning empty matches");
            return Ok(Vec::new());
        }

        let query = self.embed_query(message).await?;

        // Best example per agent; a strictly greater score replaces, so the
        // earliest best example is the one reported.
        let mut best: Vec<Option<(f32, &str)>> = vec![None; index.agents.len()];
        for (row, (agent_idx, example)) in index.example_to_agent.iter().enumerate() {
            let score = dot(&index.embeddings[row], &query);
            match best[*agent_idx] {
                Some((current, _)) if score <= current => {}
                _ => best[*agent_idx] = Some((score, example.as_str())),
            }
        }

        let mut matches: Vec<RouteMatch> = Vec::new();
        for (agent_idx, entry) in best.iter().enumerate() {
            let Some((score, example)) = entry else { continue };
            let agent = &index.agents[agent_idx];
            let Some(routing) = &agent.routing else { continue };
            if *score >= routing.threshold {
                matches.push(RouteMatch {
                    agent: agent.clone(),
                    score: *score,
                    example: example.to_string(),
                });
            }
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| priority_of(&a.agent).cmp(&priority_of(&b.agent)))
        });

        if let Some(top) = matches.first() {
            tracing::debug!(
                "found {} matches, best: {} (score={:.3})",
                matches.len(),
                top.agent.id,
                top.score
            );
        } else {
            tracing::debug!("no matches above threshold");
        }
        Ok(matches)
    }

    /// The single best match, or `None` when nothing beats its threshold.
    pub async fn match_best(
        &self,
        index: &SemanticIndex,
        message: &str,
    ) -> Result<Option<RouteMatch>, MatchError> {
        let matches = self.match_agents(index, message).await?;
        Ok(matches.into_iter().next())
    }

    /// Maximum similarity of `message` against the agent's examples, for
    /// drift detection. Uses cached index rows when the agent is present;
    /// otherwise embeds the agent's examples on demand. `0.0` when the
    /// agent has no examples.
    pub async fn compute_similarity(
        &self,
        index: &SemanticIndex,
        message: &str,
        agent: &Agent,
    ) -> Result<f32, MatchError> {
        Self::validate(message)?;
        let Some(routing) = &agent.routing else { return Ok(0.0) };
        if routing.examples.is_empty() {
            return Ok(0.0);
        }

        let query = self.embed_query(message).await?;

        if let Some(agent_idx) = index.agent_index(&agent.id) {
            let best = index
                .rows_for_agent(agent_idx)
                .map(|row| dot(row, &query))
                .fold(None::<f32>, |acc, score| {
                    Some(acc.map_or(score, |a| a.max(score)))
                });
            if let Some(best) = best {
                return Ok(best);
            }
        }

        // Agent absent from the index (e.g. added since the last build):
        // embed its examples on demand.
        let example_vectors = self.embedder.embed(&routing.examples).await?;
        Ok(example_vectors
            .iter()
            .map(|row| dot(row, &query))
            .fold(0.0f32, f32::max))
    }
}

fn priority_of(agent: &Agent) -> u32 {
    agent.routing.as_ref().map(|r| r.priority).unwrap_or(1)
}
