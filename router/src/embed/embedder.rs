//! Embedder trait: text in, fixed-dimension L2-normalized vectors out.
//!
//! Implementations can wrap local fastembed models or mocks for tests.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding model load failed: {0}")]
    ModelLoad(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// Produces fixed-size unit-norm float vectors from text. The semantic
/// matcher scores with plain dot products, so implementations must return
/// L2-normalized vectors.
///
/// Implementations must be `Send + Sync`; they are shared behind an `Arc`
/// by the matcher and the reloader.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text into a vector of dimension [`Embedder::dimension`].
    /// Returns one vector per input text in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Vector dimension returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;
}
