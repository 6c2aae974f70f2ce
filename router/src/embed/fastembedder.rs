//! fastembed-backed embedder: local sentence-embedding models, loaded once
//! at startup and shared for the process lifetime.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{l2_normalize, EmbedError, Embedder};

/// Embedder backed by a local fastembed model.
///
/// Inference is synchronous ONNX execution, so calls run on the blocking
/// pool. The model handle is guarded by a mutex; embedding batches are
/// small (routing examples and single queries), so contention is not a
/// concern.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Loads the named model (downloading it on first use) and probes its
    /// output dimension.
    pub fn load(model_name: &str) -> Result<FastEmbedder, EmbedError> {
        tracing::info!("loading embedding model: {}", model_name);
        let model_kind = resolve_model(model_name);
        let model =
            TextEmbedding::try_new(InitOptions::new(model_kind).with_show_download_progress(false))
                .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
        let model = Arc::new(Mutex::new(model));
        let probe = {
            let mut guard = model.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .embed(vec!["dimension probe".to_string()], None)
                .map_err(|e| EmbedError::ModelLoad(e.to_string()))?
        };
        let dimension = probe.first().map(Vec::len).ok_or_else(|| {
            EmbedError::ModelLoad("model returned no vector for probe input".to_string())
        })?;
        tracing::info!("embedding model loaded (dimension={})", dimension);
        Ok(FastEmbedder {
            model,
            model_name: model_name.to_string(),
            dimension,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Maps a configured model name onto a fastembed model. Unknown names fall
/// back to all-MiniLM-L6-v2 with a warning rather than failing startup.
fn resolve_model(name: &str) -> EmbeddingModel {
    let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-minilm-l6-v2-q" => EmbeddingModel::AllMiniLML6V2Q,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
        other => {
            tracing::warn!(
                "unknown embedding model {:?}, falling back to all-MiniLM-L6-v2",
                other
            );
            EmbeddingModel::AllMiniLML6V2
        }
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let batch: Vec<String> = texts.to_vec();
        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().unwrap_or_else(|e| e.into_inner());
            guard.embed(batch, None)
        })
        .await
        .map_err(|e| EmbedError::Embedding(e.to_string()))?
        .map_err(|e| EmbedError::Embedding(e.to_string()))?;
        Ok(vectors.into_iter().map(l2_normalize).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
