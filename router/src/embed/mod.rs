//! Text embedding: the `Embedder` seam and the fastembed-backed default.

mod embedder;
mod fastembedder;

pub use embedder::{EmbedError, Embedder};
pub use fastembedder::FastEmbedder;

/// Scales a vector to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// Dot product of two equal-length vectors. With unit-norm inputs this is
/// the cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
