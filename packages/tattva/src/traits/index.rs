//! Vector search over the verse corpus.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RetrievedPassage, SearchFilter};

/// A filtered top-K query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: SearchFilter,
}

/// Opaque nearest-neighbor service (cosine metric).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Best matches first, at most `query.top_k`.
    async fn query(&self, query: &VectorQuery) -> Result<Vec<RetrievedPassage>>;
}

/// Cosine similarity of two vectors; `0.0` for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
