use async_trait::async_trait;

use crate::error::Result;

/// Query embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    /// Fixed-dimension embedding for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
