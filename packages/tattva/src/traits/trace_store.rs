use async_trait::async_trait;

use crate::error::Result;
use crate::types::Trace;

/// Append-only trace sink. Never read back by the pipeline.
#[async_trait]
pub trait TraceStore: Send + Sync {
    async fn save(&self, trace: &Trace) -> Result<()>;
}
