//! In-memory implementations for local runs and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::RwLock;

use crate::error::{Result, TattvaError};
use crate::traits::{cosine_similarity, TraceStore, VectorIndex, VectorQuery};
use crate::types::{PassageMetadata, RetrievedPassage, Trace};

/// One corpus entry with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexedPassage {
    pub id: String,
    #[serde(alias = "values")]
    pub vector: Vec<f32>,
    pub metadata: PassageMetadata,
}

/// Brute-force cosine search over an in-process corpus.
///
/// The corpus must have been embedded with the same model the pipeline
/// uses for queries.
#[derive(Debug, Default)]
pub struct MemoryVectorIndex {
    entries: Vec<IndexedPassage>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<IndexedPassage>) -> Self {
        Self { entries }
    }

    /// Load a JSON array of `{id, vector|values, metadata}` records.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await.map_err(|e| {
            TattvaError::Config(format!("failed to read corpus index {}: {}", path.display(), e))
        })?;
        let entries: Vec<IndexedPassage> = serde_json::from_slice(&raw)?;
        tracing::info!(path = %path.display(), passages = entries.len(), "Loaded in-memory corpus index");
        Ok(Self::from_entries(entries))
    }

    pub fn with_entry(
        mut self,
        id: impl Into<String>,
        vector: Vec<f32>,
        metadata: PassageMetadata,
    ) -> Self {
        self.entries.push(IndexedPassage {
            id: id.into(),
            vector,
            metadata,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<RetrievedPassage>> {
        let mut hits: Vec<RetrievedPassage> = self
            .entries
            .iter()
            .filter(|e| query.filter.matches(&e.metadata))
            .map(|e| RetrievedPassage {
                id: e.id.clone(),
                score: cosine_similarity(&query.vector, &e.vector),
                metadata: e.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.top_k);
        Ok(hits)
    }
}

/// Trace store that keeps every record in memory.
pub struct MemoryTraceStore {
    traces: RwLock<Vec<Trace>>,
}

impl Default for MemoryTraceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self {
            traces: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of stored traces, oldest first.
    pub fn traces(&self) -> Vec<Trace> {
        self.traces.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.traces.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TraceStore for MemoryTraceStore {
    async fn save(&self, trace: &Trace) -> Result<()> {
        self.traces.write().unwrap().push(trace.clone());
        Ok(())
    }
}
