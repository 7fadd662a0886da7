//! Context retrieval: optional query expansion, embedding, filtered
//! nearest-neighbor search.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::generate::ProviderChain;
use super::prompts::expansion_prompt;
use crate::error::Result;
use crate::registry;
use crate::traits::{Embedder, VectorIndex, VectorQuery};
use crate::types::{CategoryId, RetrievalResult, SearchFilter, StructuralFilter};

/// Warning attached when a category retrieves nothing by design.
pub const NO_RETRIEVAL_WARNING: &str = "No retrieval needed for this category";

/// Rewrites questions into the corpus vocabulary before embedding.
#[derive(Clone)]
pub struct QueryExpander {
    chain: ProviderChain,
}

impl QueryExpander {
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    /// Expanded query, or the original question if expansion fails.
    pub async fn expand(&self, question: &str) -> String {
        match self.chain.generate_text(&expansion_prompt(question), None).await {
            Ok(generated) => {
                let expanded = generated.value.trim();
                if expanded.is_empty() {
                    return question.to_string();
                }
                info!(original = question, expanded, "Query expanded");
                expanded.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Query expansion failed, using original query");
                question.to_string()
            }
        }
    }
}

/// Retrieves passages for a classified question.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    expander: Option<QueryExpander>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            expander: None,
        }
    }

    /// Enable query expansion before embedding.
    pub fn with_expansion(mut self, expander: QueryExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Retrieve passages under the category's retrieval config.
    ///
    /// Categories with `top_k == 0` short-circuit without an embedding
    /// call. Embedding and search errors propagate: an empty result would
    /// be indistinguishable from a genuine lack of evidence.
    #[instrument(skip(self, structural), fields(category = %category_id))]
    pub async fn retrieve(
        &self,
        question: &str,
        category_id: CategoryId,
        structural: StructuralFilter,
    ) -> Result<RetrievalResult> {
        let config = registry::retrieval_config(category_id);
        if config.top_k == 0 {
            debug!("Category retrieves nothing");
            return Ok(RetrievalResult::empty(NO_RETRIEVAL_WARNING));
        }

        let start = Instant::now();
        let expanded = match &self.expander {
            Some(expander) => Some(expander.expand(question).await),
            None => None,
        };
        let query_text = expanded.as_deref().unwrap_or(question);

        let vector = self.embedder.embed(query_text).await?;
        let filter = SearchFilter::for_config(config, structural);
        debug!(
            top_k = config.top_k,
            granularity = ?config.granularity,
            filter = ?filter,
            "Querying vector index"
        );

        let passages = self
            .index
            .query(&VectorQuery {
                vector,
                top_k: config.top_k,
                filter,
            })
            .await?;

        let total = passages.len();
        let mut result = RetrievalResult {
            passages,
            total_retrieved: total,
            warning: None,
            expanded_query: expanded,
        };

        // Degraded data is reported, never dropped
        let missing_translation = result
            .passages
            .iter()
            .filter(|p| config.include_translation && !p.metadata.has_translation)
            .count();
        let missing_comments = result
            .passages
            .iter()
            .filter(|p| config.include_comments && !p.metadata.has_comments)
            .count();
        if missing_translation > 0 {
            result.push_warning(format!("{}/{} passages missing translation", missing_translation, total));
        } else if missing_comments > 0 {
            result.push_warning(format!("{}/{} passages missing comments", missing_comments, total));
        }

        info!(
            retrieved = total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieval complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TattvaError;
    use crate::testing::{passage, MockEmbedder, MockLanguageModel, MockVectorIndex};
    use crate::traits::LanguageModel;

    fn id(n: i64) -> CategoryId {
        CategoryId::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_refusal_category_skips_embedding() {
        let embedder = Arc::new(MockEmbedder::new());
        let index = Arc::new(MockVectorIndex::new());
        let retriever = Retriever::new(embedder.clone(), index.clone());

        let result = retriever
            .retrieve("Was Rama right?", CategoryId::REFUSAL, StructuralFilter::default())
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.warning.as_deref(), Some(NO_RETRIEVAL_WARNING));
        assert!(embedder.calls().is_empty());
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn test_filter_combines_config_and_structure() {
        let index = Arc::new(MockVectorIndex::new());
        let retriever = Retriever::new(Arc::new(MockEmbedder::new()), index.clone());

        retriever
            .retrieve(
                "Why does Rama grieve?",
                id(31),
                StructuralFilter {
                    kanda: Some("Aranya Kanda".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let query = &index.queries()[0];
        assert!(query.filter.require_translation);
        assert!(query.filter.require_comments);
        assert_eq!(query.filter.structural.kanda.as_deref(), Some("Aranya Kanda"));
        assert_eq!(query.top_k, registry::retrieval_config(id(31)).top_k);
    }

    /// Index that ignores metadata filters, like a service with stale metadata.
    struct UnfilteredIndex(Vec<crate::types::RetrievedPassage>);

    #[async_trait::async_trait]
    impl VectorIndex for UnfilteredIndex {
        async fn query(&self, _query: &VectorQuery) -> Result<Vec<crate::types::RetrievedPassage>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_missing_metadata_is_reported_not_dropped() {
        let mut no_translation = passage("Yuddha Kanda", 118, 1, "x");
        no_translation.metadata.has_translation = false;
        let mut no_comments = passage("Yuddha Kanda", 118, 2, "y");
        no_comments.metadata.has_comments = false;
        let index = UnfilteredIndex(vec![
            no_translation,
            no_comments,
            passage("Yuddha Kanda", 118, 3, "z"),
        ]);
        let retriever = Retriever::new(Arc::new(MockEmbedder::new()), Arc::new(index));

        // Category 42 requires both; translation is reported first
        let result = retriever
            .retrieve("How do commentators read the fire ordeal?", id(42), StructuralFilter::default())
            .await
            .unwrap();

        assert_eq!(result.total_retrieved, 3);
        assert_eq!(result.warning.as_deref(), Some("1/3 passages missing translation"));
    }

    #[tokio::test]
    async fn test_missing_comments_warning() {
        let mut no_comments = passage("Kishkindha Kanda", 18, 1, "x");
        no_comments.metadata.has_comments = false;
        let retriever = Retriever::new(
            Arc::new(MockEmbedder::new()),
            Arc::new(UnfilteredIndex(vec![no_comments, passage("Kishkindha Kanda", 18, 2, "y")])),
        );

        let result = retriever
            .retrieve("Was killing Vali a dilemma?", id(33), StructuralFilter::default())
            .await
            .unwrap();
        assert_eq!(result.warning.as_deref(), Some("1/2 passages missing comments"));
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let retriever = Retriever::new(
            Arc::new(MockEmbedder::new().failing()),
            Arc::new(MockVectorIndex::new()),
        );
        let err = retriever
            .retrieve("Who is Jatayu?", id(16), StructuralFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TattvaError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let retriever = Retriever::new(
            Arc::new(MockEmbedder::new()),
            Arc::new(MockVectorIndex::new().failing()),
        );
        let err = retriever
            .retrieve("Who is Jatayu?", id(16), StructuralFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TattvaError::VectorSearch(_)));
    }

    #[tokio::test]
    async fn test_expansion_is_embedded_and_echoed() {
        let embedder = Arc::new(MockEmbedder::new());
        let model = MockLanguageModel::new("openai", "gpt-4o")
            .with_text("Dadhimukha is the monkey guardian of Madhuvana, Sugriva's uncle.");
        let expander = QueryExpander::new(ProviderChain::new(vec![Arc::new(model) as Arc<dyn LanguageModel>]));
        let retriever = Retriever::new(embedder.clone(), Arc::new(MockVectorIndex::new()))
            .with_expansion(expander);

        let result = retriever
            .retrieve("Dadhimukha", id(16), StructuralFilter::default())
            .await
            .unwrap();

        assert_eq!(
            result.expanded_query.as_deref(),
            Some("Dadhimukha is the monkey guardian of Madhuvana, Sugriva's uncle.")
        );
        assert_eq!(embedder.calls(), vec![result.expanded_query.unwrap()]);
    }

    #[tokio::test]
    async fn test_expansion_failure_falls_back_to_question() {
        let expander = QueryExpander::new(ProviderChain::new(vec![
            Arc::new(MockLanguageModel::new("openai", "gpt-4o").failing("timeout")) as Arc<dyn LanguageModel>,
        ]));
        assert_eq!(expander.expand("Who is Jatayu?").await, "Who is Jatayu?");
    }
}
