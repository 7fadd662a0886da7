//! Server dependencies, constructed once at startup and injected into the
//! router through [`AppState`](crate::server::AppState).

use anyhow::{Context, Result};
use llm_client::{AnthropicClient, OpenAIClient};
use std::sync::Arc;
use tattva::ai::{AnthropicModel, OpenAiEmbedder, OpenAiModel};
use tattva::pipeline::QueryExpander;
use tattva::stores::{JsonlTraceStore, MemoryVectorIndex, PineconeIndex, PostgresTraceStore};
use tattva::{
    AnswerEngine, EngineConfig, LanguageModel, ProviderChain, Retriever,
    TraceRecorder, TraceStore, VectorIndex,
};

use crate::config::{Config, TraceBackend, VectorBackend};

/// Provider chain in default order: OpenAI first, Anthropic when a key
/// is configured.
pub fn build_provider_chain(config: &Config) -> ProviderChain {
    let mut providers: Vec<Arc<dyn LanguageModel>> = vec![Arc::new(OpenAiModel::new(
        OpenAIClient::new(&config.openai_api_key),
        &config.openai_model,
    ))];

    if let Some(key) = &config.anthropic_api_key {
        providers.push(Arc::new(AnthropicModel::new(
            AnthropicClient::new(key),
            &config.anthropic_model,
        )));
    } else {
        tracing::info!("ANTHROPIC_API_KEY not set, running with OpenAI only");
    }

    ProviderChain::new(providers)
}

async fn build_index(backend: &VectorBackend) -> Result<Arc<dyn VectorIndex>> {
    Ok(match backend {
        VectorBackend::Pinecone { api_key, host } => {
            tracing::info!(host = %host, "Using Pinecone vector index");
            Arc::new(PineconeIndex::new(host, api_key))
        }
        VectorBackend::File(path) => {
            let index = MemoryVectorIndex::from_json_file(path)
                .await
                .with_context(|| format!("Failed to load corpus index from {}", path.display()))?;
            tracing::info!(path = %path.display(), passages = index.len(), "Loaded in-memory vector index");
            Arc::new(index)
        }
    })
}

async fn build_trace_store(backend: &TraceBackend) -> Result<Arc<dyn TraceStore>> {
    Ok(match backend {
        TraceBackend::Jsonl(path) => {
            tracing::info!(path = %path.display(), "Writing traces to JSONL");
            Arc::new(JsonlTraceStore::new(path))
        }
        TraceBackend::Postgres(url) => {
            tracing::info!("Writing traces to Postgres");
            Arc::new(
                PostgresTraceStore::new(url)
                    .await
                    .context("Failed to connect trace database")?,
            )
        }
    })
}

/// Build the answer engine from configuration.
pub async fn build_engine(config: &Config) -> Result<AnswerEngine> {
    let chain = build_provider_chain(config);

    let embedder = OpenAiEmbedder::new(OpenAIClient::new(&config.openai_api_key))
        .with_model(&config.embedding_model);
    let mut retriever = Retriever::new(Arc::new(embedder), build_index(&config.vector_backend).await?);
    if config.query_expansion {
        retriever = retriever.with_expansion(QueryExpander::new(chain.clone()));
    }

    let recorder = TraceRecorder::new(build_trace_store(&config.trace_backend).await?);

    Ok(AnswerEngine::new(chain, retriever, recorder).with_config(EngineConfig {
        validation_policy: config.validation_policy,
        default_provider: config.default_provider.clone(),
    }))
}
