//! Grounded question answering over the Valmiki Ramayana.
//!
//! Every question is classified into one of 45 fixed categories, each
//! locked to an answer template (textual, interpretive or refusal).
//! Answers are generated only from retrieved verses, checked against the
//! template's constraints and traced.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tattva::{AnswerEngine, AnswerRequest, ProviderChain, Retriever, TraceRecorder};
//! use tattva::stores::{JsonlTraceStore, MemoryVectorIndex};
//! use tattva::testing::{MockEmbedder, MockLanguageModel};
//!
//! let chain = ProviderChain::new(vec![Arc::new(MockLanguageModel::new("openai", "gpt-4o"))]);
//! let retriever = Retriever::new(Arc::new(MockEmbedder::new()), Arc::new(MemoryVectorIndex::new()));
//! let engine = AnswerEngine::new(chain, retriever, TraceRecorder::new(Arc::new(JsonlTraceStore::default())));
//!
//! let outcome = engine.answer(AnswerRequest::new("Who is Jatayu?")).await?;
//! println!("{}", serde_json::to_string_pretty(&outcome.full_response)?);
//! ```
//!
//! # Modules
//!
//! - [`registry`] - the static category and retrieval-config tables
//! - [`types`] - answers, classifications, retrieval results, traces
//! - [`traits`] - seams for language models, embeddings, vector search and trace storage
//! - [`pipeline`] - the answering stages and the [`AnswerEngine`]
//! - [`stores`] - vector index and trace store implementations
//! - [`testing`] - mocks and fixtures

pub mod error;
pub mod pipeline;
pub mod registry;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "providers")]
pub mod ai;

pub use error::{ProviderFailure, Result, TattvaError};
pub use traits::{
    Embedder, LanguageModel, ModelOutput, Prompt, StructuredPrompt, TextDelta, TextDeltaStream,
    TraceStore, VectorIndex, VectorQuery,
};
pub use types::{
    Answer, Category, CategoryGroup, CategoryId, ClassificationResult, ClassifierSource,
    Generated, InterpretiveAnswer, PassageMetadata, QuestionIntent, RefusalAnswer,
    RetrievalConfig, RetrievalResult, RetrievedPassage, SearchFilter, StructuralFilter,
    TemplateType, TextualAnswer, TextualBasis, TokenUsage, Trace,
};

pub use pipeline::{
    AnswerEngine, AnswerEvent, AnswerOutcome, AnswerRequest, AnswerStream, Classifier,
    EngineConfig, ProviderChain, Retriever, TraceRecorder, ValidationPolicy, ValidationReport,
};

pub use stores::{JsonlTraceStore, MemoryTraceStore, MemoryVectorIndex, PineconeIndex};

#[cfg(feature = "postgres")]
pub use stores::PostgresTraceStore;
