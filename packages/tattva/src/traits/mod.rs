//! Trait seams for external collaborators: LLM vendors, the embedding
//! model, the vector index and the trace sink.

pub mod embedder;
pub mod index;
pub mod llm;
pub mod trace_store;

pub use embedder::Embedder;
pub use index::{cosine_similarity, VectorIndex, VectorQuery};
pub use llm::{
    LanguageModel, ModelOutput, Prompt, StructuredPrompt, TextDelta, TextDeltaStream,
};
pub use trace_store::TraceStore;
