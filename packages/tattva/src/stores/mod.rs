//! Vector index and trace store implementations.

pub mod jsonl;
pub mod memory;
pub mod pinecone;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use jsonl::JsonlTraceStore;
pub use memory::{IndexedPassage, MemoryTraceStore, MemoryVectorIndex};
pub use pinecone::PineconeIndex;

#[cfg(feature = "postgres")]
pub use postgres::PostgresTraceStore;
