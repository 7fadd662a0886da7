//! Pure REST clients for hosted LLM vendors.
//!
//! No domain logic lives here: chat completions, streaming, structured
//! outputs and embeddings, with token usage normalized across vendors.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_client::{ChatRequest, Message, OpenAIClient};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client
//!     .chat_completion(&ChatRequest::new("gpt-4o").message(Message::user("Hello!")))
//!     .await?;
//! println!("{} ({} tokens)", response.content, response.usage.total());
//!
//! let embedding = client
//!     .create_embedding("Hanuman leaps to Lanka", "text-embedding-3-small", Some(1536))
//!     .await?;
//! ```

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod schema;
pub mod streaming;
pub mod types;

pub use anthropic::AnthropicClient;
pub use error::{LlmError, Result};
pub use openai::OpenAIClient;
pub use schema::strict_schema_from;
pub use streaming::{DeltaStream, StreamDelta};
pub use types::*;
