//! Typed errors for the answering pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Recoverable
//! conditions (classifier failure, trace write failure, a single provider
//! failing) are handled inside the pipeline and never surface here.

use thiserror::Error;

/// Errors that can escape a pipeline operation.
#[derive(Debug, Error)]
pub enum TattvaError {
    /// Category id outside 1..=45
    #[error("unknown category id: {0}")]
    UnknownCategory(i64),

    /// Query embedding could not be generated
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector search failed
    #[error("vector search error: {0}")]
    VectorSearch(String),

    /// A single provider call failed
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// Every provider in the chain failed
    #[error("all providers failed: {}", describe_attempts(.attempts))]
    AllProvidersFailed { attempts: Vec<ProviderFailure> },

    /// Model output did not match the requested shape
    #[error("output did not match schema: {0}")]
    Schema(String),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TattvaError {
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(e))
    }
}

/// One failed attempt in a provider fallback chain.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub model: String,
    pub message: String,
}

fn describe_attempts(attempts: &[ProviderFailure]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({}): {}", a.provider, a.model, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, TattvaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_error_lists_every_attempt() {
        let err = TattvaError::AllProvidersFailed {
            attempts: vec![
                ProviderFailure {
                    provider: "openai".into(),
                    model: "gpt-4o".into(),
                    message: "rate limited".into(),
                },
                ProviderFailure {
                    provider: "anthropic".into(),
                    model: "claude-3-haiku-20240307".into(),
                    message: "overloaded".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("openai (gpt-4o): rate limited"));
        assert!(msg.contains("anthropic (claude-3-haiku-20240307): overloaded"));
    }

    #[test]
    fn test_empty_chain_message() {
        let err = TattvaError::AllProvidersFailed { attempts: vec![] };
        assert_eq!(err.to_string(), "all providers failed: no providers configured");
    }
}
