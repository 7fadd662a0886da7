//! Language model trait.
//!
//! One implementation per vendor. The provider chain owns an ordered list
//! of these and handles fallback; implementations make exactly one attempt
//! per call.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::Result;
use crate::types::TokenUsage;

/// A system + user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Prompt {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A prompt whose answer must be a JSON object matching `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPrompt {
    pub prompt: Prompt,
    /// Schema label, `^[a-zA-Z0-9_-]+$`.
    pub schema_name: String,
    /// Strict-mode JSON schema.
    pub schema: Value,
}

impl StructuredPrompt {
    pub fn new(prompt: Prompt, schema_name: impl Into<String>, schema: Value) -> Self {
        Self {
            prompt,
            schema_name: schema_name.into(),
            schema,
        }
    }
}

/// Output of one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput<T> {
    pub value: T,
    pub usage: TokenUsage,
}

/// One increment of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextDelta {
    pub text: String,
    /// Usage, when the vendor reports it on this event.
    pub usage: Option<TokenUsage>,
}

pub type TextDeltaStream = BoxStream<'static, Result<TextDelta>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider key, e.g. `openai`.
    fn provider(&self) -> &str;

    /// Model identifier sent to the vendor.
    fn model(&self) -> &str;

    /// Structured generation: returns the parsed JSON object.
    async fn generate_json(&self, prompt: &StructuredPrompt) -> Result<ModelOutput<Value>>;

    /// Plain text generation.
    async fn generate_text(&self, prompt: &Prompt) -> Result<ModelOutput<String>>;

    /// Streamed structured generation: raw text deltas of the JSON document.
    async fn stream_json(&self, prompt: &StructuredPrompt) -> Result<TextDeltaStream>;
}
