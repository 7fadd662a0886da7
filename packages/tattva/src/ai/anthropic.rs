//! Anthropic chat model.
//!
//! The messages API has no schema-constrained output mode, so the strict
//! schema is appended to the system prompt and the reply parsed as JSON.

use async_trait::async_trait;
use llm_client::{strict_schema_from, AnthropicClient, LlmError};
use serde_json::Value;

use super::{chat_request, parse_object, text_deltas, token_usage};
use crate::error::{Result, TattvaError};
use crate::traits::{LanguageModel, ModelOutput, Prompt, StructuredPrompt, TextDeltaStream};

pub const PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

fn provider_error(e: LlmError) -> TattvaError {
    TattvaError::provider(PROVIDER, e)
}

#[derive(Clone)]
pub struct AnthropicModel {
    client: AnthropicClient,
    model: String,
}

impl AnthropicModel {
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Client from `ANTHROPIC_API_KEY`, default model.
    pub fn from_env() -> Result<Self> {
        let client = AnthropicClient::from_env().map_err(|e| TattvaError::Config(e.to_string()))?;
        Ok(Self::new(client, DEFAULT_MODEL))
    }
}

/// System prompt for a structured call: the caller's system text followed
/// by the output contract.
fn structured_system(prompt: &StructuredPrompt) -> String {
    let schema = strict_schema_from(prompt.schema.clone());
    let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_default();
    let contract = format!(
        "Respond with a single JSON object that conforms to the `{}` schema below. \
         Output only the JSON object: no prose, no markdown fences.\n\n{}",
        prompt.schema_name, schema_text
    );
    match &prompt.prompt.system {
        Some(system) => format!("{}\n\n{}", system, contract),
        None => contract,
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, prompt: &StructuredPrompt) -> Result<ModelOutput<Value>> {
        let request = chat_request(&self.model, &prompt.prompt, Some(structured_system(prompt)));
        let response = self
            .client
            .chat_completion(&request)
            .await
            .map_err(provider_error)?;
        Ok(ModelOutput {
            value: parse_object(PROVIDER, &response.content)?,
            usage: token_usage(response.usage),
        })
    }

    async fn generate_text(&self, prompt: &Prompt) -> Result<ModelOutput<String>> {
        let response = self
            .client
            .chat_completion(&chat_request(&self.model, prompt, None))
            .await
            .map_err(provider_error)?;
        Ok(ModelOutput {
            value: response.content,
            usage: token_usage(response.usage),
        })
    }

    async fn stream_json(&self, prompt: &StructuredPrompt) -> Result<TextDeltaStream> {
        let request = chat_request(&self.model, &prompt.prompt, Some(structured_system(prompt)));
        let stream = self
            .client
            .chat_completion_stream(&request)
            .await
            .map_err(provider_error)?;
        Ok(text_deltas(PROVIDER, stream))
    }
}
