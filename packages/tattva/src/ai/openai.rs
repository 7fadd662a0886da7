//! OpenAI chat model and embeddings.

use async_trait::async_trait;
use llm_client::{
    strict_schema_from, JsonSchemaFormat, LlmError, Message, OpenAIClient, ResponseFormat,
    StructuredRequest,
};
use serde_json::Value;

use super::{chat_request, parse_object, text_deltas, token_usage};
use crate::error::{Result, TattvaError};
use crate::traits::{
    Embedder, LanguageModel, ModelOutput, Prompt, StructuredPrompt, TextDeltaStream,
};

pub const PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const EMBEDDING_DIMENSIONS: u32 = 1536;

fn provider_error(e: LlmError) -> TattvaError {
    TattvaError::provider(PROVIDER, e)
}

/// GPT chat model with strict `json_schema` structured outputs.
#[derive(Clone)]
pub struct OpenAiModel {
    client: OpenAIClient,
    model: String,
}

impl OpenAiModel {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Client from `OPENAI_API_KEY`, default model.
    pub fn from_env() -> Result<Self> {
        let client = OpenAIClient::from_env().map_err(|e| TattvaError::Config(e.to_string()))?;
        Ok(Self::new(client, DEFAULT_MODEL))
    }

    fn structured_request(&self, prompt: &StructuredPrompt) -> StructuredRequest {
        let mut messages = Vec::new();
        if let Some(system) = &prompt.prompt.system {
            messages.push(Message::system(system.as_str()));
        }
        messages.push(Message::user(prompt.prompt.user.as_str()));

        StructuredRequest {
            model: self.model.clone(),
            messages,
            temperature: prompt.prompt.temperature,
            max_tokens: prompt.prompt.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: prompt.schema_name.clone(),
                    strict: true,
                    schema: strict_schema_from(prompt.schema.clone()),
                },
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, prompt: &StructuredPrompt) -> Result<ModelOutput<Value>> {
        let response = self
            .client
            .structured_output(&self.structured_request(prompt))
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
        let stream = self
            .client
            .structured_output_stream(&self.structured_request(prompt))
            .await
            .map_err(provider_error)?;
        Ok(text_deltas(PROVIDER, stream))
    }
}

/// `text-embedding-3-small` query embeddings.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: OpenAIClient,
    model: String,
    dimensions: Option<u32>,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: Some(EMBEDDING_DIMENSIONS),
        }
    }

    /// Other models may not accept a `dimensions` parameter; it is dropped.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if !self.model.starts_with("text-embedding-3") {
            self.dimensions = None;
        }
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .create_embedding(text, &self.model, self.dimensions)
            .await
            .map_err(|e| TattvaError::Embedding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_request_uses_strict_schema() {
        let model = OpenAiModel::new(OpenAIClient::new("sk-test"), "gpt-4o");
        let prompt = StructuredPrompt::new(
            Prompt::new("Who is Jatayu?").with_temperature(0.5),
            "textual_answer",
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "properties": {"answer": {"type": "string"}}
            }),
        );

        let request = model.structured_request(&prompt);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["response_format"]["json_schema"]["name"], "textual_answer");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        let schema = &body["response_format"]["json_schema"]["schema"];
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_embedder_drops_dimensions_for_older_models() {
        let embedder = OpenAiEmbedder::new(OpenAIClient::new("sk-test"));
        assert_eq!(embedder.dimensions, Some(1536));

        let legacy = embedder.with_model("text-embedding-ada-002");
        assert_eq!(legacy.dimensions, None);
    }
}
