//! OpenAI chat completions, structured outputs and embeddings.

use reqwest::{header, Client, Response};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::streaming::DeltaStream;
use crate::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, OpenAiChatResponse,
    StructuredRequest,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI REST client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path, "OpenAI request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, path, "OpenAI API error");
            return Err(LlmError::api(status, error_text));
        }
        Ok(response)
    }

    async fn first_message(response: Response) -> Result<ChatResponse> {
        let raw: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let message = raw
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::Parse("No choices in OpenAI response".into()))?;

        if let Some(refusal) = message.refusal {
            return Err(LlmError::Parse(format!("Model refused: {}", refusal)));
        }

        Ok(ChatResponse {
            content: message.content.unwrap_or_default(),
            usage: raw.usage.unwrap_or_default(),
        })
    }

    /// Chat completion.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let response = self.post("/chat/completions", request).await?;
        let chat = Self::first_message(response).await?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            output_tokens = chat.usage.output_tokens,
            "OpenAI chat completion"
        );
        Ok(chat)
    }

    /// Streaming chat completion. Usage arrives in a final chunk with no
    /// choices (`stream_options.include_usage`).
    pub async fn chat_completion_stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| LlmError::Parse(format!("Failed to serialize request: {}", e)))?;
        body["stream"] = serde_json::Value::Bool(true);
        body["stream_options"] = serde_json::json!({ "include_usage": true });

        let response = self.post("/chat/completions", &body).await?;
        Ok(DeltaStream::openai(response.bytes_stream()))
    }

    /// Structured output with a strict JSON schema. Returns the raw JSON
    /// text and usage.
    pub async fn structured_output(&self, request: &StructuredRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let response = self.post("/chat/completions", request).await?;
        let chat = Self::first_message(response).await?;

        debug!(
            model = %request.model,
            schema = %request.response_format.json_schema.name,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI structured output"
        );
        Ok(chat)
    }

    /// Streaming structured output. Deltas carry fragments of the JSON
    /// document; usage arrives on the final chunk.
    pub async fn structured_output_stream(&self, request: &StructuredRequest) -> Result<DeltaStream> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| LlmError::Parse(format!("Failed to serialize request: {}", e)))?;
        body["stream"] = serde_json::Value::Bool(true);
        body["stream_options"] = serde_json::json!({ "include_usage": true });

        let response = self.post("/chat/completions", &body).await?;
        Ok(DeltaStream::openai(response.bytes_stream()))
    }

    /// Create an embedding. `dimensions` is only honored by the
    /// `text-embedding-3-*` family.
    pub async fn create_embedding(
        &self,
        text: &str,
        model: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model,
            input: text,
            dimensions,
        };
        let response = self.post("/embeddings", &request).await?;

        let embed_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::Parse("No embedding in OpenAI response".into()))
    }
}
