//! Anthropic Messages API client.
//!
//! There is no schema-constrained response mode, so structured generation
//! is done by the caller: put the schema in the prompt and parse the text.

use reqwest::{header, Client, Response};
use tracing::{debug, warn};

use crate::error::{LlmError, Result};
use crate::streaming::DeltaStream;
use crate::types::{AnthropicRequest, AnthropicResponse, ChatRequest, ChatResponse};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic REST client.
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::Config("ANTHROPIC_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wire_request(request: &ChatRequest, stream: bool) -> AnthropicRequest<'_> {
        AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system_text(),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != "system")
                .collect(),
            temperature: request.temperature,
            stream,
        }
    }

    async fn post(&self, body: &AnthropicRequest<'_>) -> Result<Response> {
        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Anthropic API error");
            return Err(LlmError::api(status, error_text));
        }
        Ok(response)
    }

    /// Non-streaming message. Text blocks are concatenated.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let response = self.post(&Self::wire_request(request, false)).await?;

        let raw: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content: String = raw
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if content.is_empty() {
            return Err(LlmError::Parse("No text content in Anthropic response".into()));
        }

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            output_tokens = raw.usage.output_tokens,
            "Anthropic message"
        );

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }

    /// Streaming message.
    pub async fn chat_completion_stream(&self, request: &ChatRequest) -> Result<DeltaStream> {
        let response = self.post(&Self::wire_request(request, true)).await?;
        Ok(DeltaStream::anthropic(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn test_wire_request_lifts_system_prompt() {
        let request = ChatRequest::new("claude-3-haiku-20240307")
            .message(Message::system("Answer only from the passages."))
            .message(Message::user("Who is Jatayu?"));

        let wire = AnthropicClient::wire_request(&request, true);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["system"], "Answer only from the passages.");
        assert_eq!(json["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(json["stream"], true);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_stream_flag_omitted_when_false() {
        let request = ChatRequest::new("claude-3-haiku-20240307").message(Message::user("hi"));
        let json = serde_json::to_value(AnthropicClient::wire_request(&request, false)).unwrap();
        assert!(json.get("stream").is_none());
        assert!(json.get("system").is_none());
    }
}
