//! Vendor implementations of the model traits, built on `llm-client`.
//!
//! Each handle makes exactly one attempt per call; fallback between
//! vendors is the provider chain's job.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicModel;
pub use openai::{OpenAiEmbedder, OpenAiModel};

use futures::StreamExt;
use llm_client::{ChatRequest, DeltaStream, Message, Usage};
use serde_json::Value;

use crate::error::{Result, TattvaError};
use crate::traits::{Prompt, TextDelta, TextDeltaStream};
use crate::types::TokenUsage;

fn token_usage(usage: Usage) -> TokenUsage {
    TokenUsage::new(usage.input_tokens, usage.output_tokens)
}

fn chat_request(model: &str, prompt: &Prompt, system: Option<String>) -> ChatRequest {
    let mut request = ChatRequest::new(model);
    if let Some(system) = system.or_else(|| prompt.system.clone()) {
        request = request.message(Message::system(system));
    }
    request = request.message(Message::user(prompt.user.as_str()));
    if let Some(t) = prompt.temperature {
        request = request.temperature(t);
    }
    if let Some(max) = prompt.max_tokens {
        request = request.max_tokens(max);
    }
    request
}

fn text_deltas(provider: &'static str, stream: DeltaStream) -> TextDeltaStream {
    stream
        .map(move |item| {
            item.map(|delta| TextDelta {
                text: delta.text,
                usage: delta.usage.map(token_usage),
            })
            .map_err(|e| TattvaError::provider(provider, e))
        })
        .boxed()
}

/// Parse a model reply that must be a single JSON object.
fn parse_object(provider: &str, content: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(llm_client::strip_code_blocks(content))
        .map_err(|e| TattvaError::provider(provider, format!("reply is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(TattvaError::provider(provider, "reply is not a JSON object"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_strips_fences() {
        let value = parse_object("anthropic", "```json\n{\"why\": \"scope\"}\n```").unwrap();
        assert_eq!(value["why"], "scope");
        assert!(parse_object("anthropic", "[1, 2]").is_err());
        assert!(parse_object("anthropic", "Here you go").is_err());
    }

    #[test]
    fn test_chat_request_carries_prompt_settings() {
        let prompt = Prompt::new("Who is Jatayu?")
            .with_system("Answer from the text.")
            .with_temperature(0.1)
            .with_max_tokens(100);
        let request = chat_request("gpt-4o", &prompt, None);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.system_text().as_deref(), Some("Answer from the text."));
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(100));
    }
}
