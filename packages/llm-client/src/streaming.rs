//! SSE streaming for chat completions.
//!
//! Both vendors speak server-sent events; they differ only in the JSON
//! carried on `data:` lines. `DeltaStream` does the line buffering and hands
//! each payload to a vendor-specific decoder.

use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::LlmError;
use crate::types::Usage;

/// One decoded event from a streaming completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    /// Text appended by this event (may be empty).
    pub text: String,
    /// Usage reported by this event, if any.
    pub usage: Option<Usage>,
    /// The vendor signalled the end of the message.
    pub done: bool,
}

impl StreamDelta {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    fn usage(usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..Default::default()
        }
    }

    fn done() -> Self {
        Self {
            done: true,
            ..Default::default()
        }
    }
}

type Decoder = fn(&str) -> Option<Result<StreamDelta, LlmError>>;

/// Stream adapter from raw SSE bytes to `StreamDelta` values.
pub struct DeltaStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    decode: Decoder,
}

impl DeltaStream {
    pub(crate) fn openai(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self::with_decoder(byte_stream, decode_openai)
    }

    pub(crate) fn anthropic(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self::with_decoder(byte_stream, decode_anthropic)
    }

    fn with_decoder(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
        decode: Decoder,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: String::new(),
            decode,
        }
    }
}

impl Stream for DeltaStream {
    type Item = Result<StreamDelta, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(delta) = next_event(&mut this.buffer, this.decode) {
                return Poll::Ready(Some(delta));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => this.buffer.push_str(text),
                    Err(e) => {
                        return Poll::Ready(Some(Err(LlmError::Parse(format!(
                            "Invalid UTF-8 in stream: {}",
                            e
                        )))));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(LlmError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    // Flush a trailing line that arrived without its newline.
                    if !this.buffer.trim().is_empty() {
                        this.buffer.push('\n');
                        if let Some(delta) = next_event(&mut this.buffer, this.decode) {
                            return Poll::Ready(Some(delta));
                        }
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Pop complete lines off the buffer until one decodes to an event.
fn next_event(buffer: &mut String, decode: Decoder) -> Option<Result<StreamDelta, LlmError>> {
    loop {
        let newline_pos = buffer.find('\n')?;
        let line = buffer[..newline_pos].trim().to_string();
        buffer.drain(..=newline_pos);

        // `event:`, `id:`, `retry:` and blank separators carry nothing we need
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        if let Some(event) = decode(data.trim()) {
            return Some(event);
        }
    }
}

fn parse_error(e: serde_json::Error, data: &str) -> LlmError {
    LlmError::Parse(format!(
        "Failed to parse stream chunk: {} (data: {})",
        e,
        crate::types::truncate_to_char_boundary(data, 200)
    ))
}

// -----------------------------------------------------------------------------
// OpenAI
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct OpenAiChunkChoice {
    delta: OpenAiDelta,
}

#[derive(Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

fn decode_openai(data: &str) -> Option<Result<StreamDelta, LlmError>> {
    if data == "[DONE]" {
        return Some(Ok(StreamDelta::done()));
    }
    let chunk: OpenAiChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(parse_error(e, data))),
    };
    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();

    Some(Ok(StreamDelta {
        text,
        usage: chunk.usage,
        done: false,
    }))
}

// -----------------------------------------------------------------------------
// Anthropic
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    MessageStart { message: AnthropicStartMessage },
    ContentBlockDelta { delta: AnthropicBlockDelta },
    MessageDelta {
        #[serde(default)]
        usage: Usage,
    },
    MessageStop,
    Error { error: AnthropicErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicStartMessage {
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct AnthropicBlockDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

fn decode_anthropic(data: &str) -> Option<Result<StreamDelta, LlmError>> {
    let event: AnthropicEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => return Some(Err(parse_error(e, data))),
    };
    match event {
        AnthropicEvent::MessageStart { message } => Some(Ok(StreamDelta::usage(message.usage))),
        AnthropicEvent::ContentBlockDelta { delta } => {
            delta.text.map(|text| Ok(StreamDelta::text(text)))
        }
        AnthropicEvent::MessageDelta { usage } => Some(Ok(StreamDelta::usage(usage))),
        AnthropicEvent::MessageStop => Some(Ok(StreamDelta::done())),
        AnthropicEvent::Error { error } => Some(Err(LlmError::Api {
            status: 500,
            message: format!("{}: {}", error.kind, error.message),
        })),
        AnthropicEvent::Other => None,
    }
}
