//! Provider-fallback generation.
//!
//! Providers are tried strictly in sequence: the preferred provider first,
//! then the rest in default order. One attempt per provider per call. The
//! first success is returned with its provider attribution; if every
//! provider fails the caller gets an aggregate error listing each attempt.

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use super::partial_json::parse_partial;
use crate::error::{ProviderFailure, Result, TattvaError};
use crate::traits::{LanguageModel, Prompt, StructuredPrompt};
use crate::types::{cost_usd, Generated, TokenUsage};

/// Ordered set of injected model handles.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LanguageModel>>,
}

impl ProviderChain {
    /// Providers in default order.
    pub fn new(providers: Vec<Arc<dyn LanguageModel>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn providers(&self) -> &[Arc<dyn LanguageModel>] {
        &self.providers
    }

    /// Default order with `preferred` moved to the front. Unknown keys are
    /// ignored.
    pub fn ordered(&self, preferred: Option<&str>) -> Vec<Arc<dyn LanguageModel>> {
        let mut order = self.providers.clone();
        if let Some(key) = preferred {
            if let Some(pos) = order.iter().position(|p| p.provider() == key) {
                let chosen = order.remove(pos);
                order.insert(0, chosen);
            } else {
                debug!(preferred = key, "Preferred provider not configured, using default order");
            }
        }
        order
    }

    /// Structured generation deserialized into `T`. Output that does not
    /// deserialize counts as that provider failing.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &StructuredPrompt,
        preferred: Option<&str>,
    ) -> Result<Generated<T>> {
        self.generate_validated(prompt, preferred, |value| {
            serde_json::from_value::<T>(value).map_err(|e| TattvaError::Schema(e.to_string()))
        })
        .await
    }

    /// Structured generation with a caller-supplied acceptance check. An
    /// output rejected by `accept` counts as that provider failing and the
    /// chain moves on.
    pub async fn generate_validated<T, F>(
        &self,
        prompt: &StructuredPrompt,
        preferred: Option<&str>,
        accept: F,
    ) -> Result<Generated<T>>
    where
        F: Fn(Value) -> Result<T>,
    {
        let mut failures = Vec::new();

        for provider in self.ordered(preferred) {
            info!(provider = provider.provider(), model = provider.model(), "Trying provider");
            let attempt = provider
                .generate_json(prompt)
                .await
                .and_then(|out| Ok((accept(out.value)?, out.usage)));

            match attempt {
                Ok((value, usage)) => {
                    return Ok(attributed(provider.as_ref(), value, usage, failures));
                }
                Err(e) => {
                    warn!(provider = provider.provider(), error = %e, "Provider failed, falling back");
                    failures.push(failure(provider.as_ref(), &e));
                }
            }
        }

        error!(attempts = failures.len(), "All providers failed");
        Err(TattvaError::AllProvidersFailed { attempts: failures })
    }

    /// Structured generation returning the raw JSON object.
    pub async fn generate_json(
        &self,
        prompt: &StructuredPrompt,
        preferred: Option<&str>,
    ) -> Result<Generated<Value>> {
        self.generate_structured::<Value>(prompt, preferred).await
    }

    /// Plain text generation.
    pub async fn generate_text(
        &self,
        prompt: &Prompt,
        preferred: Option<&str>,
    ) -> Result<Generated<String>> {
        let mut failures = Vec::new();

        for provider in self.ordered(preferred) {
            info!(provider = provider.provider(), model = provider.model(), "Trying provider");
            match provider.generate_text(prompt).await {
                Ok(out) => return Ok(attributed(provider.as_ref(), out.value, out.usage, failures)),
                Err(e) => {
                    warn!(provider = provider.provider(), error = %e, "Provider failed, falling back");
                    failures.push(failure(provider.as_ref(), &e));
                }
            }
        }

        error!(attempts = failures.len(), "All providers failed");
        Err(TattvaError::AllProvidersFailed { attempts: failures })
    }

    /// Streamed structured generation.
    ///
    /// Returns immediately; a background task drives the providers. Fallback
    /// to the next provider happens only while nothing has been emitted.
    /// Dropping the returned stream cancels the in-flight provider call.
    pub fn stream_structured(
        &self,
        prompt: StructuredPrompt,
        preferred: Option<&str>,
    ) -> StructuredStream {
        let order = self.ordered(preferred);
        let (partial_tx, partial_rx) = mpsc::channel(PARTIAL_BUFFER);
        let (done_tx, done_rx) = oneshot::channel();
        let token = CancellationToken::new();

        let task_token = token.clone();
        tokio::spawn(async move {
            let outcome = drive_stream(order, prompt, partial_tx, task_token).await;
            if let Err(e) = &outcome {
                debug!(error = %e, "Structured stream ended with error");
            }
            // Receiver may already be gone
            let _ = done_tx.send(outcome);
        });

        StructuredStream {
            partials: partial_rx,
            completion: done_rx,
            _cancel_on_drop: token.drop_guard(),
        }
    }
}

const PARTIAL_BUFFER: usize = 64;

/// Incremental view of a streamed object.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PartialUpdate {
    /// Raw text appended by this delta.
    pub delta: String,
    /// Best-effort parse of everything received so far; `None` when it has
    /// not changed since the previous update.
    pub partial: Option<Value>,
}

/// Two-channel streaming result: ordered partial updates, then a single
/// terminal completion.
pub struct StructuredStream {
    partials: mpsc::Receiver<PartialUpdate>,
    completion: oneshot::Receiver<Result<Generated<Value>>>,
    _cancel_on_drop: DropGuard,
}

impl StructuredStream {
    /// Next partial update, `None` once generation has finished.
    pub async fn next_partial(&mut self) -> Option<PartialUpdate> {
        self.partials.recv().await
    }

    /// Wait for the terminal completion: the final object with usage, or
    /// the error that ended generation.
    pub async fn finish(mut self) -> Result<Generated<Value>> {
        // Drain so the producer is never blocked on a full channel
        while self.partials.recv().await.is_some() {}
        self.completion.await.unwrap_or(Err(TattvaError::Cancelled))
    }
}

async fn drive_stream(
    order: Vec<Arc<dyn LanguageModel>>,
    prompt: StructuredPrompt,
    partial_tx: mpsc::Sender<PartialUpdate>,
    token: CancellationToken,
) -> Result<Generated<Value>> {
    let mut failures = Vec::new();

    for provider in order {
        info!(provider = provider.provider(), model = provider.model(), "Trying provider (stream)");

        let started = tokio::select! {
            _ = token.cancelled() => return Err(TattvaError::Cancelled),
            started = provider.stream_json(&prompt) => started,
        };
        let mut deltas = match started {
            Ok(deltas) => deltas,
            Err(e) => {
                warn!(provider = provider.provider(), error = %e, "Provider failed to start stream, falling back");
                failures.push(failure(provider.as_ref(), &e));
                continue;
            }
        };

        let mut text = String::new();
        let mut usage = TokenUsage::default();
        let mut last_partial: Option<Value> = None;
        let mut emitted = false;
        let mut stream_error = None;

        loop {
            let next = tokio::select! {
                _ = token.cancelled() => {
                    info!(provider = provider.provider(), "Stream cancelled by consumer");
                    return Err(TattvaError::Cancelled);
                }
                next = deltas.next() => next,
            };
            match next {
                None => break,
                Some(Err(e)) => {
                    stream_error = Some(e);
                    break;
                }
                Some(Ok(delta)) => {
                    if let Some(u) = delta.usage {
                        merge_usage(&mut usage, u);
                    }
                    if delta.text.is_empty() {
                        continue;
                    }
                    text.push_str(&delta.text);

                    let parsed = parse_partial(&text);
                    let changed = parsed.is_some() && parsed != last_partial;
                    if changed {
                        last_partial = parsed.clone();
                    }
                    let update = PartialUpdate {
                        delta: delta.text,
                        partial: if changed { parsed } else { None },
                    };
                    if partial_tx.send(update).await.is_err() {
                        return Err(TattvaError::Cancelled);
                    }
                    emitted = true;
                }
            }
        }

        if let Some(e) = stream_error {
            if emitted {
                error!(provider = provider.provider(), error = %e, "Stream failed after output was emitted");
                return Err(e);
            }
            warn!(provider = provider.provider(), error = %e, "Stream failed before output, falling back");
            failures.push(failure(provider.as_ref(), &e));
            continue;
        }

        match parse_final(&text) {
            Ok(value) => return Ok(attributed(provider.as_ref(), value, usage, failures)),
            Err(e) if !emitted => {
                warn!(provider = provider.provider(), error = %e, "Empty stream, falling back");
                failures.push(failure(provider.as_ref(), &e));
            }
            Err(e) => return Err(e),
        }
    }

    error!(attempts = failures.len(), "All providers failed (stream)");
    Err(TattvaError::AllProvidersFailed { attempts: failures })
}

fn parse_final(text: &str) -> Result<Value> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if trimmed.is_empty() {
        return Err(TattvaError::Schema("stream produced no output".into()));
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| TattvaError::Schema(format!("stream output is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(TattvaError::Schema("stream output is not a JSON object".into()));
    }
    Ok(value)
}

fn merge_usage(total: &mut TokenUsage, reported: TokenUsage) {
    if reported.input_tokens > 0 {
        total.input_tokens = reported.input_tokens;
    }
    if reported.output_tokens > 0 {
        total.output_tokens = reported.output_tokens;
    }
}

fn failure(provider: &dyn LanguageModel, e: &TattvaError) -> ProviderFailure {
    ProviderFailure {
        provider: provider.provider().to_string(),
        model: provider.model().to_string(),
        message: e.to_string(),
    }
}

fn attributed<T>(
    provider: &dyn LanguageModel,
    value: T,
    usage: TokenUsage,
    failed_attempts: Vec<ProviderFailure>,
) -> Generated<T> {
    let cost = cost_usd(provider.provider(), usage);
    debug!(
        provider = provider.provider(),
        model = provider.model(),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        cost_usd = cost,
        "Generation complete"
    );
    Generated {
        value,
        provider: provider.provider().to_string(),
        model: provider.model().to_string(),
        usage,
        cost_usd: cost,
        failed_attempts,
    }
}
