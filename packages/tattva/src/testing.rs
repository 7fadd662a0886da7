//! Testing utilities including mock implementations.
//!
//! These let applications exercise the full answering pipeline without
//! making real model, embedding or vector-index calls.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

use crate::error::{Result, TattvaError};
use crate::traits::{
    Embedder, LanguageModel, ModelOutput, Prompt, StructuredPrompt, TextDelta, TextDeltaStream,
    TraceStore, VectorIndex, VectorQuery,
};
use crate::types::{PassageMetadata, RetrievedPassage, TokenUsage, Trace};

pub use crate::stores::{MemoryTraceStore, MemoryVectorIndex};

/// Key for responses that apply to every schema.
const ANY_SCHEMA: &str = "*";

/// Size of the chunks a scripted JSON response is streamed in.
const STREAM_CHUNK: usize = 24;

/// A mock language model.
///
/// Responses are scripted per schema name, with a catch-all fallback. A
/// queue with more than one entry is consumed in order; the last entry
/// repeats.
#[derive(Clone)]
pub struct MockLanguageModel {
    provider: String,
    model: String,
    usage: TokenUsage,

    /// Scripted JSON responses by schema name
    json: Arc<RwLock<HashMap<String, VecDeque<Value>>>>,

    /// Scripted text responses
    text: Arc<RwLock<VecDeque<String>>>,

    /// Failure messages by schema name ("*" fails everything)
    failures: Arc<RwLock<HashMap<String, String>>>,

    stream: Arc<RwLock<Option<ScriptedStream>>>,
    stream_dropped: Arc<DropSignal>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockLlmCall>>>,
}

#[derive(Clone)]
struct ScriptedStream {
    deltas: Vec<String>,
    ending: StreamEnding,
}

#[derive(Clone)]
enum StreamEnding {
    Complete,
    Error(String),
    Hang,
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone, PartialEq)]
pub enum MockLlmCall {
    Json { schema_name: String, user: String },
    Text { user: String },
    Stream { schema_name: String },
}

impl MockLanguageModel {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            usage: TokenUsage::new(100, 50),
            json: Default::default(),
            text: Default::default(),
            failures: Default::default(),
            stream: Default::default(),
            stream_dropped: Default::default(),
            calls: Default::default(),
        }
    }

    /// Usage reported by every call.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Queue a JSON response for any schema.
    pub fn with_json(self, value: Value) -> Self {
        self.with_json_for(ANY_SCHEMA, value)
    }

    /// Queue a JSON response for one schema name.
    pub fn with_json_for(self, schema_name: &str, value: Value) -> Self {
        self.json
            .write()
            .unwrap()
            .entry(schema_name.to_string())
            .or_default()
            .push_back(value);
        self
    }

    /// Queue a text response.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.text.write().unwrap().push_back(text.into());
        self
    }

    /// Fail every call.
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.failing_for(ANY_SCHEMA, message)
    }

    /// Fail structured calls for one schema name.
    pub fn failing_for(self, schema_name: &str, message: impl Into<String>) -> Self {
        self.failures
            .write()
            .unwrap()
            .insert(schema_name.to_string(), message.into());
        self
    }

    /// Stream exactly these deltas.
    pub fn with_stream(self, deltas: Vec<&str>) -> Self {
        self.script_stream(deltas, StreamEnding::Complete)
    }

    /// Stream these deltas, then fail.
    pub fn with_stream_error_after(self, deltas: Vec<&str>, message: impl Into<String>) -> Self {
        self.script_stream(deltas, StreamEnding::Error(message.into()))
    }

    /// Stream these deltas, then never finish.
    pub fn with_stream_hang(self, deltas: Vec<&str>) -> Self {
        self.script_stream(deltas, StreamEnding::Hang)
    }

    fn script_stream(self, deltas: Vec<&str>, ending: StreamEnding) -> Self {
        *self.stream.write().unwrap() = Some(ScriptedStream {
            deltas: deltas.into_iter().map(String::from).collect(),
            ending,
        });
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockLlmCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Structured calls for one schema name.
    pub fn json_calls(&self, schema_name: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockLlmCall::Json { schema_name: s, .. } | MockLlmCall::Stream { schema_name: s } if s == schema_name))
            .count()
    }

    /// Resolves once a stream handed out by this mock has been dropped.
    pub async fn wait_stream_dropped(&self) {
        self.stream_dropped.wait().await
    }

    fn check_failure(&self, schema_name: Option<&str>) -> Result<()> {
        let failures = self.failures.read().unwrap();
        let message = schema_name
            .and_then(|s| failures.get(s))
            .or_else(|| failures.get(ANY_SCHEMA));
        match message {
            Some(m) => Err(TattvaError::provider(&self.provider, m)),
            None => Ok(()),
        }
    }

    fn next_json(&self, schema_name: &str) -> Result<Value> {
        let mut json = self.json.write().unwrap();
        let key = if json.get(schema_name).is_some_and(|q| !q.is_empty()) {
            schema_name
        } else {
            ANY_SCHEMA
        };
        let queue = json
            .get_mut(key)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                TattvaError::provider(&self.provider, format!("no scripted response for {}", schema_name))
            })?;
        Ok(if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        })
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, prompt: &StructuredPrompt) -> Result<ModelOutput<Value>> {
        self.calls.write().unwrap().push(MockLlmCall::Json {
            schema_name: prompt.schema_name.clone(),
            user: prompt.prompt.user.clone(),
        });
        self.check_failure(Some(&prompt.schema_name))?;
        Ok(ModelOutput {
            value: self.next_json(&prompt.schema_name)?,
            usage: self.usage,
        })
    }

    async fn generate_text(&self, prompt: &Prompt) -> Result<ModelOutput<String>> {
        self.calls.write().unwrap().push(MockLlmCall::Text {
            user: prompt.user.clone(),
        });
        self.check_failure(None)?;
        let mut text = self.text.write().unwrap();
        let value = if text.len() > 1 {
            text.pop_front()
        } else {
            text.front().cloned()
        }
        .ok_or_else(|| TattvaError::provider(&self.provider, "no scripted text response"))?;
        Ok(ModelOutput {
            value,
            usage: self.usage,
        })
    }

    async fn stream_json(&self, prompt: &StructuredPrompt) -> Result<TextDeltaStream> {
        self.calls.write().unwrap().push(MockLlmCall::Stream {
            schema_name: prompt.schema_name.clone(),
        });
        self.check_failure(Some(&prompt.schema_name))?;

        let scripted = match self.stream.read().unwrap().clone() {
            Some(s) => s,
            None => {
                // Chunk the scripted JSON response
                let body = self.next_json(&prompt.schema_name)?.to_string();
                let chars: Vec<char> = body.chars().collect();
                ScriptedStream {
                    deltas: chars
                        .chunks(STREAM_CHUNK)
                        .map(|c| c.iter().collect())
                        .collect(),
                    ending: StreamEnding::Complete,
                }
            }
        };

        let usage = self.usage;
        let provider = self.provider.clone();
        let deltas = stream::iter(scripted.deltas.into_iter().map(|text| {
            Ok(TextDelta { text, usage: None })
        }));
        let tail: TextDeltaStream = match scripted.ending {
            StreamEnding::Complete => stream::once(async move {
                Ok(TextDelta {
                    text: String::new(),
                    usage: Some(usage),
                })
            })
            .boxed(),
            StreamEnding::Error(message) => {
                stream::once(async move { Err(TattvaError::provider(provider, message)) }).boxed()
            }
            StreamEnding::Hang => stream::pending().boxed(),
        };

        let guard = StreamGuard(self.stream_dropped.clone());
        Ok(deltas
            .chain(tail)
            .map(move |item| {
                let _held = &guard;
                item
            })
            .boxed())
    }
}

#[derive(Default)]
struct DropSignal {
    dropped: AtomicBool,
    notify: Notify,
}

impl DropSignal {
    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.dropped.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

struct StreamGuard(Arc<DropSignal>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.dropped.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }
}

/// A mock embedder returning deterministic vectors.
#[derive(Clone)]
pub struct MockEmbedder {
    dim: usize,
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    fail: bool,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dim: 1536,
            embeddings: Default::default(),
            fail: false,
            calls: Default::default(),
        }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Texts embedded so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Generate a deterministic embedding based on text.
    pub fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());
        (0..self.dim)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model(&self) -> &str {
        "mock-embedding"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.write().unwrap().push(text.to_string());
        if self.fail {
            return Err(TattvaError::Embedding("mock embedder failure".into()));
        }
        if let Some(e) = self.embeddings.read().unwrap().get(text) {
            return Ok(e.clone());
        }
        Ok(self.deterministic_embedding(text))
    }
}

/// A mock vector index returning fixed passages.
///
/// The query filter is honored locally and results are truncated to
/// `top_k`, in insertion order.
#[derive(Clone, Default)]
pub struct MockVectorIndex {
    passages: Arc<RwLock<Vec<RetrievedPassage>>>,
    fail: bool,
    queries: Arc<RwLock<Vec<VectorQuery>>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passage(self, passage: RetrievedPassage) -> Self {
        self.passages.write().unwrap().push(passage);
        self
    }

    pub fn with_passages(self, passages: impl IntoIterator<Item = RetrievedPassage>) -> Self {
        self.passages.write().unwrap().extend(passages);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<VectorQuery> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<RetrievedPassage>> {
        self.queries.write().unwrap().push(query.clone());
        if self.fail {
            return Err(TattvaError::VectorSearch("mock index unavailable".into()));
        }
        Ok(self
            .passages
            .read()
            .unwrap()
            .iter()
            .filter(|p| query.filter.matches(&p.metadata))
            .take(query.top_k)
            .cloned()
            .collect())
    }
}

/// A trace store that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTraceStore;

#[async_trait]
impl TraceStore for FailingTraceStore {
    async fn save(&self, _trace: &Trace) -> Result<()> {
        Err(TattvaError::storage(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "trace sink is read-only",
        )))
    }
}

/// Fully populated passage, translation and commentary included.
pub fn passage(kanda: &str, sarga: u32, shloka: u32, translation: &str) -> RetrievedPassage {
    RetrievedPassage {
        id: format!("{}-{}-{}", kanda.to_lowercase().replace(' ', "-"), sarga, shloka),
        score: 0.9,
        metadata: PassageMetadata {
            kanda: kanda.to_string(),
            sarga,
            shloka,
            text: format!("shloka {}.{}", sarga, shloka),
            translation: Some(translation.to_string()),
            explanation: format!("Explanation of {}.{}", sarga, shloka),
            comments: Some(format!("Commentary on {}.{}", sarga, shloka)),
            has_translation: true,
            has_comments: true,
            ..Default::default()
        },
    }
}

/// Well-formed T1 output citing `citations`.
pub fn textual_answer_json(citations: &[&str]) -> Value {
    json!({
        "answer": "Hanuman crossed the ocean in a single leap and reached Lanka, where he searched for Sita in the gardens of Ravana's palace.",
        "textualBasis": {
            "kanda": "Sundara Kanda",
            "sarga": [1],
            "shloka": [1],
            "citations": citations,
        },
        "explanation": "The opening sarga of the Sundara Kanda narrates the leap in detail.",
    })
}

/// Well-formed T2 output.
pub fn interpretive_answer_json() -> Value {
    json!({
        "answer": "Rama accepted Vibhishana because he had come seeking refuge.",
        "whatTextStates": "The text records Rama granting refuge to Vibhishana after consulting his allies.",
        "traditionalInterpretations": "Commentators read the episode as the archetype of sharanagati, unconditional surrender.",
        "limitOfCertainty": "The text records the decision and its stated reasons; it does not describe Rama's private deliberation.",
    })
}

/// Well-formed T3 output.
pub fn refusal_answer_json() -> Value {
    json!({
        "outOfScopeNotice": "This question asks for a judgment by modern standards, which the text itself does not make.",
        "why": "Tattva reports what the Valmiki Ramayana states and how tradition reads it.",
        "alternatives": [
            "What does the text say about Sita's ordeal in the Yuddha Kanda?",
            "How do traditional commentators interpret Rama's decision?",
        ],
    })
}

/// LLM classification output for a category.
pub fn classification_json(category_id: u8, confidence: f64) -> Value {
    let category = crate::registry::category_by_number(category_id as i64)
        .unwrap_or_else(crate::registry::refusal_category);
    json!({
        "categoryId": category_id,
        "categoryName": category.name,
        "template": category.template,
        "confidence": confidence,
        "reasoning": format!("Mock classification as {}", category.name),
        "shouldAnswer": category_id != 45,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_scripted_by_schema() {
        let model = MockLanguageModel::new("openai", "gpt-4o")
            .with_json_for("classification", json!({"n": 1}))
            .with_json(json!({"n": 2}));

        let classify = StructuredPrompt::new(Prompt::new("q"), "classification", json!({}));
        let answer = StructuredPrompt::new(Prompt::new("q"), "answer_t1", json!({}));

        assert_eq!(model.generate_json(&classify).await.unwrap().value["n"], 1);
        assert_eq!(model.generate_json(&answer).await.unwrap().value["n"], 2);
        assert_eq!(model.json_calls("classification"), 1);
    }

    #[tokio::test]
    async fn test_mock_model_queue_repeats_last() {
        let model = MockLanguageModel::new("openai", "gpt-4o")
            .with_text("first")
            .with_text("second");
        let p = Prompt::new("q");

        assert_eq!(model.generate_text(&p).await.unwrap().value, "first");
        assert_eq!(model.generate_text(&p).await.unwrap().value, "second");
        assert_eq!(model.generate_text(&p).await.unwrap().value, "second");
    }

    #[tokio::test]
    async fn test_mock_stream_chunks_scripted_json() {
        let value = textual_answer_json(&["Sundara Kanda 1.1"]);
        let model = MockLanguageModel::new("openai", "gpt-4o").with_json(value.clone());
        let prompt = StructuredPrompt::new(Prompt::new("q"), "answer_t1", json!({}));

        let deltas: Vec<TextDelta> = model
            .stream_json(&prompt)
            .await
            .unwrap()
            .map(|d| d.unwrap())
            .collect()
            .await;
        let text: String = deltas.iter().map(|d| d.text.as_str()).collect();

        assert!(deltas.len() > 2);
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), value);
        assert!(deltas.last().unwrap().usage.is_some());
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new().with_dim(8);
        let a = embedder.embed("Who is Jatayu?").await.unwrap();
        let b = embedder.embed("Who is Jatayu?").await.unwrap();
        let c = embedder.embed("Who is Sampati?").await.unwrap();

        assert_eq!(a.len(), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_mock_index_applies_filter_and_top_k() {
        let mut bare = passage("Bala Kanda", 1, 1, "x");
        bare.metadata.has_comments = false;
        let index = MockVectorIndex::new().with_passages(vec![
            bare,
            passage("Bala Kanda", 1, 2, "y"),
            passage("Bala Kanda", 1, 3, "z"),
        ]);

        let hits = index
            .query(&VectorQuery {
                vector: vec![0.0; 4],
                top_k: 1,
                filter: crate::types::SearchFilter {
                    require_comments: true,
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.shloka, 2);
    }
}
