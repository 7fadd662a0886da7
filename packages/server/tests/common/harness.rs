//! Test harness: the full router over mock providers, a fixed index and an
//! in-memory trace store. No network access.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tattva::testing::{MemoryTraceStore, MockEmbedder, MockLanguageModel, MockVectorIndex};
use tattva::{AnswerEngine, LanguageModel, ProviderChain, RetrievedPassage, Retriever, TraceRecorder};
use tower::ServiceExt;

use server_core::server::{build_app, AppState};

pub struct TestApp {
    pub router: Router,
    pub traces: Arc<MemoryTraceStore>,
}

pub fn test_app(models: Vec<MockLanguageModel>, passages: Vec<RetrievedPassage>) -> TestApp {
    test_app_with_index(models, MockVectorIndex::new().with_passages(passages))
}

pub fn test_app_with_index(models: Vec<MockLanguageModel>, index: MockVectorIndex) -> TestApp {
    let chain = ProviderChain::new(
        models
            .into_iter()
            .map(|m| Arc::new(m) as Arc<dyn LanguageModel>)
            .collect(),
    );
    let retriever = Retriever::new(
        Arc::new(MockEmbedder::new().with_dim(8)),
        Arc::new(index),
    );
    let traces = Arc::new(MemoryTraceStore::new());
    let engine = AnswerEngine::new(chain, retriever, TraceRecorder::new(traces.clone()));

    TestApp {
        router: build_app(AppState::new(engine), &[]),
        traces,
    }
}

impl TestApp {
    /// POST a raw body, returning status and body text.
    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, text) = self.post_raw(uri, body.to_string()).await;
        (status, serde_json::from_str(&text).unwrap())
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

/// `(event, data)` pairs from a complete SSE body.
pub fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(chunk) = line.strip_prefix("data:") {
                    data.push_str(chunk.trim_start());
                }
            }
            Some((event?, serde_json::from_str(&data).ok()?))
        })
        .collect()
}
