//! Route tests driving the axum router with `oneshot`.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use tattva::testing::{
    classification_json, passage, textual_answer_json, MockLanguageModel, MockVectorIndex,
};

use crate::common::{sse_events, test_app, test_app_with_index};

fn jatayu_passages() -> Vec<tattva::RetrievedPassage> {
    (1..=3)
        .map(|i| passage("Aranya Kanda", 51, i, "Jatayu fought Ravana to rescue Sita"))
        .collect()
}

fn scripted_model() -> MockLanguageModel {
    MockLanguageModel::new("openai", "gpt-4o")
        .with_json_for("classification", classification_json(16, 0.9))
        .with_json_for("textual_answer", textual_answer_json(&["Aranya Kanda 51.1"]))
}

#[tokio::test]
async fn classify_returns_rule_classification() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, body) = app
        .post_json("/api/classify", json!({"question": "What is the Ramayana about?"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["classification"]["categoryId"], 1);
    assert_eq!(body["classification"]["template"], "T1");
    assert_eq!(body["classification"]["shouldAnswer"], true);
}

#[tokio::test]
async fn classify_rejects_short_question() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, body) = app.post_json("/api/classify", json!({"question": "  a "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid request");
    assert_eq!(body["details"][0]["field"], "question");
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, text) = app.post_raw("/api/retrieve", "{\"question\": ").await;
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["details"][0]["field"], "body");
}

#[tokio::test]
async fn retrieve_returns_passages_and_classification() {
    let app = test_app(vec![scripted_model()], jatayu_passages());

    let (status, body) = app.post_json("/api/retrieve", json!({"question": "Who is Jatayu?"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["categoryId"], 16);
    assert_eq!(body["retrieval"]["passages"].as_array().unwrap().len(), 3);
    assert_eq!(body["retrieval"]["totalRetrieved"], 3);
}

#[tokio::test]
async fn answer_without_streaming_returns_trace_and_response() {
    let app = test_app(vec![scripted_model()], jatayu_passages());

    let (status, body) = app
        .post_json("/api/answer", json!({"question": "Who is Jatayu?", "stream": false}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["trace_id"].is_string());
    assert_eq!(body["user_query"], "Who is Jatayu?");
    assert_eq!(body["full_response"]["templateType"], "T1");
    assert_eq!(body["generation_result"]["provider"], "openai");
    assert_eq!(body["validation"]["valid"], true);
    assert_eq!(body["degraded"], false);

    // Trace persistence is fire-and-forget
    for _ in 0..200 {
        if !app.traces.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(app.traces.traces()[0].trace_id.to_string(), body["trace_id"].as_str().unwrap());
}

#[tokio::test]
async fn answer_streams_context_then_complete() {
    let app = test_app(vec![scripted_model()], jatayu_passages());

    let (status, text) = app
        .post_raw("/api/answer", json!({"question": "Who is Jatayu?"}).to_string())
        .await;
    let events = sse_events(&text);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.first().map(|(e, _)| e.as_str()), Some("context"));
    assert_eq!(events[0].1["template"], "T1");
    assert!(events.iter().any(|(e, _)| e == "partial"));

    let (last, outcome) = events.last().unwrap();
    assert_eq!(last, "complete");
    assert_eq!(outcome["full_response"]["textualBasis"]["citations"][0], "Aranya Kanda 51.1");
}

#[tokio::test]
async fn answer_shortcut_streams_single_completion() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, text) = app
        .post_raw("/api/answer", json!({"question": "What does Hanuman mean?"}).to_string())
        .await;
    let events = sse_events(&text);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "complete");
    assert_eq!(events[0].1["shortcut"], "etymology");
}

#[tokio::test]
async fn answer_reports_provider_exhaustion_as_bad_gateway() {
    let app = test_app(
        vec![
            MockLanguageModel::new("openai", "gpt-4o").failing("rate limited"),
            MockLanguageModel::new("anthropic", "claude-3-haiku-20240307").failing("overloaded"),
        ],
        jatayu_passages(),
    );

    let (status, body) = app
        .post_json("/api/answer", json!({"question": "Who is Jatayu?", "stream": false}))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "All providers failed");
    assert!(body["message"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn answer_requires_question() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, body) = app.post_json("/api/answer", json!({"stream": false})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn providers_lists_chain_in_order() {
    let app = test_app(
        vec![
            MockLanguageModel::new("openai", "gpt-4o"),
            MockLanguageModel::new("anthropic", "claude-3-haiku-20240307"),
        ],
        vec![],
    );

    let (status, body) = app.get_json("/api/providers").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["defaultProvider"], "openai");
    assert_eq!(body["total"], 2);
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers[0]["isDefault"], true);
    assert_eq!(providers[1]["id"], "anthropic");
    assert_eq!(providers[1]["isDefault"], false);
    assert_eq!(providers[1]["model"], "claude-3-haiku-20240307");
    assert!(providers[0]["cost"]["inputPer1k"].is_number());
}

#[tokio::test]
async fn health_reports_provider_count() {
    let app = test_app(vec![scripted_model()], vec![]);

    let (status, body) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["providers"], 1);
}

#[tokio::test]
async fn streamed_answer_with_failing_retrieval_is_server_error() {
    let app = test_app_with_index(vec![scripted_model()], MockVectorIndex::new().failing());

    let (status, text) = app
        .post_raw("/api/answer", json!({"question": "Who is Jatayu?"}).to_string())
        .await;
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Internal server error");
}
