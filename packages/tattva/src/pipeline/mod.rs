//! The answering pipeline.
//!
//! - [`classify`] - rule table, then model fallback, failing safe to refusal
//! - [`retrieve`] - query expansion, embedding and filtered vector search
//! - [`prompts`] - per-template prompt builders
//! - [`generate`] - provider-fallback generation, streaming and not
//! - [`validate`] - template constraint checks and repair
//! - [`shortcuts`] - static answers that bypass the pipeline
//! - [`trace`] - fire-and-forget trace persistence
//! - [`engine`] - the orchestrator tying the stages together

pub mod classify;
pub mod engine;
pub mod generate;
pub mod intent;
pub mod partial_json;
pub mod prompts;
pub mod retrieve;
pub mod shortcuts;
pub mod trace;
pub mod validate;

pub use classify::{
    classification_prompt, classify_by_rules, fallback_classification, lock_to_registry,
    normalize_question, Classifier, LlmClassification, FALLBACK_CONFIDENCE,
};
pub use engine::{
    apply_evidence_policy, AnswerContext, AnswerEngine, AnswerEvent, AnswerOutcome,
    AnswerRequest, AnswerStream, EngineConfig, RetrievedContext, SHORTCUT_PROVIDER,
};
pub use generate::{PartialUpdate, ProviderChain, StructuredStream};
pub use intent::detect_intent;
pub use partial_json::parse_partial;
pub use prompts::{
    answer_prompt, answer_schema, build_prompt, evidence_summary, expansion_prompt,
    format_classification_prompt, MIN_EVIDENCE_PASSAGES,
};
pub use retrieve::{QueryExpander, Retriever, NO_RETRIEVAL_WARNING};
pub use shortcuts::{find_shortcut, Shortcut, ETYMOLOGY_KANDA, METADATA_KANDA};
pub use trace::TraceRecorder;
pub use validate::{
    check_generated, validate, validate_generated, Constraint, ValidationIssue, ValidationPolicy,
    ValidationReport,
};
