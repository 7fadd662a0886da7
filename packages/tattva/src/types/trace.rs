//! Per-request trace record. Field names are snake_case to match the
//! existing trace log format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::Answer;
use super::category::{CategoryId, TemplateType};
use super::classification::ClassificationResult;
use super::generation::TokenUsage;
use super::retrieval::RetrievalResult;

/// Which shortcut answered the question, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutKind {
    Etymology,
    Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTrace {
    pub model: String,
    pub category: String,
    pub category_id: CategoryId,
    pub confidence: f64,
    pub template_selected: TemplateType,
}

impl From<&ClassificationResult> for ClassificationTrace {
    fn from(c: &ClassificationResult) -> Self {
        Self {
            model: c.source.label(),
            category: c.category_name.clone(),
            category_id: c.category_id,
            confidence: c.confidence,
            template_selected: c.template,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub patched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTrace {
    pub provider: String,
    pub model: String,
    pub template_used: TemplateType,
    pub answer: Answer,
    pub citations_in_answer: Vec<String>,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub validation: ValidationSummary,
    /// Template was forced to refusal because no evidence was retrieved.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_providers: Vec<String>,
    /// Regeneration triggered by the validation policy.
    #[serde(default)]
    pub retried: bool,
}

/// One record per answered question. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<ShortcutKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_result: Option<ClassificationTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_results: Option<RetrievalResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_result: Option<GenerationTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_latency_ms: Option<u64>,
    pub total_latency_ms: u64,
}

impl Trace {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_query: user_query.into(),
            shortcut: None,
            classification_result: None,
            classification_latency_ms: None,
            expanded_query: None,
            retrieval_results: None,
            retrieval_latency_ms: None,
            generation_result: None,
            generation_latency_ms: None,
            total_latency_ms: 0,
        }
    }
}
