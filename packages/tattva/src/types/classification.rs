//! Classification output.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::{CategoryId, TemplateType};

/// Coarse interrogative intent of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionIntent {
    Who,
    What,
    When,
    Where,
    Why,
    How,
    General,
}

impl fmt::Display for QuestionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Who => "who",
            Self::What => "what",
            Self::When => "when",
            Self::Where => "where",
            Self::Why => "why",
            Self::How => "how",
            Self::General => "general",
        };
        f.write_str(s)
    }
}

/// Where a classification came from. Recorded in traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSource {
    /// Matched a fast-path rule.
    Rule { rule: String },
    /// Produced by a model in the provider chain.
    Model { provider: String, model: String },
    /// The model path failed; degraded to refusal.
    Fallback,
}

impl ClassifierSource {
    /// Compact label, e.g. `rule-based:epic_overview` or `openai:gpt-4o`.
    pub fn label(&self) -> String {
        match self {
            Self::Rule { rule } => format!("rule-based:{}", rule),
            Self::Model { provider, model } => format!("{}:{}", provider, model),
            Self::Fallback => "fallback".to_string(),
        }
    }
}

/// Result of classifying one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category_id: CategoryId,
    pub category_name: String,
    pub template: TemplateType,
    pub confidence: f64,
    pub reasoning: String,
    /// `false` iff the category is the refusal category.
    pub should_answer: bool,
    pub question_intent: QuestionIntent,
    pub source: ClassifierSource,
}
