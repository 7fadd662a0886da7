//! Question classification.
//!
//! An ordered rule table handles the unambiguous cases without a model
//! call. Everything else goes to the provider chain with a structured
//! output schema. Any failure on the model path degrades to the refusal
//! category: a classifier error never guesses a content category.

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::generate::ProviderChain;
use super::intent::detect_intent;
use super::prompts::{format_classification_prompt, format_classification_user_message};
use crate::error::{Result, TattvaError};
use crate::registry;
use crate::traits::{Prompt, StructuredPrompt};
use crate::types::{CategoryId, ClassificationResult, ClassifierSource, TemplateType};

/// Confidence assigned when the model path fails.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// One fast-path rule: any pattern matching assigns the category.
pub struct ClassificationRule {
    pub name: &'static str,
    patterns: Vec<Regex>,
    pub category: CategoryId,
    pub confidence: f64,
    /// `$1`-style references expand against the first matching pattern.
    reasoning: &'static str,
}

fn rule(
    name: &'static str,
    patterns: &[&str],
    category: u8,
    confidence: f64,
    reasoning: &'static str,
) -> ClassificationRule {
    ClassificationRule {
        name,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
        category: CategoryId::from_static(category),
        confidence,
        reasoning,
    }
}

lazy_static! {
    /// Fast-path rules in priority order. Patterns run against the
    /// normalized question (lowercase, trimmed, no trailing punctuation).
    pub static ref CLASSIFICATION_RULES: Vec<ClassificationRule> = vec![
        rule(
            "verse_reference",
            &[
                r"\b(shloka|sarga|kanda)\s+\d+",
                r"what does (this|the) (verse|shloka) mean",
            ],
            34,
            0.95,
            "Explicit shloka/verse reference detected",
        ),
        rule(
            "epic_overview",
            &[
                r"^what is (the )?ramayana( about)?$",
                r"^(give|provide) (an? )?(overview|summary) of (the )?ramayana$",
            ],
            1,
            0.98,
            "Direct epic overview question",
        ),
        rule(
            "kanda_overview",
            &[r"what happens in (?:the )?(bala|ayodhya|aranya|kishkindha|sundara|yuddha|uttara) kanda"],
            2,
            0.96,
            "Direct kanda overview question for $1",
        ),
        rule(
            "out_of_scope",
            &[
                r"by (modern|today['’]?s|current) standards",
                r"compare.+(bible|quran|mahabharata|other)",
                r"is (this|that) (right|wrong|justified|ethical)",
            ],
            45,
            1.0,
            "Out of scope (modern judgment or cross-text comparison)",
        ),
    ];
}

/// Lowercase, trim, and drop trailing punctuation.
pub fn normalize_question(question: &str) -> String {
    question
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '\'')
        .trim_end()
        .to_lowercase()
}

/// Fast path. `None` when no rule matches.
pub fn classify_by_rules(question: &str) -> Option<ClassificationResult> {
    let normalized = normalize_question(question);

    CLASSIFICATION_RULES.iter().find_map(|rule| {
        let caps = rule
            .patterns
            .iter()
            .find_map(|p| p.captures(&normalized))?;
        let mut reasoning = String::from("Rule-based: ");
        caps.expand(rule.reasoning, &mut reasoning);

        let category = registry::category(rule.category);
        debug!(rule = rule.name, category = %category.id, "Fast-path classification");
        Some(ClassificationResult {
            category_id: category.id,
            category_name: category.name.to_string(),
            template: category.template,
            confidence: rule.confidence,
            reasoning,
            should_answer: category.id != CategoryId::REFUSAL,
            question_intent: detect_intent(question),
            source: ClassifierSource::Rule {
                rule: rule.name.to_string(),
            },
        })
    })
}

/// Shape the model is asked to return.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LlmClassification {
    pub category_id: i64,
    pub category_name: String,
    pub template: TemplateType,
    pub confidence: f64,
    pub reasoning: String,
    pub should_answer: bool,
}

/// Classifier: rule table first, then the provider chain.
#[derive(Clone)]
pub struct Classifier {
    chain: ProviderChain,
}

impl Classifier {
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    /// Classify a question. Never fails.
    #[instrument(skip(self))]
    pub async fn classify(&self, question: &str, preferred: Option<&str>) -> ClassificationResult {
        if let Some(result) = classify_by_rules(question) {
            return result;
        }

        match self.classify_with_model(question, preferred).await {
            Ok(result) => {
                info!(
                    category = %result.category_id,
                    confidence = result.confidence,
                    source = %result.source.label(),
                    "Model classification"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, defaulting to refusal");
                fallback_classification(question)
            }
        }
    }

    async fn classify_with_model(
        &self,
        question: &str,
        preferred: Option<&str>,
    ) -> Result<ClassificationResult> {
        let prompt = classification_prompt(question);
        let generated = self
            .chain
            .generate_structured::<LlmClassification>(&prompt, preferred)
            .await?;
        let raw = generated.value;

        // Name and template always come from the registry
        let category = registry::category_by_number(raw.category_id)
            .ok_or(TattvaError::UnknownCategory(raw.category_id))?;
        if raw.template != category.template {
            debug!(
                returned = %raw.template,
                locked = %category.template,
                "Model returned a template that disagrees with the category table"
            );
        }

        Ok(ClassificationResult {
            category_id: category.id,
            category_name: category.name.to_string(),
            template: category.template,
            confidence: raw.confidence.clamp(0.0, 1.0),
            reasoning: raw.reasoning,
            should_answer: category.id != CategoryId::REFUSAL,
            question_intent: detect_intent(question),
            source: ClassifierSource::Model {
                provider: generated.provider,
                model: generated.model,
            },
        })
    }
}

/// Pin a classification produced elsewhere to the category table: name,
/// template and `should_answer` are always the registry's.
pub fn lock_to_registry(mut classification: ClassificationResult) -> ClassificationResult {
    let category = registry::category(classification.category_id);
    if classification.template != category.template {
        warn!(
            category = %category.id,
            supplied = %classification.template,
            locked = %category.template,
            "Supplied classification disagrees with the category table"
        );
    }
    classification.category_name = category.name.to_string();
    classification.template = category.template;
    classification.should_answer = category.id != CategoryId::REFUSAL;
    classification.confidence = classification.confidence.clamp(0.0, 1.0);
    classification
}

/// Structured prompt for the model path.
pub fn classification_prompt(question: &str) -> StructuredPrompt {
    let prompt = Prompt::new(format_classification_user_message(question))
        .with_system(format_classification_prompt())
        .with_temperature(0.1)
        .with_max_tokens(200);
    let schema = serde_json::to_value(schemars::schema_for!(LlmClassification)).unwrap_or_default();
    StructuredPrompt::new(prompt, "classification", schema)
}

/// Refusal result used when the model path fails.
pub fn fallback_classification(question: &str) -> ClassificationResult {
    let category = registry::refusal_category();
    ClassificationResult {
        category_id: category.id,
        category_name: category.name.to_string(),
        template: category.template,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: "Classification failed, defaulting to refusal for safety".to_string(),
        should_answer: false,
        question_intent: detect_intent(question),
        source: ClassifierSource::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{classification_json, MockLanguageModel};
    use crate::traits::LanguageModel;
    use serde_json::json;
    use std::sync::Arc;

    fn classifier(models: Vec<MockLanguageModel>) -> Classifier {
        Classifier::new(ProviderChain::new(
            models
                .into_iter()
                .map(|m| Arc::new(m) as Arc<dyn LanguageModel>)
                .collect(),
        ))
    }

    #[test]
    fn test_epic_overview_rule() {
        let result = classify_by_rules("What is the Ramayana about?").unwrap();
        assert_eq!(result.category_id.get(), 1);
        assert!(result.confidence >= 0.95);
        assert_eq!(result.template, TemplateType::T1);
        assert!(result.should_answer);
        assert_eq!(result.source.label(), "rule-based:epic_overview");
    }

    #[test]
    fn test_lock_to_registry_overrides_supplied_fields() {
        let mut forged = classify_by_rules("What is the Ramayana about?").unwrap();
        forged.category_id = CategoryId::new(16).unwrap();
        forged.category_name = "Anything".into();
        forged.template = TemplateType::T2;
        let locked = lock_to_registry(forged);
        assert_eq!(locked.template, TemplateType::T1);
        assert_eq!(locked.category_name, registry::category(locked.category_id).name);
        assert!(locked.should_answer);

        let mut refusal = fallback_classification("Is this right?");
        refusal.should_answer = true;
        refusal.template = TemplateType::T1;
        let locked = lock_to_registry(refusal);
        assert_eq!(locked.template, TemplateType::T3);
        assert!(!locked.should_answer);
    }

    #[test]
    fn test_modern_judgment_rule() {
        let result =
            classify_by_rules("Is Rama's treatment of Sita justified by modern standards?").unwrap();
        assert_eq!(result.category_id, CategoryId::REFUSAL);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.should_answer);
        assert_eq!(result.template, TemplateType::T3);
    }

    #[test]
    fn test_verse_reference_rule_has_priority() {
        // Would also match the kanda overview rule
        let result = classify_by_rules("What happens in Sundara Kanda sarga 15?").unwrap();
        assert_eq!(result.category_id.get(), 34);
        assert!(result.reasoning.starts_with("Rule-based: "));
    }

    #[test]
    fn test_kanda_rule_names_the_kanda() {
        let result = classify_by_rules("what happens in Yuddha Kanda").unwrap();
        assert_eq!(result.category_id.get(), 2);
        assert_eq!(result.confidence, 0.96);
        assert!(result.reasoning.contains("yuddha"));
    }

    #[test]
    fn test_overview_rule_is_anchored() {
        assert!(classify_by_rules("What is the Ramayana's view on hospitality?").is_none());
        assert!(classify_by_rules("Give an overview of the Ramayana.").is_some());
    }

    #[test]
    fn test_rules_are_idempotent() {
        let q = "Compare this with the Mahabharata";
        assert_eq!(classify_by_rules(q), classify_by_rules(q));
    }

    #[tokio::test]
    async fn test_model_path_uses_registry_names() {
        let mut raw = classification_json(21, 0.9);
        raw["categoryName"] = json!("Something the model made up");
        raw["template"] = json!("T2");
        let classifier = classifier(vec![MockLanguageModel::new("openai", "gpt-4o").with_json(raw)]);

        let result = classifier.classify("Why did Rama accept exile?", None).await;

        assert_eq!(result.category_id.get(), 21);
        assert_eq!(result.category_name, "Duty-driven decisions");
        assert_eq!(result.template, TemplateType::T1);
        assert_eq!(result.source.label(), "openai:gpt-4o");
        assert_eq!(result.question_intent, crate::types::QuestionIntent::Why);
    }

    #[tokio::test]
    async fn test_confidence_is_clamped() {
        let classifier = classifier(vec![
            MockLanguageModel::new("openai", "gpt-4o").with_json(classification_json(16, 1.7))
        ]);
        let result = classifier.classify("Who is Jatayu?", None).await;
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_refusal() {
        let classifier = classifier(vec![
            MockLanguageModel::new("openai", "gpt-4o").failing("timeout"),
            MockLanguageModel::new("anthropic", "claude-3-haiku-20240307").failing("overloaded"),
        ]);

        let result = classifier.classify("Who is Jatayu?", None).await;

        assert_eq!(result.category_id, CategoryId::REFUSAL);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert!(!result.should_answer);
        assert_eq!(result.source, ClassifierSource::Fallback);
    }

    #[tokio::test]
    async fn test_out_of_range_id_degrades_to_refusal() {
        let mut raw = classification_json(16, 0.9);
        raw["categoryId"] = json!(99);
        let classifier = classifier(vec![MockLanguageModel::new("openai", "gpt-4o").with_json(raw)]);

        let result = classifier.classify("Who is Jatayu?", None).await;
        assert_eq!(result.category_id, CategoryId::REFUSAL);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_fast_path_skips_model() {
        let model = Arc::new(MockLanguageModel::new("openai", "gpt-4o"));
        let classifier = Classifier::new(ProviderChain::new(vec![model.clone() as Arc<dyn LanguageModel>]));

        classifier.classify("What is the Ramayana?", None).await;
        assert_eq!(model.call_count(), 0);
    }
}
