//! Answer validation and repair.
//!
//! Hard constraints per template:
//! - T1 must not speculate and must cite at least one passage.
//! - T2 must state its limit of certainty. A missing or degenerate limit
//!   is repaired with a generic disclaimer rather than rejected.
//! - T3 must never apologize and must offer at least one alternative.
//!
//! Validation is advisory unless the engine runs with
//! [`ValidationPolicy::RetryOnce`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::types::{
    Answer, InterpretiveAnswer, RefusalAnswer, TemplateType, TextualAnswer, ValidationSummary,
};

/// Substituted for a missing or degenerate `limitOfCertainty`.
pub const LIMIT_OF_CERTAINTY_DISCLAIMER: &str = "The text provided describes the events and actions but does not explicitly detail the internal motivations or alternate possibilities in this specific excerpt. Interpretations may vary based on different scholarly traditions.";

/// Substituted for a missing `whatTextStates`.
pub const WHAT_TEXT_STATES_PLACEHOLDER: &str = "Specific textual details not separately extracted.";

const MIN_T1_ANSWER_CHARS: usize = 50;
const MIN_LIMIT_CHARS: usize = 30;
const MIN_LIMIT_REPAIR_CHARS: usize = 5;
const MIN_ALTERNATIVE_CHARS: usize = 10;

lazy_static! {
    static ref SPECULATION: Regex = Regex::new(
        r"(?i)\b(might|may|could|would|possibly|perhaps|probably|likely|seems|appears|suggests|implies|indicates|interpretation|inferred|assumed|speculate)\b"
    )
    .unwrap();
    static ref APOLOGY: Regex = Regex::new(
        r"(?i)\b(sorry|apolog\w*|unfortunately|regret\w*|afraid|cannot help|can['’]t help|unable to assist)\b"
    )
    .unwrap();
    static ref MISSING_FIELD: Regex = Regex::new(r"missing field `([^`]+)`").unwrap();
}

/// What to do with hard errors that repair cannot fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Log and return the answer anyway.
    #[default]
    Advisory,
    /// Regenerate once (non-streaming only), then return the better attempt.
    RetryOnce,
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "advisory" => Ok(Self::Advisory),
            "retry_once" | "retry" => Ok(Self::RetryOnce),
            other => Err(format!("unknown validation policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Schema,
    NoSpeculation,
    CitationFormat,
    MandatoryLimitOfCertainty,
    NoApology,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::NoSpeculation => "no_speculation",
            Self::CitationFormat => "citation_format",
            Self::MandatoryLimitOfCertainty => "mandatory_limit_of_certainty",
            Self::NoApology => "no_apology",
        };
        f.write_str(s)
    }
}

/// One broken constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub constraint: Constraint,
    /// A repair was applied for this issue.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repaired: bool,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint,
            repaired: false,
        }
    }

    fn repaired(mut self) -> Self {
        self.repaired = true;
        self
    }
}

/// Outcome of validating one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Validity of the answer as generated, before any repair.
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    /// The repaired answer, when a repair was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_answer: Option<Answer>,
    pub patched: bool,
}

impl ValidationReport {
    fn from_parts(errors: Vec<ValidationIssue>, warnings: Vec<String>, fixed: Option<Answer>) -> Self {
        Self {
            valid: errors.is_empty(),
            patched: fixed.is_some(),
            errors,
            warnings,
            fixed_answer: fixed,
        }
    }

    /// Errors that no repair addressed.
    pub fn unrepaired_errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(|e| !e.repaired)
    }

    pub fn has_unrepaired_errors(&self) -> bool {
        self.unrepaired_errors().next().is_some()
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            valid: self.valid,
            error_count: self.errors.len(),
            warning_count: self.warnings.len(),
            patched: self.patched,
        }
    }

    /// One line per issue, for logs.
    pub fn describe(&self) -> String {
        if self.valid && self.warnings.is_empty() {
            return "Validation passed".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("[{}] {} (constraint: {})", e.field, e.message, e.constraint))
            .chain(self.warnings.iter().map(|w| format!("warning: {}", w)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn contains_speculation(text: &str) -> bool {
    SPECULATION.is_match(text)
}

pub fn contains_apology(text: &str) -> bool {
    APOLOGY.is_match(text)
}

/// Validate a typed answer, dispatching on its template.
pub fn validate(answer: &Answer) -> ValidationReport {
    match answer {
        Answer::T1(a) => validate_textual(a),
        Answer::T2(a) => validate_interpretive(a),
        Answer::T3(a) => validate_refusal(a),
    }
}

fn require_text(errors: &mut Vec<ValidationIssue>, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationIssue::new(field, format!("{} is required", label), Constraint::Schema));
    }
}

pub fn validate_textual(answer: &TextualAnswer) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    require_text(&mut errors, "answer", &answer.answer, "Answer");
    require_text(&mut errors, "textualBasis.kanda", &answer.textual_basis.kanda, "Kanda");
    require_text(&mut errors, "explanation", &answer.explanation, "Explanation");
    if answer.textual_basis.citations.is_empty() {
        errors.push(ValidationIssue::new(
            "textualBasis.citations",
            "At least one citation is required",
            Constraint::Schema,
        ));
    }

    if contains_speculation(&answer.answer) {
        errors.push(ValidationIssue::new(
            "answer",
            "Textual answers must not contain speculative language (might, could, possibly, etc.)",
            Constraint::NoSpeculation,
        ));
    }
    if contains_speculation(&answer.explanation) {
        errors.push(ValidationIssue::new(
            "explanation",
            "Textual explanations must not contain speculative language",
            Constraint::NoSpeculation,
        ));
    }

    for (i, citation) in answer.textual_basis.citations.iter().enumerate() {
        if citation.trim().is_empty() {
            errors.push(ValidationIssue::new(
                format!("textualBasis.citations[{}]", i),
                "Citation cannot be empty",
                Constraint::CitationFormat,
            ));
        }
    }

    if answer.answer.chars().count() < MIN_T1_ANSWER_CHARS {
        warnings.push("Answer is brief; more detail from the cited passages would help".to_string());
    }

    ValidationReport::from_parts(errors, warnings, None)
}

/// A limit that is blank, a few characters, or a single word such as
/// "Low" is treated as missing.
fn is_degenerate_limit(limit: &str) -> bool {
    let trimmed = limit.trim();
    trimmed.chars().count() < MIN_LIMIT_REPAIR_CHARS || trimmed.split_whitespace().count() <= 1
}

pub fn validate_interpretive(answer: &InterpretiveAnswer) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut fixed = answer.clone();
    let mut patched = false;

    require_text(&mut errors, "answer", &answer.answer, "Answer");
    require_text(
        &mut errors,
        "traditionalInterpretations",
        &answer.traditional_interpretations,
        "Traditional interpretations",
    );

    if is_degenerate_limit(&answer.limit_of_certainty) {
        errors.push(
            ValidationIssue::new(
                "limitOfCertainty",
                "Limit of certainty is mandatory for interpretive answers",
                Constraint::MandatoryLimitOfCertainty,
            )
            .repaired(),
        );
        fixed.limit_of_certainty = LIMIT_OF_CERTAINTY_DISCLAIMER.to_string();
        patched = true;
    } else if answer.limit_of_certainty.trim().chars().count() < MIN_LIMIT_CHARS {
        warnings.push("Limit of certainty is brief".to_string());
    }

    if answer.what_text_states.trim().is_empty() {
        errors.push(
            ValidationIssue::new("whatTextStates", "What the text states is required", Constraint::Schema)
                .repaired(),
        );
        fixed.what_text_states = WHAT_TEXT_STATES_PLACEHOLDER.to_string();
        patched = true;
    } else if contains_speculation(&answer.what_text_states) {
        warnings.push("What the text states should be purely factual but contains speculative language".to_string());
    }

    ValidationReport::from_parts(errors, warnings, patched.then(|| Answer::T2(fixed)))
}

pub fn validate_refusal(answer: &RefusalAnswer) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    require_text(&mut errors, "outOfScopeNotice", &answer.out_of_scope_notice, "Out-of-scope notice");
    require_text(&mut errors, "why", &answer.why, "Explanation of why");
    if answer.alternatives.is_empty() {
        errors.push(ValidationIssue::new(
            "alternatives",
            "At least one alternative suggestion is required",
            Constraint::Schema,
        ));
    }

    let all_text = Answer::T3(answer.clone()).free_text();
    if contains_apology(&all_text) {
        errors.push(ValidationIssue::new(
            "all",
            "Refusals must not apologize (sorry, unfortunately, regret, etc.)",
            Constraint::NoApology,
        ));
    }

    if answer
        .alternatives
        .iter()
        .any(|a| a.trim().chars().count() < MIN_ALTERNATIVE_CHARS)
    {
        warnings.push("Some alternative suggestions are too brief".to_string());
    }
    if all_text.contains("!!") {
        warnings.push("Avoid repeated exclamation marks; keep the tone calm".to_string());
    }

    ValidationReport::from_parts(errors, warnings, None)
}

/// Check raw model output for `template`.
///
/// Missing T2 repair fields are filled before the strict parse so they can
/// be repaired instead of failing the schema. On success returns the
/// answer to serve (repaired if needed) with its report; otherwise a report
/// carrying the schema errors.
pub fn check_generated(
    template: TemplateType,
    value: &Value,
) -> std::result::Result<(Answer, ValidationReport), ValidationReport> {
    let Some(object) = value.as_object() else {
        return Err(schema_failure("$", "Output is not a JSON object"));
    };

    let mut object = object.clone();
    if template == TemplateType::T2 {
        for field in ["limitOfCertainty", "whatTextStates"] {
            if !object.get(field).is_some_and(Value::is_string) {
                object.insert(field.to_string(), Value::String(String::new()));
            }
        }
    }

    let answer = Answer::from_untagged(template, Value::Object(object)).map_err(|e| {
        let message = e.to_string();
        let field = MISSING_FIELD
            .captures(&message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "$".to_string());
        schema_failure(&field, &message)
    })?;

    let report = validate(&answer);
    let served = report.fixed_answer.clone().unwrap_or(answer);
    Ok((served, report))
}

/// Validate raw model output; schema failures become report errors.
pub fn validate_generated(template: TemplateType, value: &Value) -> ValidationReport {
    match check_generated(template, value) {
        Ok((_, report)) => report,
        Err(report) => report,
    }
}

fn schema_failure(field: &str, message: &str) -> ValidationReport {
    ValidationReport::from_parts(
        vec![ValidationIssue::new(field, message, Constraint::Schema)],
        Vec::new(),
        None,
    )
}
