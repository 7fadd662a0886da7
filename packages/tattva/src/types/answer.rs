//! The answer sum type. Each template has its own strictly required shape.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::category::TemplateType;

/// A generated or pre-computed answer, tagged by `templateType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "templateType")]
pub enum Answer {
    T1(TextualAnswer),
    T2(InterpretiveAnswer),
    T3(RefusalAnswer),
}

/// T1: explicit answer grounded in cited verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextualAnswer {
    pub answer: String,
    pub textual_basis: TextualBasis,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextualBasis {
    /// Primary kanda the answer draws on.
    pub kanda: String,
    #[serde(default)]
    pub sarga: Vec<u32>,
    #[serde(default)]
    pub shloka: Vec<u32>,
    /// `Kanda Sarga.Shloka` labels.
    pub citations: Vec<String>,
}

/// T2: what the text states, how tradition reads it, and where certainty ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterpretiveAnswer {
    pub answer: String,
    pub what_text_states: String,
    pub traditional_interpretations: String,
    pub limit_of_certainty: String,
}

/// T3: out-of-scope notice with in-scope alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefusalAnswer {
    pub out_of_scope_notice: String,
    pub why: String,
    #[serde(alias = "whatICanHelpWith")]
    pub alternatives: Vec<String>,
}

impl Answer {
    pub fn template_type(&self) -> TemplateType {
        match self {
            Self::T1(_) => TemplateType::T1,
            Self::T2(_) => TemplateType::T2,
            Self::T3(_) => TemplateType::T3,
        }
    }

    /// Citations claimed by the answer. Only T1 carries citations.
    pub fn citations(&self) -> &[String] {
        match self {
            Self::T1(a) => &a.textual_basis.citations,
            _ => &[],
        }
    }

    /// All free-text fields joined with spaces.
    pub fn free_text(&self) -> String {
        match self {
            Self::T1(a) => [a.answer.as_str(), a.explanation.as_str()].join(" "),
            Self::T2(a) => [
                a.answer.as_str(),
                a.what_text_states.as_str(),
                a.traditional_interpretations.as_str(),
                a.limit_of_certainty.as_str(),
            ]
            .join(" "),
            Self::T3(a) => {
                let mut parts = vec![a.out_of_scope_notice.as_str(), a.why.as_str()];
                parts.extend(a.alternatives.iter().map(String::as_str));
                parts.join(" ")
            }
        }
    }

    /// Wrap an untagged model output in the variant for `template`.
    pub fn from_untagged(
        template: TemplateType,
        value: serde_json::Value,
    ) -> serde_json::Result<Self> {
        Ok(match template {
            TemplateType::T1 => Self::T1(serde_json::from_value(value)?),
            TemplateType::T2 => Self::T2(serde_json::from_value(value)?),
            TemplateType::T3 => Self::T3(serde_json::from_value(value)?),
        })
    }
}

impl From<TextualAnswer> for Answer {
    fn from(a: TextualAnswer) -> Self {
        Self::T1(a)
    }
}

impl From<InterpretiveAnswer> for Answer {
    fn from(a: InterpretiveAnswer) -> Self {
        Self::T2(a)
    }
}

impl From<RefusalAnswer> for Answer {
    fn from(a: RefusalAnswer) -> Self {
        Self::T3(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_serialization() {
        let answer = Answer::T3(RefusalAnswer {
            out_of_scope_notice: "This asks for a modern moral verdict.".into(),
            why: "Tattva reports what the text states.".into(),
            alternatives: vec!["What does the text state about the agni pariksha?".into()],
        });
        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value["templateType"], "T3");
        assert_eq!(value["outOfScopeNotice"], "This asks for a modern moral verdict.");
        assert!(value["alternatives"].is_array());
    }

    #[test]
    fn test_variant_fields_are_required() {
        let missing_limit = json!({
            "templateType": "T2",
            "answer": "a",
            "whatTextStates": "b",
            "traditionalInterpretations": "c"
        });
        assert!(serde_json::from_value::<Answer>(missing_limit).is_err());
    }

    #[test]
    fn test_from_untagged_accepts_legacy_refusal_field() {
        let value = json!({
            "outOfScopeNotice": "n",
            "why": "w",
            "whatICanHelpWith": ["Who is Vibhishana?"]
        });
        let answer = Answer::from_untagged(TemplateType::T3, value).unwrap();
        assert_eq!(answer.template_type(), TemplateType::T3);
        assert!(answer.free_text().contains("Vibhishana"));
    }
}
