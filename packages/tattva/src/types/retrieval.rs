//! Retrieval configuration and results.

use serde::{Deserialize, Serialize};

/// How broad a slice of the text a category needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Shloka,
    Sarga,
    Kanda,
    MultiShloka,
    SargaRange,
}

/// Per-category retrieval tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub granularity: Granularity,
    /// Result count; `0` means no retrieval at all.
    pub top_k: usize,
    /// Only passages with a translation are eligible.
    pub include_translation: bool,
    /// Only passages with scholarly commentary are eligible.
    pub include_comments: bool,
    pub requires_explanation: bool,
}

/// Caller-supplied structural narrowing (a specific kanda, sarga or verse).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sarga: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shloka: Option<u32>,
}

impl StructuralFilter {
    pub fn is_empty(&self) -> bool {
        self.kanda.is_none() && self.sarga.is_none() && self.shloka.is_none()
    }
}

/// Metadata filter sent to the vector index: every set condition must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub require_translation: bool,
    pub require_comments: bool,
    pub structural: StructuralFilter,
}

impl SearchFilter {
    pub fn for_config(config: &RetrievalConfig, structural: StructuralFilter) -> Self {
        Self {
            require_translation: config.include_translation,
            require_comments: config.include_comments,
            structural,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.require_translation && !self.require_comments && self.structural.is_empty()
    }

    /// Evaluate the filter locally (in-memory index, tests).
    pub fn matches(&self, meta: &PassageMetadata) -> bool {
        if self.require_translation && !meta.has_translation {
            return false;
        }
        if self.require_comments && !meta.has_comments {
            return false;
        }
        if let Some(kanda) = &self.structural.kanda {
            if !meta.kanda.eq_ignore_ascii_case(kanda) {
                return false;
            }
        }
        if self.structural.sarga.is_some_and(|s| s != meta.sarga) {
            return false;
        }
        if self.structural.shloka.is_some_and(|s| s != meta.shloka) {
            return false;
        }
        true
    }
}

/// Stored metadata for one verse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub kanda: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub sarga: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub shloka: u32,
    /// Source-language verse text.
    #[serde(default, alias = "shloka_text")]
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub has_translation: bool,
    #[serde(default)]
    pub has_comments: bool,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl PassageMetadata {
    /// Citation label, e.g. `Sundara Kanda 15.22`.
    pub fn citation(&self) -> String {
        format!("{} {}.{}", self.kanda, self.sarga, self.shloka)
    }
}

/// Vector stores keep numeric metadata as floats (`15.0`) and some
/// ingestion paths wrote strings (`"15"`).
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid verse number: {}", n))),
        serde_json::Value::String(s) => s.trim().parse().map_err(D::Error::custom),
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("invalid verse number: {}", other))),
    }
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: String,
    pub score: f32,
    pub metadata: PassageMetadata,
}

/// Passages retrieved for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    #[serde(alias = "shlokas")]
    pub passages: Vec<RetrievedPassage>,
    pub total_retrieved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_query: Option<String>,
}

impl RetrievalResult {
    pub fn empty(warning: impl Into<String>) -> Self {
        Self {
            passages: Vec::new(),
            total_retrieved: 0,
            warning: Some(warning.into()),
            expanded_query: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Append a warning, keeping any existing one.
    pub fn push_warning(&mut self, warning: impl AsRef<str>) {
        self.warning = Some(match self.warning.take() {
            Some(existing) => format!("{}; {}", existing, warning.as_ref()),
            None => warning.as_ref().to_string(),
        });
    }
}
