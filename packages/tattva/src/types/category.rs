//! Categories and the answer templates they are locked to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TattvaError;

/// Answer template. Each category is bound to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TemplateType {
    /// Textual: explicit, citation-backed, no speculation.
    T1,
    /// Interpretive: separates text from commentary, states its limits.
    T2,
    /// Refusal: out of scope, redirects without apology.
    T3,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::T1 => "Textual",
            Self::T2 => "Interpretive",
            Self::T3 => "Refusal",
        }
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::T3)
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryGroup {
    Story,
    Character,
    Dharma,
    Verse,
    Interpretation,
    Meta,
}

/// Validated category id in `1..=45`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct CategoryId(u8);

impl CategoryId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 45;

    /// The designated refusal category.
    pub const REFUSAL: CategoryId = CategoryId(45);

    pub fn new(id: i64) -> Result<Self, TattvaError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&id) {
            Ok(Self(id as u8))
        } else {
            Err(TattvaError::UnknownCategory(id))
        }
    }

    /// For the static tables only; callers go through `new`.
    pub(crate) const fn from_static(id: u8) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the static tables.
    pub(crate) const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn all() -> impl Iterator<Item = CategoryId> {
        (Self::MIN..=Self::MAX).map(CategoryId)
    }
}

impl TryFrom<i64> for CategoryId {
    type Error = TattvaError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<CategoryId> for u8 {
    fn from(id: CategoryId) -> Self {
        id.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fixed question category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: &'static str,
    pub template: TemplateType,
    pub description: &'static str,
    pub group: CategoryGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_bounds() {
        assert!(CategoryId::new(0).is_err());
        assert!(CategoryId::new(46).is_err());
        assert!(CategoryId::new(-3).is_err());
        assert_eq!(CategoryId::new(1).unwrap().get(), 1);
        assert_eq!(CategoryId::new(45).unwrap(), CategoryId::REFUSAL);
        assert_eq!(CategoryId::all().count(), 45);
    }

    #[test]
    fn test_category_id_serde() {
        let id: CategoryId = serde_json::from_str("34").unwrap();
        assert_eq!(id.get(), 34);
        assert_eq!(serde_json::to_string(&id).unwrap(), "34");
        assert!(serde_json::from_str::<CategoryId>("99").is_err());
    }

    #[test]
    fn test_template_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&TemplateType::T2).unwrap(), "\"T2\"");
        assert!(TemplateType::T3.is_refusal());
        assert!(!TemplateType::T1.is_refusal());
    }
}
