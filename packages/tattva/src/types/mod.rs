//! Data types shared across the pipeline.

pub mod answer;
pub mod category;
pub mod classification;
pub mod generation;
pub mod retrieval;
pub mod trace;

pub use answer::{Answer, InterpretiveAnswer, RefusalAnswer, TextualAnswer, TextualBasis};
pub use category::{Category, CategoryGroup, CategoryId, TemplateType};
pub use classification::{ClassificationResult, ClassifierSource, QuestionIntent};
pub use generation::{cost_usd, pricing_for, Generated, ModelPricing, TokenUsage};
pub use retrieval::{
    Granularity, PassageMetadata, RetrievalConfig, RetrievalResult, RetrievedPassage,
    SearchFilter, StructuralFilter,
};
pub use trace::{
    ClassificationTrace, GenerationTrace, ShortcutKind, Trace, ValidationSummary,
};
