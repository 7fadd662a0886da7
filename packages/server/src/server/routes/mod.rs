// HTTP routes
pub mod answer;
pub mod classify;
pub mod health;
pub mod providers;
pub mod retrieve;

pub use answer::*;
pub use classify::*;
pub use health::*;
pub use providers::*;
pub use retrieve::*;

use crate::server::error::ApiError;

pub const MIN_QUESTION_CHARS: usize = 3;
pub const MAX_QUESTION_CHARS: usize = 500;

/// Trimmed question, or a 400 naming the `question` field.
pub fn validate_question(question: &str) -> Result<String, ApiError> {
    let trimmed = question.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_QUESTION_CHARS {
        return Err(ApiError::invalid(
            "question",
            format!("Question must be at least {} characters", MIN_QUESTION_CHARS),
        ));
    }
    if chars > MAX_QUESTION_CHARS {
        return Err(ApiError::invalid(
            "question",
            format!("Question must be at most {} characters", MAX_QUESTION_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}
