use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tattva::ClassificationResult;

use super::validate_question;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub preferred_provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub classification: ClassificationResult,
}

/// POST /api/classify
///
/// Classification never fails: model errors degrade to the refusal
/// category inside the engine.
pub async fn classify_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(request) = payload?;
    let question = validate_question(&request.question)?;

    let classification = state
        .engine
        .classify(&question, request.preferred_provider.as_deref())
        .await;

    Ok(Json(ClassifyResponse {
        success: true,
        classification,
    }))
}
