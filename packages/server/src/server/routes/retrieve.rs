use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde::Deserialize;
use tattva::pipeline::RetrievedContext;
use tattva::StructuralFilter;

use super::validate_question;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub filters: StructuralFilter,
}

/// POST /api/retrieve
pub async fn retrieve_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Json<RetrievedContext>, ApiError> {
    let Json(request) = payload?;
    let question = validate_question(&request.question)?;

    let context = state.engine.retrieve(&question, request.filters).await?;
    tracing::debug!(
        passages = context.retrieval.passages.len(),
        category = %context.classification.category_id,
        "Retrieved context"
    );
    Ok(Json(context))
}
