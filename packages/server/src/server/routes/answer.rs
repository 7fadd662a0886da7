//! POST /api/answer
//!
//! Streams by default. Event order on the wire: one `context`, any number
//! of `partial`, then exactly one `complete` or `error`. Failures before
//! generation are plain JSON errors with a 5xx status.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tattva::{AnswerEvent, AnswerRequest};

use super::validate_question;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    #[serde(flatten)]
    pub request: AnswerRequest,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

pub async fn answer_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<AnswerBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(AnswerBody {
        mut request,
        stream,
    }) = payload?;
    request.question = validate_question(&request.question)?;

    if !stream {
        let outcome = state.engine.answer(request).await?;
        return Ok(Json(outcome).into_response());
    }

    // Classification and retrieval failures are answered with a status code;
    // only generation failures travel as `error` events
    let events = state
        .engine
        .answer_stream(request)
        .await?
        .map(|event| Ok::<_, Infallible>(sse_event(event)));

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn sse_event(event: AnswerEvent) -> Event {
    let built = match event {
        AnswerEvent::Context(context) => Event::default().event("context").json_data(&context),
        AnswerEvent::Partial(update) => Event::default().event("partial").json_data(&update),
        AnswerEvent::Complete(outcome) => Event::default().event("complete").json_data(&outcome),
        AnswerEvent::Failed { message } => Event::default().event("error").json_data(json!({
            "success": false,
            "error": "Generation failed",
            "message": message,
        })),
    };

    built.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode answer event");
        Event::default()
            .event("error")
            .data(r#"{"success":false,"error":"Internal server error"}"#)
    })
}
