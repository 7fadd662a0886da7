//! JSON error envelope for the HTTP API.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tattva::TattvaError;

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation (400).
    Validation(Vec<FieldError>),
    /// The answering pipeline failed.
    Pipeline(TattvaError),
}

impl ApiError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(TattvaError::AllProvidersFailed { .. }) => StatusCode::BAD_GATEWAY,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TattvaError> for ApiError {
    fn from(e: TattvaError) -> Self {
        Self::Pipeline(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(details) => ErrorBody {
                success: false,
                error: "Invalid request",
                message: None,
                details: Some(details),
            },
            Self::Pipeline(e) => {
                tracing::error!(error = %e, status = status.as_u16(), "Request failed");
                ErrorBody {
                    success: false,
                    error: if status == StatusCode::BAD_GATEWAY {
                        "All providers failed"
                    } else {
                        "Internal server error"
                    },
                    message: Some(e.to_string()),
                    details: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
