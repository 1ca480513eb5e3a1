use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::evaluation::models::FailureKind;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Everything that can stop an evaluation. Caught at the evaluator boundary
/// and turned into `EvaluationOutcome::Failed`; never reaches the caller raw.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Failed to download PDF. Status code: {status}")]
    Download { status: u16 },

    #[error("Failed to download PDF: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not write scratch file: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Could not read PDF: {0}")]
    Extraction(String),

    #[error("Could not extract text from PDF. Please ensure the PDF is readable.")]
    EmptyContent,

    #[error("Completion service error: {0}")]
    Service(#[from] LlmError),
}

impl EvaluationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EvaluationError::Download { .. } | EvaluationError::Transport(_) => {
                FailureKind::Download
            }
            EvaluationError::Storage(_) => FailureKind::Storage,
            EvaluationError::Extraction(_) => FailureKind::Extraction,
            EvaluationError::EmptyContent => FailureKind::EmptyContent,
            EvaluationError::Service(_) => FailureKind::Service,
        }
    }
}
