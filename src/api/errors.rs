use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::repositories::RepoError;
use crate::services::assignment_lifecycle::LifecycleError;
use crate::services::grading_status::GradingTransitionError;
use crate::services::question_paper::ExtractionError;
use crate::services::roster_import::ImportError;
use crate::services::rubric::RubricError;
use crate::tasks::grading::QueueError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{entity} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { .. } => ApiError::NotFound(capitalize(&err.to_string())),
            RepoError::AlreadyExists { .. }
            | RepoError::StaleWrite { .. }
            | RepoError::Closed { .. } => {
                ApiError::Conflict(capitalize(&err.to_string()))
            }
            RepoError::Inconsistent { .. } => ApiError::Internal(capitalize(&err.to_string())),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::SetupIncomplete { .. } => {
                ApiError::BadRequest(capitalize(&err.to_string()))
            }
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::GradingIncomplete { .. }
            | LifecycleError::Locked { .. } => ApiError::Conflict(capitalize(&err.to_string())),
        }
    }
}

impl From<GradingTransitionError> for ApiError {
    fn from(err: GradingTransitionError) -> Self {
        match err {
            GradingTransitionError::ScoreOutOfRange { .. } => {
                ApiError::BadRequest(capitalize(&err.to_string()))
            }
            GradingTransitionError::InvalidState { .. }
            | GradingTransitionError::RetryLimit { .. } => {
                ApiError::Conflict(capitalize(&err.to_string()))
            }
        }
    }
}

impl From<RubricError> for ApiError {
    fn from(err: RubricError) -> Self {
        match err {
            RubricError::UnknownCriterion(_) | RubricError::UnknownQuestion(_) => {
                ApiError::NotFound(capitalize(&err.to_string()))
            }
            _ => ApiError::BadRequest(capitalize(&err.to_string())),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repo(repo) => repo.into(),
            other => ApiError::BadRequest(capitalize(&other.to_string())),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        ApiError::BadRequest(capitalize(&err.to_string()))
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::AlreadyQueued => ApiError::Conflict(capitalize(&err.to_string())),
            QueueError::Closed => ApiError::internal(err, "Grading queue unavailable"),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
