use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::intake::upload::UploadError;
use crate::intake::validation::ValidationError;
use crate::mailer::{FailureKind, MailError};
use crate::response::ApiResponse;

const MAIL_UNAVAILABLE_MESSAGE: &str =
    "Our email service is temporarily unavailable. Please try again later.";
const GENERIC_FAILURE_MESSAGE: &str =
    "We could not submit your application. Please try again later.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload rejected: {0}")]
    UploadRejected(UploadError),

    #[error("Mail transport error: {0}")]
    Transport(MailError),

    #[error("Mail dispatch error: {0}")]
    Dispatch(MailError),

    #[error("Not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Storage(e) => {
                AppError::Internal(anyhow::Error::new(e).context("failed to store upload"))
            }
            other => AppError::UploadRejected(other),
        }
    }
}

fn mail_failure_message(err: &MailError) -> &'static str {
    match err.kind() {
        FailureKind::Authentication | FailureKind::Connection => MAIL_UNAVAILABLE_MESSAGE,
        FailureKind::Other => GENERIC_FAILURE_MESSAGE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(ValidationError::MissingField(field)) => (
                StatusCode::BAD_REQUEST,
                format!("All fields are required. Missing: {field}."),
            ),
            AppError::Validation(ValidationError::InvalidEmail) => (
                StatusCode::BAD_REQUEST,
                "Please provide a valid email address.".to_string(),
            ),
            AppError::UploadRejected(e) => {
                tracing::info!("Upload rejected: {e}");
                (StatusCode::BAD_REQUEST, e.user_message())
            }
            AppError::Transport(e) => {
                tracing::error!("Mail transport error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    mail_failure_message(e).to_string(),
                )
            }
            AppError::Dispatch(e) => {
                tracing::error!("Mail dispatch error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    mail_failure_message(e).to_string(),
                )
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Route not found.".to_string()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_FAILURE_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}
