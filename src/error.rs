//! Error types for the Dossier server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::form::FormError;
use crate::repository::ConnectionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Repository(#[from] ConnectionError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Form(e) => match e {
                FormError::Validation(_) => StatusCode::BAD_REQUEST,
                FormError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FormError::Busy => StatusCode::CONFLICT,
                FormError::SessionNotFound(_) => StatusCode::UNAUTHORIZED,
                FormError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::BadRequest(_) | AppError::Multipart(_) => "bad_request",
            AppError::Internal(_) => "internal_error",
            AppError::Form(FormError::Validation(_)) => "validation_error",
            AppError::Form(FormError::Extraction(_)) => "extraction_error",
            AppError::Form(FormError::Busy) => "busy",
            AppError::Form(FormError::SessionNotFound(_)) => "unauthorized",
            AppError::Form(FormError::Aborted(_)) => "internal_error",
            AppError::Repository(_) => "connection_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            AppError::Form(FormError::Validation(e)) => Some(e.missing.clone()),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.error_type().to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}
