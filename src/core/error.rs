use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors a request can end with.
///
/// Client-facing bodies are short fixed strings; the detail carried by each
/// variant only goes to the log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) | AppError::InvalidFile(_) | AppError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::Storage(_) | AppError::Database(_) | AppError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed(_) => "Invalid request method",
            AppError::PayloadTooLarge(_) => "Invalid request: file size too large",
            AppError::InvalidFile(_) => "Invalid file. Check logs",
            AppError::Forbidden(_) => {
                "Invalid request: file is not an image or invalid auth token"
            }
            AppError::Storage(_) => "Unable to write file. Check logs",
            AppError::Database(_) => "Unable to save upload. Check logs",
            AppError::Template(_) => "Unable to load form",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        (status, self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
