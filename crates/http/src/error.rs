//! Error handling for the bookshelf HTTP layer

use axum::response::{IntoResponse, Response};
use bookshelf_db::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::envelope::Envelope;

/// Application error types, rendered as failure envelopes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("remote unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("bad gateway: {message}")]
    BadGateway { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
        }
    }

    /// Embedded `status_code` for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Internal(_) => 500,
            AppError::BadGateway { .. } => 502,
            AppError::RemoteUnavailable { .. } => 503,
        }
    }

    /// Machine-readable error code used in logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::Conflict { .. } => "conflict",
            AppError::NotFound { .. } => "not_found",
            AppError::RemoteUnavailable { .. } => "remote_unavailable",
            AppError::BadGateway { .. } => "bad_gateway",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// The failure envelope this error renders to
    pub fn to_envelope<T>(&self) -> Envelope<T> {
        let message = match self {
            AppError::Validation { message }
            | AppError::Conflict { message }
            | AppError::NotFound { message }
            | AppError::RemoteUnavailable { message }
            | AppError::BadGateway { message } => message.clone(),
            // Internal details stay in the logs for release builds
            AppError::Internal(e) if cfg!(debug_assertions) => e.to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        };

        Envelope::failure(self.status_code()).with_message(message)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation { .. } => AppError::conflict(err.to_string()),
            StoreError::Database(_) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();

        match &self {
            AppError::Internal(e) => tracing::error!(
                error_id = %error_id,
                error_code = self.code(),
                status_code = self.status_code(),
                error = ?e,
                "Request error"
            ),
            _ => tracing::warn!(
                error_id = %error_id,
                error_code = self.code(),
                status_code = self.status_code(),
                error = %self,
                "Request rejected"
            ),
        }

        self.to_envelope::<serde_json::Value>().into_response()
    }
}
