//! Uniform JSON response body for catalog endpoints.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// `{status_code, status, data, message?}`.
///
/// `status_code` is the semantic outcome; the transport status of an
/// envelope response is always 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status_code: u16,
    pub status: Status,
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(status_code: u16, data: Vec<T>) -> Self {
        Self {
            status_code,
            status: Status::Success,
            data,
            message: None,
        }
    }

    pub fn ok(data: Vec<T>) -> Self {
        Self::success(200, data)
    }

    pub fn failure(status_code: u16) -> Self {
        Self {
            status_code,
            status: Status::Failure,
            data: Vec::new(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
