use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::WebResponse;

/// Request-scoped failures. None of these touch shared limiter state.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    // Peer address missing or unparseable
    #[error("malformed client address: {0}")]
    MalformedClientId(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MalformedClientId(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // server faults stay generic on the wire
        let detail = match &self {
            ApiError::NotFound(_) | ApiError::Validation(_) => Some(self.to_string()),
            ApiError::MalformedClientId(_) | ApiError::Internal(_) => None,
        };
        (status, Json(WebResponse::new(status, detail))).into_response()
    }
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("burst must be at least 1")]
    ZeroBurst,

    #[error("rate must be a positive number of tokens per second, got {0}")]
    InvalidRate(f64),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
