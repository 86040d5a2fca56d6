//! Error handling module for the Contract Hub backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const DOCUMENT_GENERATION_FAILED: &str = "DOCUMENT_GENERATION_FAILED";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const UPSTREAM_TIMEOUT: &str = "UPSTREAM_TIMEOUT";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// How an external collaborator call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// The call exceeded its deadline.
    Timeout,
    /// The collaborator answered with a non-success status.
    Status,
    /// The request never completed (connect/read failure, bad payload).
    Transport,
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Persisted collection missing or malformed
    Storage(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Contract status transition not allowed by the lifecycle table
    InvalidTransition { from: String, to: String },
    /// Document provider could not produce a document
    DocumentGeneration(String),
    /// An external collaborator call failed
    Upstream {
        service: &'static str,
        kind: UpstreamKind,
        message: String,
    },
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Build an upstream error from a `reqwest` failure, classifying timeouts.
    pub fn upstream(service: &'static str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            UpstreamKind::Timeout
        } else {
            UpstreamKind::Transport
        };
        AppError::Upstream {
            service,
            kind,
            message: err.to_string(),
        }
    }

    /// Build an upstream error from a non-success response status.
    pub fn upstream_status(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        AppError::Upstream {
            service,
            kind: UpstreamKind::Status,
            message: format!("{} responded {}: {}", service, status, body),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::DocumentGeneration(_) => StatusCode::BAD_GATEWAY,
            AppError::Upstream { kind, .. } => match kind {
                UpstreamKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::InvalidTransition { .. } => codes::INVALID_TRANSITION,
            AppError::DocumentGeneration(_) => codes::DOCUMENT_GENERATION_FAILED,
            AppError::Upstream { kind, .. } => match kind {
                UpstreamKind::Timeout => codes::UPSTREAM_TIMEOUT,
                _ => codes::UPSTREAM_ERROR,
            },
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Storage(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidTransition { from, to } => {
                format!("Cannot transition contract from {} to {}", from, to)
            }
            AppError::DocumentGeneration(msg) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Storage(format!("Malformed collection: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
