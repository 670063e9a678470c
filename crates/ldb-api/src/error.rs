//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`ObligationError`] from ldb-core to HTTP status codes and renders
//! the LicenseDB error envelope:
//!
//! ```json
//! {"status": 404, "message": "...", "error": "NOT_FOUND",
//!  "path": "/api/v1/obligations/x", "timestamp": "2024-01-01T00:00:00Z"}
//! ```
//!
//! `path` is not known when a handler returns; the response carries its
//! [`ErrorBody`] in an extension and
//! [`crate::middleware::envelope::error_envelope_middleware`] stamps the
//! request path before the body leaves the server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use ldb_core::ObligationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body.
    pub status: u16,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub error: String,
    /// Request path that produced the error.
    pub path: String,
    /// RFC 3339 time the error was produced.
    pub timestamp: String,
    /// Additional context, present only for client errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Internal error details are logged and never returned to clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request violates an obligation policy (400).
    #[error("{0}")]
    Validation(String),

    /// Body or query could not be decoded (400).
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// Missing or invalid API key (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Uniqueness conflict (409).
    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<String>,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Construct a bad-request error with the decoder's explanation attached.
    pub fn bad_request(message: &str, details: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.to_string(),
            details: Some(details.into()),
        }
    }

    /// Build the envelope for this error with an empty path.
    pub fn body(&self) -> ErrorBody {
        let (status, code) = self.status_and_code();

        let message = match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let details = match self {
            Self::BadRequest { details, .. } | Self::Conflict { details, .. } => details.clone(),
            _ => None,
        };

        ErrorBody {
            status: status.as_u16(),
            message,
            error: code.to_string(),
            path: String::new(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        if let Self::Internal(_) = &self {
            tracing::error!(error = %self, "internal server error");
        }

        let body = self.body();
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Convert ldb-core obligation errors to API errors.
impl From<ObligationError> for AppError {
    fn from(err: ObligationError) -> Self {
        match err {
            ObligationError::Validation(msg) => Self::Validation(msg),
            ObligationError::NotFound(msg) => Self::NotFound(msg),
            ObligationError::Conflict { message, detail } => Self::Conflict {
                message,
                details: Some(detail),
            },
            ObligationError::Internal(msg) => Self::Internal(msg),
        }
    }
}
