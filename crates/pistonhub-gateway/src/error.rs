//! API error type and the JSON error envelope.
//!
//! Every failure is rendered as `{"error": {"code": "...", "message": "..."}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use pistonhub_auth::AuthError;
use pistonhub_control::{ControlError, ValidationError};
use pistonhub_scheduler::SchedulerError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication token.
    #[error("unauthorized")]
    Unauthorized,

    /// The resource does not exist or belongs to someone else.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed path or body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Input rejected by the validation pipeline.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The command could not be handed to the device transport.
    #[error("device transport unavailable: {0}")]
    BadGateway(String),

    /// A dependency is switched off or not ready.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Validation(e) => e.code(),
            Self::BadGateway(_) => "transport_unavailable",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired
            | AuthError::InvalidSignature
            | AuthError::InvalidIssuer
            | AuthError::InvalidUserId
            | AuthError::InvalidToken(_) => Self::Unauthorized,
            AuthError::Internal(_) => {
                tracing::error!(error = %err, "Auth internal error");
                Self::Internal("authentication service error".to_string())
            }
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Validation(e) => Self::Validation(e),
            ControlError::InvalidRequest(msg) => Self::BadRequest(msg),
            ControlError::DeviceNotFound(id) => Self::NotFound(format!("device {id}")),
            ControlError::ScheduleNotFound(id) => Self::NotFound(format!("schedule {id}")),
            ControlError::Transport(e) => {
                tracing::warn!(error = %e, "Command not dispatched");
                Self::BadGateway(e.to_string())
            }
            ControlError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                Self::Internal("storage error".to_string())
            }
            ControlError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                Self::Internal(msg)
            }
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::NoUpcomingFire(_) => Self::BadRequest(err.to_string()),
            SchedulerError::Disabled => Self::ServiceUnavailable(err.to_string()),
            SchedulerError::Store(e) => {
                tracing::error!(error = %e, "Store error during scheduler reload");
                Self::Internal("storage error".to_string())
            }
        }
    }
}
