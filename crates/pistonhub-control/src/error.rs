//! Error types for device control and schedule management.
//!
//! Validation and authorization failures are always raised before any side
//! effect, so a rejected call never leaves a partial write behind.

use pistonhub_core::{CoreError, DeviceId, ScheduleId};
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Input rejected by the validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The action is not `ACTIVATE` or `DEACTIVATE`.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The piston number is outside `1..=8`.
    #[error("invalid piston number: {0} (expected 1-8)")]
    InvalidPistonNumber(i64),

    /// The cron expression cannot be parsed.
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCronSyntax {
        /// The rejected expression.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The cron expression parses but has no future fire time.
    #[error("cron expression '{0}' never fires again")]
    CronNeverFires(String),
}

impl ValidationError {
    /// Stable machine-readable code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAction(_) => "invalid_action",
            Self::InvalidPistonNumber(_) => "invalid_piston_number",
            Self::InvalidCronSyntax { .. } => "invalid_cron_syntax",
            Self::CronNeverFires(_) => "cron_never_fires",
        }
    }
}

impl From<CoreError> for ValidationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPistonNumber(n) => Self::InvalidPistonNumber(n),
            CoreError::InvalidAction(a) => Self::InvalidAction(a),
        }
    }
}

/// Errors that can occur in control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request is malformed in a way not covered by [`ValidationError`].
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The device does not exist or is not owned by the caller.
    #[error("device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// The schedule does not exist or is not owned by the caller.
    #[error("schedule not found: {0}")]
    ScheduleNotFound(ScheduleId),

    /// The command could not be handed to the messaging transport.
    #[error("transport error: {0}")]
    Transport(#[from] pistonhub_transport::TransportError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] pistonhub_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ControlError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.into())
    }
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => 400,
            Self::DeviceNotFound(_) | Self::ScheduleNotFound(_) => 404,
            Self::Transport(_) => 502,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pistonhub_transport::TransportError;

    #[test]
    fn error_status_codes() {
        let device_id = DeviceId::from_bytes([1u8; 32]);

        assert_eq!(
            ControlError::from(ValidationError::InvalidPistonNumber(9)).http_status_code(),
            400
        );
        assert_eq!(
            ControlError::InvalidRequest("empty name".into()).http_status_code(),
            400
        );
        assert_eq!(ControlError::DeviceNotFound(device_id).http_status_code(), 404);
        assert_eq!(
            ControlError::ScheduleNotFound(ScheduleId::generate()).http_status_code(),
            404
        );
        assert_eq!(
            ControlError::Transport(TransportError::Unavailable("down".into())).http_status_code(),
            502
        );
        assert_eq!(ControlError::Internal("x".into()).http_status_code(), 500);
    }

    #[test]
    fn core_errors_become_validation_errors() {
        let err = ControlError::from(CoreError::InvalidAction("toggle".into()));
        assert!(matches!(
            err,
            ControlError::Validation(ValidationError::InvalidAction(ref a)) if a == "toggle"
        ));
    }

    #[test]
    fn validation_codes() {
        assert_eq!(
            ValidationError::CronNeverFires("x".into()).code(),
            "cron_never_fires"
        );
        assert_eq!(
            ValidationError::InvalidPistonNumber(0).code(),
            "invalid_piston_number"
        );
    }
}
