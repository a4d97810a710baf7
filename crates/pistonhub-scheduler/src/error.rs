//! Error types for the scheduler crate.

use pistonhub_control::ControlError;
use pistonhub_core::ScheduleId;
use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The schedule's cron expression yields no fire time after now.
    #[error("schedule {0} has no upcoming fire time")]
    NoUpcomingFire(ScheduleId),

    /// The engine has been disabled by configuration.
    #[error("scheduler is disabled")]
    Disabled,

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] pistonhub_store::StoreError),
}

impl SchedulerError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NoUpcomingFire(_) => 400,
            Self::Disabled => 503,
            Self::Store(_) => 500,
        }
    }
}

impl From<SchedulerError> for ControlError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(e) => Self::Store(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// A specialized Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
