//! HTTP request handlers.

pub mod devices;
pub mod health;
pub mod internal;
pub mod pistons;
pub mod schedules;

use pistonhub_core::{DeviceId, ScheduleId};

use crate::error::ApiError;

/// Parse a device ID from a path segment.
pub(crate) fn parse_device_id(s: &str) -> Result<DeviceId, ApiError> {
    DeviceId::from_hex(s).map_err(|_| ApiError::BadRequest(format!("invalid device ID: {s}")))
}

/// Parse a schedule ID from a path segment.
pub(crate) fn parse_schedule_id(s: &str) -> Result<ScheduleId, ApiError> {
    s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid schedule ID: {s}")))
}
