//! Request and response types for control operations.
//!
//! Schedule requests carry raw action strings and piston numbers so that the
//! validation pipeline, not the deserializer, decides what is rejected.

use chrono::{DateTime, Utc};
use pistonhub_core::{DeviceId, PistonId, PistonNumber, PistonState};
use pistonhub_store::Piston;
use serde::{Deserialize, Serialize};

/// Request to register a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    /// Human-readable name.
    pub name: String,
    /// Identity of the device on the messaging transport.
    pub transport_client_id: String,
}

impl RegisterDeviceRequest {
    /// Create a new request.
    #[must_use]
    pub fn new(name: impl Into<String>, transport_client_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport_client_id: transport_client_id.into(),
        }
    }
}

/// Request to create a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    /// Human-readable name.
    pub name: String,
    /// Target device.
    pub device_id: DeviceId,
    /// Target piston, validated to `1..=8`.
    pub piston_number: i64,
    /// `ACTIVATE` or `DEACTIVATE`, case-insensitive.
    pub action: String,
    /// Six- or seven-field cron expression.
    pub cron_expression: String,
    /// Whether the schedule should be registered with the scheduler.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

/// Partial update of a schedule. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New target piston.
    #[serde(default)]
    pub piston_number: Option<i64>,
    /// New action.
    #[serde(default)]
    pub action: Option<String>,
    /// New cron expression.
    #[serde(default)]
    pub cron_expression: Option<String>,
    /// Enable or disable the schedule.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Result of a successful piston command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PistonSnapshot {
    /// Row identifier.
    pub piston_id: PistonId,
    /// Piston channel.
    pub piston_number: PistonNumber,
    /// State after the command.
    pub state: PistonState,
    /// When the command was applied.
    pub last_triggered: DateTime<Utc>,
}

/// One entry of the eight-piston view of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PistonView {
    /// Row identifier, `None` if the piston was never commanded.
    pub piston_id: Option<PistonId>,
    /// Piston channel.
    pub piston_number: PistonNumber,
    /// Current state.
    pub state: PistonState,
    /// When the piston was last commanded.
    pub last_triggered: Option<DateTime<Utc>>,
}

impl PistonView {
    /// Default entry for a piston without a row.
    #[must_use]
    pub const fn never_triggered(piston_number: PistonNumber) -> Self {
        Self {
            piston_id: None,
            piston_number,
            state: PistonState::Inactive,
            last_triggered: None,
        }
    }
}

impl From<Piston> for PistonView {
    fn from(piston: Piston) -> Self {
        Self {
            piston_id: Some(piston.piston_id),
            piston_number: piston.piston_number,
            state: piston.state,
            last_triggered: piston.last_triggered,
        }
    }
}

/// Configuration for the control service.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Telemetry events returned when the caller gives no limit.
    pub telemetry_default_limit: usize,
    /// Upper bound on telemetry events returned per request.
    pub telemetry_page_limit: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            telemetry_default_limit: 50,
            telemetry_page_limit: 500,
        }
    }
}

impl ControlConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `TELEMETRY_DEFAULT_LIMIT`: Events returned when no limit is given
    /// - `TELEMETRY_PAGE_LIMIT`: Maximum events per request
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = std::env::var("TELEMETRY_DEFAULT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.telemetry_default_limit = n;
        }
        if let Some(n) = std::env::var("TELEMETRY_PAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.telemetry_page_limit = n;
        }

        config
    }

    /// Clamp a caller-supplied limit to the configured bounds.
    #[must_use]
    pub fn telemetry_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.telemetry_default_limit)
            .clamp(1, self.telemetry_page_limit.max(1))
    }
}
