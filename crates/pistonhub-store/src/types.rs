//! Domain types stored in the database.
//!
//! These types represent the persisted state of devices, pistons, schedules,
//! and telemetry events.

use chrono::{DateTime, Utc};
use pistonhub_core::{
    DeviceId, PistonAction, PistonId, PistonNumber, PistonState, ScheduleId, UserId,
};
use serde::{Deserialize, Serialize};

/// A device record. Every device is owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique identifier for the device.
    pub device_id: DeviceId,
    /// Owner user ID.
    pub owner_id: UserId,
    /// Human-readable name.
    pub name: String,
    /// Client identity of the device on the messaging transport.
    pub transport_client_id: String,
    /// Last known connectivity status.
    pub status: DeviceStatus,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Connectivity status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// The device is connected to the broker.
    Online,
    /// The device was seen disconnecting.
    Offline,
    /// No status has been reported yet.
    #[default]
    Unknown,
}

/// A materialized piston row.
///
/// Rows are created lazily by the first command sent to a piston; a missing
/// row means "inactive, never triggered".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piston {
    /// Row identifier, assigned on first write.
    pub piston_id: PistonId,
    /// Device the piston belongs to.
    pub device_id: DeviceId,
    /// Channel number on the device.
    pub piston_number: PistonNumber,
    /// State after the last command.
    pub state: PistonState,
    /// When the last command was applied.
    pub last_triggered: Option<DateTime<Utc>>,
}

/// A persisted cron schedule that drives a piston automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    /// Unique identifier for the schedule.
    pub schedule_id: ScheduleId,
    /// Human-readable name.
    pub name: String,
    /// Target device.
    pub device_id: DeviceId,
    /// Target piston.
    pub piston_number: PistonNumber,
    /// Action to apply on every fire.
    pub action: PistonAction,
    /// Six- or seven-field cron expression.
    pub cron_expression: String,
    /// Disabled schedules are persisted but never registered with the scheduler.
    pub enabled: bool,
    /// User that created the schedule.
    pub owner_id: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Kind of state transition recorded in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    /// A piston was activated.
    Activated,
    /// A piston was deactivated.
    Deactivated,
}

impl From<PistonAction> for TelemetryEventType {
    fn from(action: PistonAction) -> Self {
        match action {
            PistonAction::Activate => Self::Activated,
            PistonAction::Deactivate => Self::Deactivated,
        }
    }
}

/// An immutable record of one piston state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Monotonically increasing identifier.
    pub event_id: u64,
    /// Device that was commanded.
    pub device_id: DeviceId,
    /// Piston row affected, if any.
    pub piston_id: Option<PistonId>,
    /// Transition kind.
    pub event_type: TelemetryEventType,
    /// JSON payload describing the transition.
    pub payload: serde_json::Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// A telemetry event before the store assigns its identifier and timestamp.
#[derive(Debug, Clone)]
pub struct NewTelemetryEvent {
    /// Device that was commanded.
    pub device_id: DeviceId,
    /// Piston row affected, if any.
    pub piston_id: Option<PistonId>,
    /// Transition kind.
    pub event_type: TelemetryEventType,
    /// JSON payload describing the transition.
    pub payload: serde_json::Value,
}
