//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary device records, keyed by `device_id`.
    pub const DEVICES: &str = "devices";

    /// Index: devices by owner, keyed by `owner_id || device_id`.
    pub const DEVICES_BY_OWNER: &str = "devices_by_owner";

    /// Piston rows, keyed by `device_id || piston_number`.
    pub const PISTONS: &str = "pistons";

    /// Primary schedule records, keyed by `schedule_id`.
    pub const SCHEDULES: &str = "schedules";

    /// Index: schedules by owner, keyed by `owner_id || schedule_id`.
    pub const SCHEDULES_BY_OWNER: &str = "schedules_by_owner";

    /// Index: enabled schedules, keyed by `schedule_id`.
    pub const SCHEDULES_ENABLED: &str = "schedules_enabled";

    /// Telemetry events, keyed by big-endian `event_id`.
    pub const TELEMETRY: &str = "telemetry";

    /// Index: telemetry by device, keyed by `device_id || event_id`.
    pub const TELEMETRY_BY_DEVICE: &str = "telemetry_by_device";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::DEVICES,
        cf::DEVICES_BY_OWNER,
        cf::PISTONS,
        cf::SCHEDULES,
        cf::SCHEDULES_BY_OWNER,
        cf::SCHEDULES_ENABLED,
        cf::TELEMETRY,
        cf::TELEMETRY_BY_DEVICE,
    ]
}
