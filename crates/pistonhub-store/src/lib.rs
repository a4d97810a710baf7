//! `RocksDB` storage layer for pistonhub.
//!
//! This crate persists devices, piston state, schedule definitions, and the
//! telemetry log using `RocksDB` with column families for indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `devices`: Primary device records, keyed by `device_id`
//! - `devices_by_owner`: Index for listing devices by owner
//! - `pistons`: Piston rows, keyed by `device_id || piston_number`
//! - `schedules`: Primary schedule records, keyed by `schedule_id`
//! - `schedules_by_owner`: Index for listing schedules by owner
//! - `schedules_enabled`: Index of schedules the scheduler must register
//! - `telemetry`: Append-only event log, keyed by event ID
//! - `telemetry_by_device`: Index for reading one device's history
//!
//! Every trait method that writes commits a single `WriteBatch`, so each
//! repository operation is atomic.
//!
//! # Example
//!
//! ```no_run
//! use pistonhub_store::{RocksStore, Store};
//! use pistonhub_core::UserId;
//!
//! let store = RocksStore::open("/tmp/pistonhub-db").unwrap();
//!
//! let owner = UserId::from_bytes([0u8; 32]);
//! let devices = store.list_devices_by_owner(&owner).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Device, DeviceStatus, NewTelemetryEvent, Piston, ScheduleDefinition, TelemetryEvent,
    TelemetryEventType,
};

use pistonhub_core::{DeviceId, PistonNumber, ScheduleId, UserId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so that services can be tested
/// against any implementation.
pub trait Store: Send + Sync {
    // =========================================================================
    // Device Operations
    // =========================================================================

    /// Insert or update a device record.
    ///
    /// This also maintains the owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_device(&self, device: &Device) -> Result<()>;

    /// Get a device by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_device(&self, device_id: &DeviceId) -> Result<Option<Device>>;

    /// List all devices belonging to an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_devices_by_owner(&self, owner_id: &UserId) -> Result<Vec<Device>>;

    /// Look up the owner of a device, or `None` if the device is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn owner_of(&self, device_id: &DeviceId) -> Result<Option<UserId>> {
        Ok(self.get_device(device_id)?.map(|d| d.owner_id))
    }

    // =========================================================================
    // Piston Operations
    // =========================================================================

    /// Get the piston row for `(device_id, piston_number)` if it was ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_piston(
        &self,
        device_id: &DeviceId,
        piston_number: PistonNumber,
    ) -> Result<Option<Piston>>;

    /// Insert or replace the piston row for `(piston.device_id, piston.piston_number)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_piston(&self, piston: &Piston) -> Result<()>;

    /// List the materialized piston rows of a device, ordered by piston number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pistons(&self, device_id: &DeviceId) -> Result<Vec<Piston>>;

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    /// Insert or update a schedule definition.
    ///
    /// This also maintains the owner and enabled indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_schedule(&self, schedule: &ScheduleDefinition) -> Result<()>;

    /// Get a schedule by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_schedule(&self, schedule_id: &ScheduleId) -> Result<Option<ScheduleDefinition>>;

    /// Delete a schedule by ID, removing it from all indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the schedule doesn't exist.
    fn delete_schedule(&self, schedule_id: &ScheduleId) -> Result<()>;

    /// List all schedules created by an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_schedules_by_owner(&self, owner_id: &UserId) -> Result<Vec<ScheduleDefinition>>;

    /// List every enabled schedule across all owners.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_enabled_schedules(&self) -> Result<Vec<ScheduleDefinition>>;

    // =========================================================================
    // Telemetry Operations
    // =========================================================================

    /// Append a telemetry event, assigning the next event ID and timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_telemetry(&self, event: NewTelemetryEvent) -> Result<TelemetryEvent>;

    /// List the most recent telemetry events of a device, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_telemetry_by_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<TelemetryEvent>>;

    /// Count the telemetry events recorded for a device.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_telemetry_by_device(&self, device_id: &DeviceId) -> Result<u64>;

    // =========================================================================
    // Combined Operations
    // =========================================================================

    /// Replace a piston row and append its telemetry event in one atomic write.
    ///
    /// Either both the new piston state and the event become visible, or neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_piston_command(
        &self,
        piston: &Piston,
        event: NewTelemetryEvent,
    ) -> Result<TelemetryEvent>;
}
