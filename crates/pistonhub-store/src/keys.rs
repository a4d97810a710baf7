//! Key encoding utilities for `RocksDB`.
//!
//! All composite keys put the grouping identifier first so that prefix scans
//! return every row for one device or one owner. Integers are big-endian so
//! that byte order matches numeric order.

use pistonhub_core::{DeviceId, PistonNumber, ScheduleId, UserId};

use crate::error::{Result, StoreError};

/// Encode a device key (just the device ID bytes).
#[must_use]
pub fn device_key(device_id: &DeviceId) -> Vec<u8> {
    device_id.as_bytes().to_vec()
}

/// Encode an owner-device index key: `owner_id || device_id`.
#[must_use]
pub fn owner_device_key(owner_id: &UserId, device_id: &DeviceId) -> Vec<u8> {
    let mut key = Vec::with_capacity(64);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(device_id.as_bytes());
    key
}

/// Encode an owner prefix for scanning the owner indexes.
#[must_use]
pub fn owner_prefix(owner_id: &UserId) -> Vec<u8> {
    owner_id.as_bytes().to_vec()
}

/// Extract the device ID from an owner-device key.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key is not 64 bytes.
pub fn extract_device_id(cf: &'static str, key: &[u8]) -> Result<DeviceId> {
    let bytes: [u8; 32] = key
        .get(32..64)
        .and_then(|s| s.try_into().ok())
        .ok_or(StoreError::MalformedKey { cf, len: key.len() })?;
    Ok(DeviceId::from_bytes(bytes))
}

/// Encode a piston key: `device_id || piston_number`.
#[must_use]
pub fn piston_key(device_id: &DeviceId, piston_number: PistonNumber) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.extend_from_slice(device_id.as_bytes());
    key.push(piston_number.get());
    key
}

/// Encode a device prefix for scanning pistons and telemetry of one device.
#[must_use]
pub fn device_prefix(device_id: &DeviceId) -> Vec<u8> {
    device_id.as_bytes().to_vec()
}

/// Encode a schedule key (just the schedule UUID bytes).
#[must_use]
pub fn schedule_key(schedule_id: &ScheduleId) -> Vec<u8> {
    schedule_id.as_bytes().to_vec()
}

/// Encode an owner-schedule index key: `owner_id || schedule_id`.
#[must_use]
pub fn owner_schedule_key(owner_id: &UserId, schedule_id: &ScheduleId) -> Vec<u8> {
    let mut key = Vec::with_capacity(48);
    key.extend_from_slice(owner_id.as_bytes());
    key.extend_from_slice(schedule_id.as_bytes());
    key
}

/// Extract a schedule ID from the trailing 16 bytes of an index key.
///
/// Works for both the plain schedule key and the owner-schedule key.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key is shorter than 16 bytes.
pub fn extract_schedule_id(cf: &'static str, key: &[u8]) -> Result<ScheduleId> {
    let start = key
        .len()
        .checked_sub(16)
        .ok_or(StoreError::MalformedKey { cf, len: key.len() })?;
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[start..]);
    Ok(ScheduleId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Encode a telemetry key (big-endian event ID).
#[must_use]
pub fn telemetry_key(event_id: u64) -> [u8; 8] {
    event_id.to_be_bytes()
}

/// Encode a device-telemetry index key: `device_id || event_id`.
#[must_use]
pub fn device_telemetry_key(device_id: &DeviceId, event_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(device_id.as_bytes());
    key.extend_from_slice(&event_id.to_be_bytes());
    key
}

/// Extract the event ID from the trailing 8 bytes of a telemetry key.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key is shorter than 8 bytes.
pub fn extract_event_id(cf: &'static str, key: &[u8]) -> Result<u64> {
    let start = key
        .len()
        .checked_sub(8)
        .ok_or(StoreError::MalformedKey { cf, len: key.len() })?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[start..]);
    Ok(u64::from_be_bytes(bytes))
}
