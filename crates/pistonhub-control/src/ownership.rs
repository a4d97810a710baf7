//! Ownership checks binding a device to the user that registered it.
//!
//! The guard reports a plain boolean; callers turn a failed check into
//! `ControlError::DeviceNotFound` so that "absent" and "not yours" look the
//! same from the outside.

use pistonhub_core::{DeviceId, UserId};
use pistonhub_store::{Device, Store};

use crate::error::{ControlError, Result};

/// Load `device_id` if it exists and is owned by `owner_id`.
///
/// # Errors
///
/// Returns an error only if the store fails.
pub fn owned_device<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
    device_id: &DeviceId,
) -> Result<Option<Device>> {
    Ok(store
        .get_device(device_id)?
        .filter(|device| device.owner_id == *owner_id))
}

/// True iff the device exists and its owner is `owner_id`.
///
/// # Errors
///
/// Returns an error only if the store fails.
pub fn verify_ownership<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
    device_id: &DeviceId,
) -> Result<bool> {
    Ok(store.owner_of(device_id)? == Some(*owner_id))
}

/// Load an owned device or fail with `DeviceNotFound`.
///
/// # Errors
///
/// Returns `ControlError::DeviceNotFound` if the device is missing or owned by someone else.
pub fn require_owned_device<S: Store + ?Sized>(
    store: &S,
    owner_id: &UserId,
    device_id: &DeviceId,
) -> Result<Device> {
    owned_device(store, owner_id, device_id)?.ok_or(ControlError::DeviceNotFound(*device_id))
}
