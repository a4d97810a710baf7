//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::Utc;
use pistonhub_core::{DeviceId, UserId};
use pistonhub_store::{Device, DeviceStatus, RocksStore, Store};
use tempfile::TempDir;

pub fn setup_store() -> (Arc<RocksStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    (Arc::new(store), dir)
}

pub fn register_device(store: &RocksStore, owner: &UserId, name: &str) -> Device {
    let now = Utc::now();
    let device = Device {
        device_id: DeviceId::generate_deterministic(owner, name, 1),
        owner_id: *owner,
        name: name.to_string(),
        transport_client_id: format!("esp32-{name}"),
        status: DeviceStatus::Unknown,
        created_at: now,
        updated_at: now,
    };
    store.put_device(&device).unwrap();
    device
}
