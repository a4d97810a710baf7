//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pistonhub_core::{DeviceId, PistonNumber, ScheduleId, UserId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{Device, NewTelemetryEvent, Piston, ScheduleDefinition, TelemetryEvent};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    next_event_id: AtomicU64,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// Telemetry IDs continue from the highest ID already on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self {
            db: Arc::new(db),
            next_event_id: AtomicU64::new(1),
        };
        let last = store.last_event_id()?;
        store.next_event_id.store(last + 1, Ordering::SeqCst);

        tracing::debug!(next_event_id = last + 1, "opened store");
        Ok(store)
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect every key in `cf_name` that starts with `prefix`.
    fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut out = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(key);
        }
        Ok(out)
    }

    fn last_event_id(&self) -> Result<u64> {
        let cf = self.cf(cf::TELEMETRY)?;
        let mut iter = self.db.iterator_cf(&cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                keys::extract_event_id(cf::TELEMETRY, &key)
            }
            None => Ok(0),
        }
    }

    /// Assign the next event ID and add the event plus its device index entry to `batch`.
    fn stage_telemetry(
        &self,
        batch: &mut WriteBatch,
        event: NewTelemetryEvent,
    ) -> Result<TelemetryEvent> {
        let cf_telemetry = self.cf(cf::TELEMETRY)?;
        let cf_by_device = self.cf(cf::TELEMETRY_BY_DEVICE)?;

        let event_id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        let event = TelemetryEvent {
            event_id,
            device_id: event.device_id,
            piston_id: event.piston_id,
            event_type: event.event_type,
            payload: event.payload,
            created_at: chrono::Utc::now(),
        };
        let value = Self::serialize(&event)?;

        batch.put_cf(&cf_telemetry, keys::telemetry_key(event_id), &value);
        batch.put_cf(
            &cf_by_device,
            keys::device_telemetry_key(&event.device_id, event_id),
            [],
        );
        Ok(event)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Device Operations
    // =========================================================================

    fn put_device(&self, device: &Device) -> Result<()> {
        let cf_devices = self.cf(cf::DEVICES)?;
        let cf_by_owner = self.cf(cf::DEVICES_BY_OWNER)?;

        let value = Self::serialize(device)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_devices, keys::device_key(&device.device_id), &value);
        batch.put_cf(
            &cf_by_owner,
            keys::owner_device_key(&device.owner_id, &device.device_id),
            [],
        );
        self.write(batch)
    }

    fn get_device(&self, device_id: &DeviceId) -> Result<Option<Device>> {
        self.get_value(cf::DEVICES, &keys::device_key(device_id))
    }

    fn list_devices_by_owner(&self, owner_id: &UserId) -> Result<Vec<Device>> {
        let prefix = keys::owner_prefix(owner_id);

        let mut devices = Vec::new();
        for key in self.prefix_keys(cf::DEVICES_BY_OWNER, &prefix)? {
            let device_id = keys::extract_device_id(cf::DEVICES_BY_OWNER, &key)?;
            if let Some(device) = self.get_device(&device_id)? {
                devices.push(device);
            }
        }
        Ok(devices)
    }

    // =========================================================================
    // Piston Operations
    // =========================================================================

    fn get_piston(
        &self,
        device_id: &DeviceId,
        piston_number: PistonNumber,
    ) -> Result<Option<Piston>> {
        self.get_value(cf::PISTONS, &keys::piston_key(device_id, piston_number))
    }

    fn put_piston(&self, piston: &Piston) -> Result<()> {
        let cf = self.cf(cf::PISTONS)?;
        let key = keys::piston_key(&piston.device_id, piston.piston_number);
        let value = Self::serialize(piston)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, key, value);
        self.write(batch)
    }

    fn list_pistons(&self, device_id: &DeviceId) -> Result<Vec<Piston>> {
        let cf = self.cf(cf::PISTONS)?;
        let prefix = keys::device_prefix(device_id);

        let mut pistons = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            pistons.push(Self::deserialize(&value)?);
        }
        Ok(pistons)
    }

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    fn put_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
        let cf_schedules = self.cf(cf::SCHEDULES)?;
        let cf_by_owner = self.cf(cf::SCHEDULES_BY_OWNER)?;
        let cf_enabled = self.cf(cf::SCHEDULES_ENABLED)?;

        let key = keys::schedule_key(&schedule.schedule_id);
        let value = Self::serialize(schedule)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_schedules, &key, &value);
        batch.put_cf(
            &cf_by_owner,
            keys::owner_schedule_key(&schedule.owner_id, &schedule.schedule_id),
            [],
        );
        if schedule.enabled {
            batch.put_cf(&cf_enabled, &key, []);
        } else {
            batch.delete_cf(&cf_enabled, &key);
        }
        self.write(batch)
    }

    fn get_schedule(&self, schedule_id: &ScheduleId) -> Result<Option<ScheduleDefinition>> {
        self.get_value(cf::SCHEDULES, &keys::schedule_key(schedule_id))
    }

    fn delete_schedule(&self, schedule_id: &ScheduleId) -> Result<()> {
        let cf_schedules = self.cf(cf::SCHEDULES)?;
        let cf_by_owner = self.cf(cf::SCHEDULES_BY_OWNER)?;
        let cf_enabled = self.cf(cf::SCHEDULES_ENABLED)?;

        let schedule = self.get_schedule(schedule_id)?.ok_or(StoreError::NotFound)?;
        let key = keys::schedule_key(schedule_id);

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_schedules, &key);
        batch.delete_cf(
            &cf_by_owner,
            keys::owner_schedule_key(&schedule.owner_id, schedule_id),
        );
        batch.delete_cf(&cf_enabled, &key);
        self.write(batch)
    }

    fn list_schedules_by_owner(&self, owner_id: &UserId) -> Result<Vec<ScheduleDefinition>> {
        let prefix = keys::owner_prefix(owner_id);

        let mut schedules = Vec::new();
        for key in self.prefix_keys(cf::SCHEDULES_BY_OWNER, &prefix)? {
            let schedule_id = keys::extract_schedule_id(cf::SCHEDULES_BY_OWNER, &key)?;
            if let Some(schedule) = self.get_schedule(&schedule_id)? {
                schedules.push(schedule);
            }
        }
        Ok(schedules)
    }

    fn list_enabled_schedules(&self) -> Result<Vec<ScheduleDefinition>> {
        let cf_enabled = self.cf(cf::SCHEDULES_ENABLED)?;

        let mut schedules = Vec::new();
        for item in self.db.iterator_cf(&cf_enabled, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let schedule_id = keys::extract_schedule_id(cf::SCHEDULES_ENABLED, &key)?;
            if let Some(schedule) = self.get_schedule(&schedule_id)? {
                schedules.push(schedule);
            }
        }
        Ok(schedules)
    }

    // =========================================================================
    // Telemetry Operations
    // =========================================================================

    fn append_telemetry(&self, event: NewTelemetryEvent) -> Result<TelemetryEvent> {
        let mut batch = WriteBatch::default();
        let event = self.stage_telemetry(&mut batch, event)?;
        self.write(batch)?;
        Ok(event)
    }

    fn list_telemetry_by_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<TelemetryEvent>> {
        let cf_by_device = self.cf(cf::TELEMETRY_BY_DEVICE)?;
        let prefix = keys::device_prefix(device_id);
        let upper = keys::device_telemetry_key(device_id, u64::MAX);

        let mut events = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_device, IteratorMode::From(&upper, Direction::Reverse));

        for item in iter {
            if events.len() >= limit {
                break;
            }
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let event_id = keys::extract_event_id(cf::TELEMETRY_BY_DEVICE, &key)?;
            if let Some(event) = self.get_value(cf::TELEMETRY, &keys::telemetry_key(event_id))? {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn count_telemetry_by_device(&self, device_id: &DeviceId) -> Result<u64> {
        let prefix = keys::device_prefix(device_id);
        let keys = self.prefix_keys(cf::TELEMETRY_BY_DEVICE, &prefix)?;
        Ok(keys.len() as u64)
    }

    // =========================================================================
    // Combined Operations
    // =========================================================================

    fn record_piston_command(
        &self,
        piston: &Piston,
        event: NewTelemetryEvent,
    ) -> Result<TelemetryEvent> {
        let cf_pistons = self.cf(cf::PISTONS)?;
        let key = keys::piston_key(&piston.device_id, piston.piston_number);
        let value = Self::serialize(piston)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_pistons, key, value);
        let event = self.stage_telemetry(&mut batch, event)?;
        self.write(batch)?;
        Ok(event)
    }
}
