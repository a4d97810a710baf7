//! Piston command dispatch.
//!
//! Every command, manual or scheduled, runs under a per-device async lock
//! held from the ownership check through the state write. Two commands for
//! the same device therefore persist in the order they were transmitted.
//! The piston row and its telemetry event land in one store write.
//!
//! Transmission is fire-and-forget. Once the transport has accepted the
//! command the piston row and telemetry are written as if the device obeyed;
//! a command dropped between broker and device leaves the stored state ahead
//! of the real one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pistonhub_core::{
    CommandToken, DeviceId, PistonAction, PistonId, PistonNumber, ScheduleId, UserId,
};
use pistonhub_store::{NewTelemetryEvent, Piston, Store, TelemetryEventType};
use pistonhub_transport::Transport;

use crate::error::{ControlError, Result};
use crate::ownership;
use crate::types::PistonSnapshot;

/// What triggered a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrigin {
    /// An API caller.
    Manual,
    /// A cron trigger of the given schedule.
    Scheduled(ScheduleId),
}

/// Per-device command locks. An entry lives only while some command holds
/// or awaits it.
#[derive(Default)]
struct DeviceLocks {
    locks: parking_lot::Mutex<HashMap<DeviceId, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeviceLocks {
    async fn acquire(&self, device_id: &DeviceId) -> DeviceGuard<'_> {
        let lock = Arc::clone(self.locks.lock().entry(*device_id).or_default());
        DeviceGuard {
            locks: self,
            device_id: *device_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drop the entry for `device_id` if nobody else references it.
    fn prune(&self, device_id: &DeviceId) {
        let mut locks = self.locks.lock();
        if locks
            .get(device_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(device_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

struct DeviceGuard<'a> {
    locks: &'a DeviceLocks,
    device_id: DeviceId,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for DeviceGuard<'_> {
    fn drop(&mut self) {
        // Release the device lock first so its Arc no longer counts.
        drop(self.guard.take());
        self.locks.prune(&self.device_id);
    }
}

/// Validates, authorizes, transmits, and records piston commands.
pub struct PistonDispatcher<S: Store, T: Transport> {
    store: Arc<S>,
    transport: Arc<T>,
    locks: DeviceLocks,
}

impl<S: Store, T: Transport> PistonDispatcher<S, T> {
    /// Create a dispatcher over the given store and transport.
    #[must_use]
    pub fn new(store: Arc<S>, transport: Arc<T>) -> Self {
        Self {
            store,
            transport,
            locks: DeviceLocks::default(),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Apply `action` to a piston of a device owned by `owner_id`.
    ///
    /// Steps, in order: validate the piston number, lock the device, check
    /// ownership, transmit, then write the piston row together with its
    /// telemetry event. A failure at any step leaves the later steps undone.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidPistonNumber` if `piston_number` is outside `1..=8`
    /// - `ControlError::DeviceNotFound` if the device is missing or not owned by `owner_id`
    /// - `ControlError::Transport` if the transport refuses the command
    /// - `ControlError::Store` if persisting state or telemetry fails
    pub async fn control_piston(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
        piston_number: i64,
        action: PistonAction,
        origin: DispatchOrigin,
    ) -> Result<PistonSnapshot> {
        let piston_number = PistonNumber::new(piston_number)?;

        let _guard = self.locks.acquire(device_id).await;

        let device = ownership::require_owned_device(&*self.store, owner_id, device_id)?;

        let token = CommandToken::new(action, piston_number);
        self.transport
            .publish(&device.transport_client_id, token, self.transport.encoding())
            .await?;

        let now = Utc::now();
        let piston = self.record_command(device_id, piston_number, action, now, origin)?;

        tracing::info!(
            device_id = %device_id,
            piston = piston_number.get(),
            action = %action,
            origin = ?origin,
            "Piston command dispatched"
        );

        Ok(PistonSnapshot {
            piston_id: piston.piston_id,
            piston_number,
            state: piston.state,
            last_triggered: now,
        })
    }

    /// Transmit a command without ownership checks or state bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DeviceNotFound` if the device no longer exists,
    /// or `ControlError::Transport` if the transport refuses the command.
    pub async fn transmit(
        &self,
        device_id: &DeviceId,
        piston_number: PistonNumber,
        action: PistonAction,
    ) -> Result<()> {
        let device = self
            .store
            .get_device(device_id)?
            .ok_or(ControlError::DeviceNotFound(*device_id))?;

        let token = CommandToken::new(action, piston_number);
        self.transport
            .publish(&device.transport_client_id, token, self.transport.encoding())
            .await?;

        tracing::debug!(device_id = %device_id, command = %token, "Command transmitted");
        Ok(())
    }

    fn record_command(
        &self,
        device_id: &DeviceId,
        piston_number: PistonNumber,
        action: PistonAction,
        now: DateTime<Utc>,
        origin: DispatchOrigin,
    ) -> Result<Piston> {
        let piston_id = self
            .store
            .get_piston(device_id, piston_number)?
            .map_or_else(PistonId::generate, |existing| existing.piston_id);

        let piston = Piston {
            piston_id,
            device_id: *device_id,
            piston_number,
            state: action.resulting_state(),
            last_triggered: Some(now),
        };

        let mut payload = serde_json::json!({
            "pistonNumber": piston_number.get(),
            "timestamp": now.to_rfc3339(),
        });
        if let DispatchOrigin::Scheduled(schedule_id) = origin {
            payload["scheduleId"] = serde_json::Value::String(schedule_id.to_string());
        }

        self.store.record_piston_command(
            &piston,
            NewTelemetryEvent {
                device_id: *device_id,
                piston_id: Some(piston_id),
                event_type: TelemetryEventType::from(action),
                payload,
            },
        )?;
        Ok(piston)
    }
}
