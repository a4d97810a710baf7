//! Device control service implementation.
//!
//! This module provides the `DeviceControl` trait and `ControlService`, which
//! ties together the device registry, the dispatcher, the piston view, the
//! schedule repository, and the scheduler seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pistonhub_core::{DeviceId, PistonAction, ScheduleId, UserId};
use pistonhub_store::{Device, DeviceStatus, ScheduleDefinition, Store, TelemetryEvent};
use pistonhub_transport::Transport;

use crate::cron::{CronEvaluator, StandardCron};
use crate::dispatcher::{DispatchOrigin, PistonDispatcher};
use crate::error::{ControlError, Result};
use crate::scheduler_client::SchedulerClient;
use crate::types::{
    ControlConfig, CreateScheduleRequest, PistonSnapshot, PistonView, RegisterDeviceRequest,
    UpdateScheduleRequest,
};
use crate::{ownership, pistons, schedules};

/// Trait defining the device control operations.
///
/// Every operation is scoped to the calling user. Devices and schedules owned
/// by someone else are reported as not found.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    // =========================================================================
    // Device Registry
    // =========================================================================

    /// Register a device for `owner_id`. New devices start with `Unknown` status.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidRequest` if the name or transport client id is unusable.
    async fn register_device(
        &self,
        owner_id: &UserId,
        request: RegisterDeviceRequest,
    ) -> Result<Device>;

    /// List the caller's devices.
    async fn list_devices(&self, owner_id: &UserId) -> Result<Vec<Device>>;

    /// Get one of the caller's devices.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DeviceNotFound` if the device is missing or not owned.
    async fn get_device(&self, owner_id: &UserId, device_id: &DeviceId) -> Result<Device>;

    // =========================================================================
    // Pistons
    // =========================================================================

    /// Command a piston and record the resulting state.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an out-of-range piston, `DeviceNotFound`
    /// for a foreign device, or `Transport` if the command could not be sent.
    async fn control_piston(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
        piston_number: i64,
        action: PistonAction,
    ) -> Result<PistonSnapshot>;

    /// The eight-piston view of a device.
    async fn list_pistons(&self, owner_id: &UserId, device_id: &DeviceId)
        -> Result<Vec<PistonView>>;

    /// Recent telemetry for a device, newest first.
    async fn list_telemetry(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
        limit: Option<usize>,
    ) -> Result<Vec<TelemetryEvent>>;

    // =========================================================================
    // Schedules
    // =========================================================================

    /// Validate, persist, and register a schedule.
    async fn create_schedule(
        &self,
        owner_id: &UserId,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleDefinition>;

    /// Get one of the caller's schedules.
    async fn get_schedule(
        &self,
        owner_id: &UserId,
        schedule_id: &ScheduleId,
    ) -> Result<ScheduleDefinition>;

    /// List the caller's schedules.
    async fn list_schedules(&self, owner_id: &UserId) -> Result<Vec<ScheduleDefinition>>;

    /// Partially update a schedule and re-register its trigger.
    async fn update_schedule(
        &self,
        owner_id: &UserId,
        schedule_id: &ScheduleId,
        request: UpdateScheduleRequest,
    ) -> Result<ScheduleDefinition>;

    /// Delete a schedule and drop its trigger.
    async fn delete_schedule(&self, owner_id: &UserId, schedule_id: &ScheduleId) -> Result<()>;
}

/// The main device control service implementation.
///
/// Schedule mutations are serialized: each holds `schedule_writes` from its
/// store read through its scheduler mirror call, so the engine sees mutations
/// in the same order the store committed them.
pub struct ControlService<S: Store, T: Transport> {
    dispatcher: Arc<PistonDispatcher<S, T>>,
    scheduler: Arc<dyn SchedulerClient>,
    cron: Arc<dyn CronEvaluator>,
    config: ControlConfig,
    schedule_writes: tokio::sync::Mutex<()>,
}

impl<S: Store, T: Transport> ControlService<S, T> {
    /// Create a new control service using the standard cron evaluator.
    #[must_use]
    pub fn new(
        dispatcher: Arc<PistonDispatcher<S, T>>,
        scheduler: Arc<dyn SchedulerClient>,
        config: ControlConfig,
    ) -> Self {
        Self {
            dispatcher,
            scheduler,
            cron: Arc::new(StandardCron),
            config,
            schedule_writes: tokio::sync::Mutex::new(()),
        }
    }

    /// Replace the cron evaluator.
    #[must_use]
    pub fn with_cron_evaluator(mut self, cron: Arc<dyn CronEvaluator>) -> Self {
        self.cron = cron;
        self
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    /// Get the dispatcher shared with the scheduler engine.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<PistonDispatcher<S, T>> {
        &self.dispatcher
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    fn mirror_failed(schedule_id: &ScheduleId, op: &str, err: &ControlError) {
        tracing::error!(
            schedule_id = %schedule_id,
            op,
            error = %err,
            "Failed to mirror schedule into scheduler; reload to resync"
        );
    }
}

fn check_transport_client_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ControlError::InvalidRequest(
            "transport_client_id must not be empty".into(),
        ));
    }
    if id.contains(['/', '+', '#']) {
        return Err(ControlError::InvalidRequest(format!(
            "transport_client_id '{id}' contains a topic separator or wildcard"
        )));
    }
    Ok(())
}

#[async_trait]
impl<S: Store + 'static, T: Transport + 'static> DeviceControl for ControlService<S, T> {
    // =========================================================================
    // Device Registry
    // =========================================================================

    async fn register_device(
        &self,
        owner_id: &UserId,
        request: RegisterDeviceRequest,
    ) -> Result<Device> {
        if request.name.trim().is_empty() {
            return Err(ControlError::InvalidRequest(
                "device name must not be empty".into(),
            ));
        }
        check_transport_client_id(&request.transport_client_id)?;

        let now = Utc::now();
        let device = Device {
            device_id: DeviceId::generate(owner_id, &request.name),
            owner_id: *owner_id,
            name: request.name,
            transport_client_id: request.transport_client_id,
            status: DeviceStatus::Unknown,
            created_at: now,
            updated_at: now,
        };
        self.store().put_device(&device)?;

        tracing::info!(
            device_id = %device.device_id,
            owner_id = %owner_id,
            name = %device.name,
            "Registered device"
        );

        Ok(device)
    }

    async fn list_devices(&self, owner_id: &UserId) -> Result<Vec<Device>> {
        Ok(self.store().list_devices_by_owner(owner_id)?)
    }

    async fn get_device(&self, owner_id: &UserId, device_id: &DeviceId) -> Result<Device> {
        ownership::require_owned_device(self.store(), owner_id, device_id)
    }

    // =========================================================================
    // Pistons
    // =========================================================================

    async fn control_piston(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
        piston_number: i64,
        action: PistonAction,
    ) -> Result<PistonSnapshot> {
        self.dispatcher
            .control_piston(owner_id, device_id, piston_number, action, DispatchOrigin::Manual)
            .await
    }

    async fn list_pistons(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
    ) -> Result<Vec<PistonView>> {
        if !ownership::verify_ownership(self.store(), owner_id, device_id)? {
            return Err(ControlError::DeviceNotFound(*device_id));
        }
        pistons::piston_view(self.store(), device_id)
    }

    async fn list_telemetry(
        &self,
        owner_id: &UserId,
        device_id: &DeviceId,
        limit: Option<usize>,
    ) -> Result<Vec<TelemetryEvent>> {
        if !ownership::verify_ownership(self.store(), owner_id, device_id)? {
            return Err(ControlError::DeviceNotFound(*device_id));
        }
        let limit = self.config.telemetry_limit(limit);
        Ok(self.store().list_telemetry_by_device(device_id, limit)?)
    }

    // =========================================================================
    // Schedules
    // =========================================================================

    async fn create_schedule(
        &self,
        owner_id: &UserId,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleDefinition> {
        let _writes = self.schedule_writes.lock().await;
        let schedule =
            schedules::create_schedule(self.store(), &*self.cron, owner_id, request, Utc::now())?;

        tracing::info!(
            schedule_id = %schedule.schedule_id,
            device_id = %schedule.device_id,
            piston = schedule.piston_number.get(),
            cron = %schedule.cron_expression,
            enabled = schedule.enabled,
            "Created schedule"
        );

        if let Err(e) = self.scheduler.add_schedule(&schedule).await {
            Self::mirror_failed(&schedule.schedule_id, "add", &e);
        }
        Ok(schedule)
    }

    async fn get_schedule(
        &self,
        owner_id: &UserId,
        schedule_id: &ScheduleId,
    ) -> Result<ScheduleDefinition> {
        schedules::owned_schedule(self.store(), owner_id, schedule_id)
    }

    async fn list_schedules(&self, owner_id: &UserId) -> Result<Vec<ScheduleDefinition>> {
        schedules::list_schedules(self.store(), owner_id)
    }

    async fn update_schedule(
        &self,
        owner_id: &UserId,
        schedule_id: &ScheduleId,
        request: UpdateScheduleRequest,
    ) -> Result<ScheduleDefinition> {
        let _writes = self.schedule_writes.lock().await;
        let schedule = schedules::update_schedule(
            self.store(),
            &*self.cron,
            owner_id,
            schedule_id,
            request,
            Utc::now(),
        )?;

        tracing::info!(
            schedule_id = %schedule_id,
            enabled = schedule.enabled,
            "Updated schedule"
        );

        if let Err(e) = self.scheduler.update_schedule(&schedule).await {
            Self::mirror_failed(schedule_id, "update", &e);
        }
        Ok(schedule)
    }

    async fn delete_schedule(&self, owner_id: &UserId, schedule_id: &ScheduleId) -> Result<()> {
        let _writes = self.schedule_writes.lock().await;
        schedules::delete_schedule(self.store(), owner_id, schedule_id)?;

        tracing::info!(schedule_id = %schedule_id, "Deleted schedule");

        if let Err(e) = self.scheduler.remove_schedule(schedule_id).await {
            Self::mirror_failed(schedule_id, "remove", &e);
        }
        Ok(())
    }
}
