//! Seam through which schedule mutations reach the scheduler engine.
//!
//! The control service persists a schedule first and then mirrors the change
//! here. A failed mirror does not roll back the stored definition; the engine's
//! `reload_all` rebuilds its triggers from the store.

use async_trait::async_trait;
use pistonhub_core::ScheduleId;
use pistonhub_store::ScheduleDefinition;

use crate::error::Result;

/// Operations the control service needs from a scheduler engine.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Register a trigger for a newly created schedule. Disabled schedules are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot compute a fire time for the schedule.
    async fn add_schedule(&self, schedule: &ScheduleDefinition) -> Result<()>;

    /// Drop any trigger for the schedule, then re-register it if it is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot compute a fire time for the schedule.
    async fn update_schedule(&self, schedule: &ScheduleDefinition) -> Result<()>;

    /// Drop the trigger for `schedule_id`. Removing an unknown id succeeds.
    ///
    /// # Errors
    ///
    /// Implementations may fail if the engine is unreachable.
    async fn remove_schedule(&self, schedule_id: &ScheduleId) -> Result<()>;
}

/// Scheduler client for deployments without a scheduler engine.
///
/// Schedules are persisted but never fire.
#[derive(Debug, Clone, Default)]
pub struct NoopSchedulerClient;

impl NoopSchedulerClient {
    /// Create a new no-op scheduler client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SchedulerClient for NoopSchedulerClient {
    async fn add_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
        tracing::warn!(
            schedule_id = %schedule.schedule_id,
            "add_schedule called but no scheduler configured"
        );
        Ok(())
    }

    async fn update_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
        tracing::warn!(
            schedule_id = %schedule.schedule_id,
            "update_schedule called but no scheduler configured"
        );
        Ok(())
    }

    async fn remove_schedule(&self, schedule_id: &ScheduleId) -> Result<()> {
        tracing::warn!(
            schedule_id = %schedule_id,
            "remove_schedule called but no scheduler configured"
        );
        Ok(())
    }
}

/// In-memory scheduler client for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    use super::{async_trait, Result, ScheduleDefinition, ScheduleId, SchedulerClient};
    use crate::error::ControlError;

    /// One mirrored mutation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SchedulerCall {
        /// `add_schedule` with the given id.
        Add(ScheduleId),
        /// `update_schedule` with the given id.
        Update(ScheduleId),
        /// `remove_schedule` with the given id.
        Remove(ScheduleId),
    }

    /// Scheduler client that records calls and mirrors enabled schedules into a map.
    #[derive(Debug, Default)]
    pub struct MockSchedulerClient {
        calls: Mutex<Vec<SchedulerCall>>,
        active: Mutex<HashMap<ScheduleId, ScheduleDefinition>>,
        failing: AtomicBool,
    }

    impl MockSchedulerClient {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent calls fail with `ControlError::Internal`.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Every call received, in order.
        pub fn calls(&self) -> Vec<SchedulerCall> {
            self.calls.lock().clone()
        }

        /// Whether an enabled schedule with this id is currently mirrored.
        pub fn is_active(&self, schedule_id: &ScheduleId) -> bool {
            self.active.lock().contains_key(schedule_id)
        }

        /// Number of mirrored enabled schedules.
        pub fn active_count(&self) -> usize {
            self.active.lock().len()
        }

        fn record(&self, call: SchedulerCall) -> Result<()> {
            self.calls.lock().push(call);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ControlError::Internal("scheduler unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SchedulerClient for MockSchedulerClient {
        async fn add_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
            self.record(SchedulerCall::Add(schedule.schedule_id))?;
            if schedule.enabled {
                self.active
                    .lock()
                    .insert(schedule.schedule_id, schedule.clone());
            }
            Ok(())
        }

        async fn update_schedule(&self, schedule: &ScheduleDefinition) -> Result<()> {
            self.record(SchedulerCall::Update(schedule.schedule_id))?;
            let mut active = self.active.lock();
            active.remove(&schedule.schedule_id);
            if schedule.enabled {
                active.insert(schedule.schedule_id, schedule.clone());
            }
            Ok(())
        }

        async fn remove_schedule(&self, schedule_id: &ScheduleId) -> Result<()> {
            self.record(SchedulerCall::Remove(*schedule_id))?;
            self.active.lock().remove(schedule_id);
            Ok(())
        }
    }
}
