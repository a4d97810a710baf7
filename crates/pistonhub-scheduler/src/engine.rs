//! Cron scheduler engine.
//!
//! Each enabled schedule gets one timer task. The task waits until the wall
//! clock reaches the next fire time, hands the fire off to a separate task,
//! and computes the fire after that from whichever is later: the wall clock
//! or the slot it just fired. A wake-up that comes late therefore produces a
//! single catch-up fire and then resumes at the next future slot; missed
//! slots in between are skipped.
//!
//! The wait is a series of monotonic sleeps of at most [`MAX_TICK`], with the
//! wall clock re-read after each one, so a forward clock jump or a resume
//! from host suspend is noticed within one tick.
//!
//! Fires never retry. A failure is logged and the next cron occurrence is the
//! only retry path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pistonhub_control::{
    ControlError, CronEvaluator, DispatchOrigin, PistonDispatcher, SchedulerClient,
    StandardCron,
};
use pistonhub_core::ScheduleId;
use pistonhub_store::{ScheduleDefinition, Store};
use pistonhub_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulerError};
use crate::registry::{Trigger, TriggerRegistry};
use crate::types::{FireScope, SchedulerConfig, TriggerInfo};

/// Longest single sleep a trigger takes before re-reading the wall clock.
pub const MAX_TICK: Duration = Duration::from_secs(30);

/// Administrative view of a scheduler engine.
pub trait SchedulerAdmin: Send + Sync {
    /// Drop every trigger and rebuild the set from the store's enabled schedules.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is disabled or the store fails.
    fn reload_all(&self) -> Result<usize>;

    /// Live triggers ordered by next fire time.
    fn triggers(&self) -> Vec<TriggerInfo>;

    /// Whether the engine has been started and not stopped.
    fn is_running(&self) -> bool;
}

/// The time after `scheduled` at which a trigger should fire next.
///
/// Counting from the later of `now` and `scheduled` guarantees the same slot
/// never fires twice and that a late wake-up skips the slots it slept through.
#[must_use]
pub fn following_fire(
    cron: &dyn CronEvaluator,
    expression: &str,
    scheduled: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    cron.next_fire_after(expression, now.max(scheduled))
}

struct FireContext<S: Store, T: Transport> {
    dispatcher: Arc<PistonDispatcher<S, T>>,
    cron: Arc<dyn CronEvaluator>,
    clock: Arc<dyn Clock>,
    scope: FireScope,
    misfire_grace: Duration,
}

impl<S: Store, T: Transport> Clone for FireContext<S, T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            cron: Arc::clone(&self.cron),
            clock: Arc::clone(&self.clock),
            scope: self.scope,
            misfire_grace: self.misfire_grace,
        }
    }
}

/// Scheduler engine keeping one timer per enabled schedule.
pub struct CronScheduler<S: Store, T: Transport> {
    ctx: FireContext<S, T>,
    config: SchedulerConfig,
    registry: TriggerRegistry,
    running: AtomicBool,
}

impl<S: Store + 'static, T: Transport + 'static> CronScheduler<S, T> {
    /// Create a stopped engine that fires through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<PistonDispatcher<S, T>>, config: SchedulerConfig) -> Self {
        Self {
            ctx: FireContext {
                dispatcher,
                cron: Arc::new(StandardCron),
                clock: Arc::new(SystemClock),
                scope: config.fire_scope,
                misfire_grace: config.misfire_grace(),
            },
            config,
            registry: TriggerRegistry::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Replace the cron evaluator.
    #[must_use]
    pub fn with_cron_evaluator(mut self, cron: Arc<dyn CronEvaluator>) -> Self {
        self.ctx.cron = cron;
        self
    }

    /// Replace the wall-clock source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start the engine and register a trigger for every enabled schedule.
    ///
    /// Must be called from within a Tokio runtime. Returns the number of
    /// triggers registered. A disabled engine stays stopped and returns 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. The engine is then left stopped
    /// with no triggers.
    pub fn start(&self) -> Result<usize> {
        if !self.config.enabled {
            info!("Scheduler disabled by configuration");
            return Ok(0);
        }

        self.running.store(true, Ordering::SeqCst);
        match self.reload() {
            Ok(count) => {
                info!(
                    triggers = count,
                    fire_scope = %self.config.fire_scope,
                    "Scheduler started"
                );
                Ok(count)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.registry.clear();
                error!(error = %e, "Scheduler failed to start");
                Err(e)
            }
        }
    }

    /// Stop the engine and drop every trigger. In-flight fires complete.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let dropped = self.registry.clear();
        info!(triggers = dropped, "Scheduler stopped");
    }

    /// Register a trigger for `schedule`.
    ///
    /// The trigger runs the definition currently in the store, not the one
    /// passed in. Returns `false` without registering anything if either copy
    /// is disabled, the schedule is no longer stored, or the engine is not
    /// running.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NoUpcomingFire` if the expression has no fire
    /// time after now, or `SchedulerError::Store` if the store read fails.
    pub fn add_schedule(&self, schedule: &ScheduleDefinition) -> Result<bool> {
        if !schedule.enabled || !self.is_running() {
            return Ok(false);
        }

        let Some(schedule) = self
            .ctx
            .dispatcher
            .store()
            .get_schedule(&schedule.schedule_id)?
            .filter(|stored| stored.enabled)
        else {
            debug!(
                schedule_id = %schedule.schedule_id,
                "Schedule deleted or disabled in store; trigger not registered"
            );
            return Ok(false);
        };

        let now = self.ctx.clock.now();
        let first = self
            .ctx
            .cron
            .next_fire_after(&schedule.cron_expression, now)
            .ok_or(SchedulerError::NoUpcomingFire(schedule.schedule_id))?;

        let next_fire_at = Arc::new(Mutex::new(first));
        let schedule_id = schedule.schedule_id;
        let handle = tokio::spawn(run_trigger(
            self.ctx.clone(),
            schedule,
            Arc::clone(&next_fire_at),
        ));
        self.registry
            .insert(schedule_id, Trigger::new(handle, next_fire_at));

        debug!(
            schedule_id = %schedule_id,
            next_fire_at = %first,
            "Trigger registered"
        );
        Ok(true)
    }

    /// Drop any trigger for the schedule, then re-register it if enabled.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NoUpcomingFire` if the expression has no fire time after now.
    pub fn update_schedule(&self, schedule: &ScheduleDefinition) -> Result<bool> {
        self.registry.remove(&schedule.schedule_id);
        self.add_schedule(schedule)
    }

    /// Drop the trigger for a schedule. Returns whether one existed.
    pub fn remove_schedule(&self, schedule_id: &ScheduleId) -> bool {
        let removed = self.registry.remove(schedule_id);
        if removed {
            debug!(schedule_id = %schedule_id, "Trigger removed");
        }
        removed
    }

    /// Number of live triggers.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.registry.len()
    }

    /// Next fire time of a schedule's trigger.
    #[must_use]
    pub fn next_fire_time(&self, schedule_id: &ScheduleId) -> Option<DateTime<Utc>> {
        self.registry.next_fire_at(schedule_id)
    }

    fn reload(&self) -> Result<usize> {
        if !self.is_running() {
            return Err(SchedulerError::Disabled);
        }

        self.registry.clear();
        let schedules = self.ctx.dispatcher.store().list_enabled_schedules()?;

        let mut registered = 0;
        for schedule in &schedules {
            match self.add_schedule(schedule) {
                Ok(true) => registered += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    schedule_id = %schedule.schedule_id,
                    error = %e,
                    "Skipping schedule during reload"
                ),
            }
        }

        info!(
            enabled = schedules.len(),
            registered,
            "Trigger set reloaded"
        );
        Ok(registered)
    }
}

impl<S: Store + 'static, T: Transport + 'static> SchedulerAdmin for CronScheduler<S, T> {
    fn reload_all(&self) -> Result<usize> {
        self.reload()
    }

    fn triggers(&self) -> Vec<TriggerInfo> {
        self.registry.snapshot()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Store + 'static, T: Transport + 'static> SchedulerClient for CronScheduler<S, T> {
    async fn add_schedule(&self, schedule: &ScheduleDefinition) -> pistonhub_control::Result<()> {
        CronScheduler::add_schedule(self, schedule)
            .map(|_| ())
            .map_err(ControlError::from)
    }

    async fn update_schedule(
        &self,
        schedule: &ScheduleDefinition,
    ) -> pistonhub_control::Result<()> {
        CronScheduler::update_schedule(self, schedule)
            .map(|_| ())
            .map_err(ControlError::from)
    }

    async fn remove_schedule(&self, schedule_id: &ScheduleId) -> pistonhub_control::Result<()> {
        CronScheduler::remove_schedule(self, schedule_id);
        Ok(())
    }
}

async fn run_trigger<S: Store + 'static, T: Transport + 'static>(
    ctx: FireContext<S, T>,
    schedule: ScheduleDefinition,
    next_fire_at: Arc<Mutex<DateTime<Utc>>>,
) {
    loop {
        let scheduled = *next_fire_at.lock();
        while let Ok(remaining) = (scheduled - ctx.clock.now()).to_std() {
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(remaining.min(MAX_TICK)).await;
        }

        let now = ctx.clock.now();
        if let Ok(lateness) = (now - scheduled).to_std() {
            if lateness > ctx.misfire_grace {
                warn!(
                    schedule_id = %schedule.schedule_id,
                    scheduled_for = %scheduled,
                    late_by_ms = u64::try_from(lateness.as_millis()).unwrap_or(u64::MAX),
                    "Misfire: firing once to catch up"
                );
            }
        }

        tokio::spawn(fire(ctx.clone(), schedule.clone()));

        match following_fire(&*ctx.cron, &schedule.cron_expression, scheduled, now) {
            Some(next) => *next_fire_at.lock() = next,
            None => {
                info!(
                    schedule_id = %schedule.schedule_id,
                    "Schedule has no further fire times; trigger retired"
                );
                break;
            }
        }
    }
}

async fn fire<S: Store + 'static, T: Transport + 'static>(
    ctx: FireContext<S, T>,
    schedule: ScheduleDefinition,
) {
    let result = match ctx.scope {
        FireScope::Unified => ctx
            .dispatcher
            .control_piston(
                &schedule.owner_id,
                &schedule.device_id,
                i64::from(schedule.piston_number.get()),
                schedule.action,
                DispatchOrigin::Scheduled(schedule.schedule_id),
            )
            .await
            .map(|_| ()),
        FireScope::TransmitOnly => {
            ctx.dispatcher
                .transmit(&schedule.device_id, schedule.piston_number, schedule.action)
                .await
        }
    };

    match result {
        Ok(()) => info!(
            schedule_id = %schedule.schedule_id,
            device_id = %schedule.device_id,
            piston = schedule.piston_number.get(),
            action = %schedule.action,
            "Scheduled fire completed"
        ),
        Err(e) => error!(
            schedule_id = %schedule.schedule_id,
            device_id = %schedule.device_id,
            error = %e,
            "Scheduled fire failed"
        ),
    }
}

/// In-memory scheduler admin for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::atomic::AtomicUsize;

    use super::{Ordering, Result, SchedulerAdmin, TriggerInfo};
    use parking_lot::Mutex;

    /// A scheduler admin that serves a fixed trigger list and counts reloads.
    #[derive(Debug, Default)]
    pub struct MockSchedulerAdmin {
        triggers: Mutex<Vec<TriggerInfo>>,
        reloads: AtomicUsize,
    }

    impl MockSchedulerAdmin {
        /// Create a new mock with no triggers.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Replace the trigger list returned by `triggers`.
        pub fn set_triggers(&self, triggers: Vec<TriggerInfo>) {
            *self.triggers.lock() = triggers;
        }

        /// Number of `reload_all` calls so far.
        #[must_use]
        pub fn reload_count(&self) -> usize {
            self.reloads.load(Ordering::SeqCst)
        }
    }

    impl SchedulerAdmin for MockSchedulerAdmin {
        fn reload_all(&self) -> Result<usize> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            Ok(self.triggers.lock().len())
        }

        fn triggers(&self) -> Vec<TriggerInfo> {
            self.triggers.lock().clone()
        }

        fn is_running(&self) -> bool {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::TestClock;
    use chrono::TimeZone;
    use pistonhub_core::{DeviceId, PistonAction, PistonNumber, PistonState, UserId};
    use pistonhub_store::{Device, DeviceStatus, RocksStore, TelemetryEventType};
    use pistonhub_transport::RecordingTransport;
    use tempfile::TempDir;

    const EVERY_SECOND: &str = "* * * * * *";

    struct Fixture {
        scheduler: CronScheduler<RocksStore, RecordingTransport>,
        clock: Arc<TestClock>,
        store: Arc<RocksStore>,
        transport: Arc<RecordingTransport>,
        owner: UserId,
        device_id: DeviceId,
        _dir: TempDir,
    }

    fn setup_with(config: SchedulerConfig) -> Fixture {
        setup_at(config, Utc::now())
    }

    fn setup_at(config: SchedulerConfig, origin: DateTime<Utc>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let clock = Arc::new(TestClock::starting_at(origin));
        let transport = Arc::new(RecordingTransport::new());
        let owner = UserId::from_bytes([1u8; 32]);
        let device_id = add_device(&store, &owner, "valves");

        let dispatcher = Arc::new(PistonDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&transport),
        ));
        Fixture {
            scheduler: CronScheduler::new(dispatcher, config)
                .with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
            clock,
            store,
            transport,
            owner,
            device_id,
            _dir: dir,
        }
    }

    fn setup() -> Fixture {
        setup_with(SchedulerConfig::default())
    }

    fn add_device(store: &RocksStore, owner: &UserId, name: &str) -> DeviceId {
        let now = Utc::now();
        let device_id = DeviceId::generate_deterministic(owner, name, 1);
        store
            .put_device(&Device {
                device_id,
                owner_id: *owner,
                name: name.to_string(),
                transport_client_id: format!("esp32-{name}"),
                status: DeviceStatus::Unknown,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        device_id
    }

    fn schedule(fx: &Fixture, cron: &str, enabled: bool) -> ScheduleDefinition {
        let now = Utc::now();
        let def = ScheduleDefinition {
            schedule_id: ScheduleId::generate(),
            name: "test".into(),
            device_id: fx.device_id,
            piston_number: PistonNumber::new(3).unwrap(),
            action: PistonAction::Activate,
            cron_expression: cron.into(),
            enabled,
            owner_id: fx.owner,
            created_at: now,
            updated_at: now,
        };
        fx.store.put_schedule(&def).unwrap();
        def
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..600 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn disable_and_reenable_cycle() {
        let fx = setup();
        fx.scheduler.start().unwrap();

        let mut def = schedule(&fx, "0 0 8 * * ?", true);
        assert!(fx.scheduler.add_schedule(&def).unwrap());
        assert_eq!(fx.scheduler.trigger_count(), 1);
        let first = fx.scheduler.next_fire_time(&def.schedule_id).unwrap();
        assert!(first > fx.clock.now());

        def.enabled = false;
        assert!(!fx.scheduler.update_schedule(&def).unwrap());
        assert_eq!(fx.scheduler.trigger_count(), 0);
        assert!(fx.scheduler.next_fire_time(&def.schedule_id).is_none());

        def.enabled = true;
        assert!(fx.scheduler.update_schedule(&def).unwrap());
        assert_eq!(fx.scheduler.trigger_count(), 1);
        assert!(fx.scheduler.next_fire_time(&def.schedule_id).unwrap() > fx.clock.now());
    }

    #[tokio::test(start_paused = true)]
    async fn start_registers_enabled_schedules_only() {
        let fx = setup();
        let a = schedule(&fx, "0 0 8 * * ?", true);
        let b = schedule(&fx, "0 30 18 * * ?", true);
        let _disabled = schedule(&fx, "0 0 12 * * ?", false);

        assert_eq!(fx.scheduler.start().unwrap(), 2);
        assert!(fx.scheduler.is_running());

        let mut ids: Vec<_> = fx
            .scheduler
            .triggers()
            .into_iter()
            .map(|t| t.schedule_id)
            .collect();
        ids.sort_by_key(ToString::to_string);
        let mut expected = vec![a.schedule_id, b.schedule_id];
        expected.sort_by_key(ToString::to_string);
        assert_eq!(ids, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_repairs_drifted_trigger_set() {
        let fx = setup();
        let a = schedule(&fx, "0 0 8 * * ?", true);
        let b = schedule(&fx, "0 0 9 * * ?", true);
        fx.scheduler.start().unwrap();

        // Drift: one trigger lost, one schedule that is no longer enabled still registered.
        fx.scheduler.registry.clear();
        let stale = schedule(&fx, "0 0 10 * * ?", true);
        fx.scheduler.add_schedule(&stale).unwrap();
        let mut stale_disabled = stale.clone();
        stale_disabled.enabled = false;
        fx.store.put_schedule(&stale_disabled).unwrap();

        assert_eq!(fx.scheduler.reload_all().unwrap(), 2);
        assert_eq!(fx.scheduler.trigger_count(), 2);
        assert!(fx.scheduler.next_fire_time(&a.schedule_id).is_some());
        assert!(fx.scheduler.next_fire_time(&b.schedule_id).is_some());
        assert!(fx.scheduler.next_fire_time(&stale.schedule_id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_ignored_while_stopped() {
        let fx = setup();
        let def = schedule(&fx, "0 0 8 * * ?", true);

        assert!(!fx.scheduler.add_schedule(&def).unwrap());
        assert!(fx.scheduler.reload_all().is_err());

        fx.scheduler.start().unwrap();
        assert_eq!(fx.scheduler.trigger_count(), 1);

        fx.scheduler.stop();
        assert!(!fx.scheduler.is_running());
        assert_eq!(fx.scheduler.trigger_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_engine_never_starts() {
        let fx = setup_with(SchedulerConfig {
            enabled: false,
            ..Default::default()
        });
        schedule(&fx, "0 0 8 * * ?", true);

        assert_eq!(fx.scheduler.start().unwrap(), 0);
        assert!(!fx.scheduler.is_running());
        assert_eq!(fx.scheduler.trigger_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_is_idempotent() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, "0 0 8 * * ?", true);
        fx.scheduler.add_schedule(&def).unwrap();

        assert!(fx.scheduler.remove_schedule(&def.schedule_id));
        assert!(!fx.scheduler.remove_schedule(&def.schedule_id));
        assert!(!fx.scheduler.remove_schedule(&ScheduleId::generate()));
        assert_eq!(fx.scheduler.trigger_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_expression_is_rejected() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, "0 0 0 1 1 ? 2020", true);

        assert!(matches!(
            fx.scheduler.add_schedule(&def),
            Err(SchedulerError::NoUpcomingFire(id)) if id == def.schedule_id
        ));
        assert_eq!(fx.scheduler.trigger_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unified_fire_records_state_and_telemetry() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, EVERY_SECOND, true);
        fx.scheduler.add_schedule(&def).unwrap();

        let store = Arc::clone(&fx.store);
        let device_id = fx.device_id;
        wait_for(|| store.count_telemetry_by_device(&device_id).unwrap() >= 1).await;

        let piston = fx
            .store
            .get_piston(&fx.device_id, def.piston_number)
            .unwrap()
            .unwrap();
        assert_eq!(piston.state, PistonState::Active);

        let events = fx.store.list_telemetry_by_device(&fx.device_id, 100).unwrap();
        let oldest = events.last().unwrap();
        assert_eq!(oldest.event_type, TelemetryEventType::Activated);
        assert_eq!(oldest.payload["scheduleId"], def.schedule_id.to_string());
        assert!(fx.transport.publish_count() >= 1);
        assert_eq!(
            fx.transport.published()[0].token.to_string(),
            "activate:3"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_only_fire_leaves_state_alone() {
        let fx = setup_with(SchedulerConfig {
            fire_scope: FireScope::TransmitOnly,
            ..Default::default()
        });
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, EVERY_SECOND, true);
        fx.scheduler.add_schedule(&def).unwrap();

        let transport = Arc::clone(&fx.transport);
        wait_for(|| transport.publish_count() >= 1).await;

        assert!(fx.store.list_pistons(&fx.device_id).unwrap().is_empty());
        assert_eq!(fx.store.count_telemetry_by_device(&fx.device_id).unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_schedule_does_not_block_others() {
        let fx = setup();
        fx.scheduler.start().unwrap();

        // Owned by someone else: every fire fails the ownership recheck.
        let mut broken = schedule(&fx, EVERY_SECOND, true);
        broken.owner_id = UserId::from_bytes([9u8; 32]);
        broken.piston_number = PistonNumber::new(1).unwrap();
        fx.store.put_schedule(&broken).unwrap();
        fx.scheduler.add_schedule(&broken).unwrap();

        let healthy = schedule(&fx, EVERY_SECOND, true);
        fx.scheduler.add_schedule(&healthy).unwrap();

        let store = Arc::clone(&fx.store);
        let device_id = fx.device_id;
        wait_for(|| store.count_telemetry_by_device(&device_id).unwrap() >= 2).await;

        assert_eq!(fx.scheduler.trigger_count(), 2);
        assert!(fx
            .store
            .get_piston(&fx.device_id, PistonNumber::new(1).unwrap())
            .unwrap()
            .is_none());
        assert!(fx
            .transport
            .published()
            .iter()
            .all(|c| c.token.piston.get() == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_outage_is_retried_only_by_next_occurrence() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        fx.transport.set_failing(true);
        let def = schedule(&fx, EVERY_SECOND, true);
        fx.scheduler.add_schedule(&def).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.transport.publish_count(), 0);
        assert_eq!(fx.scheduler.trigger_count(), 1);

        fx.transport.set_failing(false);
        let transport = Arc::clone(&fx.transport);
        wait_for(|| transport.publish_count() >= 1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_update_cannot_revive_deleted_schedule() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, "0 0 8 * * ?", true);
        assert!(fx.scheduler.add_schedule(&def).unwrap());

        // An update commits, then a delete commits and is mirrored before the
        // update's own mirror call arrives.
        let mut patched = def.clone();
        patched.name = "renamed".into();
        fx.store.put_schedule(&patched).unwrap();
        fx.store.delete_schedule(&def.schedule_id).unwrap();
        assert!(fx.scheduler.remove_schedule(&def.schedule_id));

        assert!(!fx.scheduler.update_schedule(&patched).unwrap());
        assert_eq!(fx.scheduler.trigger_count(), 0);
        assert!(fx.scheduler.next_fire_time(&def.schedule_id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stored_disable_wins_over_caller_copy() {
        let fx = setup();
        fx.scheduler.start().unwrap();
        let mut def = schedule(&fx, EVERY_SECOND, false);
        def.enabled = true;

        assert!(!fx.scheduler.add_schedule(&def).unwrap());
        assert_eq!(fx.scheduler.trigger_count(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.transport.publish_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn forward_clock_jump_fires_once_within_a_tick() {
        let origin = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let fx = setup_at(SchedulerConfig::default(), origin);
        fx.scheduler.start().unwrap();
        let def = schedule(&fx, "0 0 8 * * ?", true);
        fx.scheduler.add_schedule(&def).unwrap();
        assert_eq!(
            fx.scheduler.next_fire_time(&def.schedule_id),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap())
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Wall clock leaps past the 08:00 slot while the monotonic timer barely moves.
        fx.clock.jump(chrono::Duration::hours(9));
        tokio::time::sleep(MAX_TICK + Duration::from_secs(1)).await;

        let store = Arc::clone(&fx.store);
        let device_id = fx.device_id;
        wait_for(|| store.count_telemetry_by_device(&device_id).unwrap() >= 1).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(fx.transport.publish_count(), 1);
        assert_eq!(fx.store.count_telemetry_by_device(&fx.device_id).unwrap(), 1);
        assert_eq!(
            fx.scheduler.next_fire_time(&def.schedule_id),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_leaves_engine_stopped() {
        let dir = TempDir::new().unwrap();
        {
            let mut opts = rocksdb::Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            let db = rocksdb::DB::open_cf(
                &opts,
                dir.path(),
                pistonhub_store::schema::all_column_families(),
            )
            .unwrap();
            let enabled = db
                .cf_handle(pistonhub_store::schema::cf::SCHEDULES_ENABLED)
                .unwrap();
            db.put_cf(enabled, b"truncated", b"").unwrap();
        }

        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = Arc::new(PistonDispatcher::new(store, transport));
        let scheduler = CronScheduler::new(dispatcher, SchedulerConfig::default());

        assert!(matches!(scheduler.start(), Err(SchedulerError::Store(_))));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.trigger_count(), 0);
        assert!(matches!(scheduler.reload_all(), Err(SchedulerError::Disabled)));
    }

    #[test]
    fn late_wakeup_skips_missed_slots() {
        let cron = StandardCron;
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let woke = Utc.with_ymd_and_hms(2026, 3, 1, 11, 20, 0).unwrap();

        let next = following_fire(&cron, "0 0 * * * ?", scheduled, woke).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn early_wakeup_never_repeats_slot() {
        let cron = StandardCron;
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let woke = scheduled - chrono::Duration::milliseconds(5);

        let next = following_fire(&cron, "0 0 * * * ?", scheduled, woke).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    }
}
