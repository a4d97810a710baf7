//! Trigger registry.
//!
//! Holds one live trigger task per registered schedule. Dropping an entry
//! aborts its timer task; a fire already handed off to its own task keeps
//! running to completion.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use pistonhub_core::ScheduleId;
use tokio::task::JoinHandle;

use crate::types::TriggerInfo;

/// A running trigger: its timer task and the next fire time it is waiting for.
#[derive(Debug)]
pub struct Trigger {
    handle: JoinHandle<()>,
    next_fire_at: Arc<Mutex<DateTime<Utc>>>,
}

impl Trigger {
    /// Wrap a spawned timer task and the cell it publishes its next fire time to.
    #[must_use]
    pub fn new(handle: JoinHandle<()>, next_fire_at: Arc<Mutex<DateTime<Utc>>>) -> Self {
        Self {
            handle,
            next_fire_at,
        }
    }

    /// Whether the timer task is still alive.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    /// The fire time the task is currently waiting for.
    #[must_use]
    pub fn next_fire_at(&self) -> DateTime<Utc> {
        *self.next_fire_at.lock()
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Registry of live triggers keyed by schedule.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: RwLock<HashMap<ScheduleId, Trigger>>,
}

impl TriggerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger, replacing (and aborting) any previous one for the schedule.
    pub fn insert(&self, schedule_id: ScheduleId, trigger: Trigger) {
        self.triggers.write().insert(schedule_id, trigger);
    }

    /// Remove and abort the trigger for a schedule. Returns whether one existed.
    pub fn remove(&self, schedule_id: &ScheduleId) -> bool {
        self.triggers.write().remove(schedule_id).is_some()
    }

    /// Check if a live trigger is registered for the schedule.
    #[must_use]
    pub fn contains(&self, schedule_id: &ScheduleId) -> bool {
        self.triggers
            .read()
            .get(schedule_id)
            .is_some_and(Trigger::is_live)
    }

    /// Next fire time of the schedule's trigger, if it is live.
    #[must_use]
    pub fn next_fire_at(&self, schedule_id: &ScheduleId) -> Option<DateTime<Utc>> {
        self.triggers
            .read()
            .get(schedule_id)
            .filter(|t| t.is_live())
            .map(Trigger::next_fire_at)
    }

    /// Number of live triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.read().values().filter(|t| t.is_live()).count()
    }

    /// Check if no live trigger is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort and drop every trigger. Returns how many entries were removed.
    pub fn clear(&self) -> usize {
        let mut triggers = self.triggers.write();
        let n = triggers.len();
        triggers.clear();
        n
    }

    /// Live triggers ordered by next fire time.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TriggerInfo> {
        let mut infos: Vec<TriggerInfo> = self
            .triggers
            .read()
            .iter()
            .filter(|(_, t)| t.is_live())
            .map(|(id, t)| TriggerInfo {
                schedule_id: *id,
                next_fire_at: t.next_fire_at(),
            })
            .collect();
        infos.sort_by_key(|info| info.next_fire_at);
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending_trigger(at: DateTime<Utc>) -> Trigger {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        Trigger::new(handle, Arc::new(Mutex::new(at)))
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let registry = TriggerRegistry::new();
        let id = ScheduleId::generate();
        let at = Utc::now();

        assert!(!registry.contains(&id));
        registry.insert(id, pending_trigger(at));

        assert!(registry.contains(&id));
        assert_eq!(registry.next_fire_at(&id), Some(at));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn insert_replaces() {
        let registry = TriggerRegistry::new();
        let id = ScheduleId::generate();
        let later = Utc::now() + chrono::Duration::hours(1);

        registry.insert(id, pending_trigger(Utc::now()));
        registry.insert(id, pending_trigger(later));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.next_fire_at(&id), Some(later));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = TriggerRegistry::new();
        let id = ScheduleId::generate();
        registry.insert(id, pending_trigger(Utc::now()));

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn finished_tasks_are_not_live() {
        let registry = TriggerRegistry::new();
        let id = ScheduleId::generate();
        let handle = tokio::spawn(async {});
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        registry.insert(id, Trigger::new(handle, Arc::new(Mutex::new(Utc::now()))));

        assert!(!registry.contains(&id));
        assert_eq!(registry.len(), 0);
        assert!(registry.snapshot().is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_ordered_and_clear_empties() {
        let registry = TriggerRegistry::new();
        let now = Utc::now();
        let (a, b) = (ScheduleId::generate(), ScheduleId::generate());
        registry.insert(a, pending_trigger(now + chrono::Duration::minutes(5)));
        registry.insert(b, pending_trigger(now + chrono::Duration::minutes(1)));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].schedule_id, b);
        assert_eq!(snapshot[1].schedule_id, a);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}
