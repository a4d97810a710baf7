//! Cron scheduler engine for pistonhub.
//!
//! This crate provides [`CronScheduler`], which keeps one timer task per
//! enabled schedule and fires the schedule's piston command through the same
//! [`PistonDispatcher`](pistonhub_control::PistonDispatcher) the HTTP API uses.
//! It handles:
//!
//! - An explicit `start`/`stop` lifecycle
//! - Mirroring schedule create/update/delete into the trigger set
//! - Full resync from the store with `reload_all`
//! - Misfires (one catch-up fire after a late wake-up or a wall-clock jump)
//! - Fault isolation: a failing fire is logged and affects no other schedule
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 ControlService (schedule CRUD)                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │ SchedulerClient
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CronScheduler                            │
//! │  ┌─────────────────┐   ┌──────────────────────────────────┐     │
//! │  │ TriggerRegistry │──▶│ timer task per schedule          │     │
//! │  │ (id → trigger)  │   │ sleep → spawn fire → next slot   │     │
//! │  └─────────────────┘   └──────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              PistonDispatcher (per-device lock)                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pistonhub_control::PistonDispatcher;
//! use pistonhub_scheduler::{CronScheduler, SchedulerAdmin, SchedulerConfig};
//! use pistonhub_store::RocksStore;
//! use pistonhub_transport::{MqttTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/pistonhub")?);
//! let transport = Arc::new(MqttTransport::connect(TransportConfig::from_env()));
//! let dispatcher = Arc::new(PistonDispatcher::new(store, transport));
//!
//! let scheduler = CronScheduler::new(dispatcher, SchedulerConfig::from_env());
//! let registered = scheduler.start()?;
//! println!("{registered} triggers registered");
//!
//! for trigger in scheduler.triggers() {
//!     println!("{} fires at {}", trigger.schedule_id, trigger.next_fire_at);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! Enable the `test-utils` feature to use [`MockSchedulerAdmin`], which serves
//! a fixed trigger list and counts reloads, and [`TestClock`], a wall clock
//! that can be jumped independently of Tokio's timer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use engine::{following_fire, CronScheduler, SchedulerAdmin, MAX_TICK};
pub use error::{Result, SchedulerError};
pub use registry::{Trigger, TriggerRegistry};
pub use types::{FireScope, SchedulerConfig, TriggerInfo};

#[cfg(any(test, feature = "test-utils"))]
pub use clock::mock::TestClock;
#[cfg(any(test, feature = "test-utils"))]
pub use engine::mock::MockSchedulerAdmin;
