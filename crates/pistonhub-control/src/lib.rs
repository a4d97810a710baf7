//! Device control and schedule management for pistonhub.
//!
//! This crate holds the business logic between the HTTP gateway and the
//! storage and transport layers: ownership checks, piston command dispatch,
//! the eight-piston view, telemetry reads, and validated schedule CRUD.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Gateway (HTTP)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ControlService                        │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Devices    │ │  Schedules  │ │  PistonDispatcher   │◄───┼── CronScheduler
//! │  │  Pistons    │ │  (validate) │ │  (per-device lock)  │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Store   │   │Transport │   │ Scheduler│
//!        │ (RocksDB)│   │  (MQTT)  │   │  client  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use pistonhub_control::{
//!     ControlConfig, ControlService, DeviceControl, NoopSchedulerClient, PistonDispatcher,
//!     RegisterDeviceRequest,
//! };
//! use pistonhub_core::{PistonAction, UserId};
//! use pistonhub_store::RocksStore;
//! use pistonhub_transport::{MqttTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/pistonhub")?);
//! let transport = Arc::new(MqttTransport::connect(TransportConfig::from_env()));
//! let dispatcher = Arc::new(PistonDispatcher::new(store, transport));
//!
//! let control = ControlService::new(
//!     dispatcher,
//!     Arc::new(NoopSchedulerClient::new()),
//!     ControlConfig::default(),
//! );
//!
//! let owner = UserId::from_bytes([0u8; 32]);
//! let device = control
//!     .register_device(&owner, RegisterDeviceRequest::new("greenhouse", "esp32-gh"))
//!     .await?;
//! control
//!     .control_piston(&owner, &device.device_id, 3, PistonAction::Activate)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cron;
pub mod dispatcher;
pub mod error;
pub mod ownership;
pub mod pistons;
pub mod scheduler_client;
pub mod schedules;
pub mod service;
pub mod types;

#[cfg(test)]
mod testing;

pub use crate::cron::{CronEvaluator, StandardCron};
pub use dispatcher::{DispatchOrigin, PistonDispatcher};
pub use error::{ControlError, Result, ValidationError};
pub use scheduler_client::{NoopSchedulerClient, SchedulerClient};
pub use service::{ControlService, DeviceControl};
pub use types::{
    ControlConfig, CreateScheduleRequest, PistonSnapshot, PistonView, RegisterDeviceRequest,
    UpdateScheduleRequest,
};

#[cfg(any(test, feature = "test-utils"))]
pub use scheduler_client::mock::{MockSchedulerClient, SchedulerCall};

// Re-export commonly used types from dependencies for convenience
pub use pistonhub_core::{DeviceId, PistonAction, PistonNumber, PistonState, ScheduleId, UserId};
pub use pistonhub_store::{Device, DeviceStatus, ScheduleDefinition, TelemetryEvent};
