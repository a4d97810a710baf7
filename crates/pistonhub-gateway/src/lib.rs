//! HTTP gateway for pistonhub.
//!
//! This crate exposes device registration, piston control, telemetry, and
//! schedule management over a JSON API. It handles:
//!
//! - Bearer-token authentication; every operation is scoped to the caller
//! - Mapping control and scheduler errors onto one JSON error envelope
//! - Internal endpoints for scheduler resync and trigger introspection
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients (HTTP)                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     pistonhub-gateway                       │
//! │  ┌─────────────┐ ┌─────────────────┐ ┌──────────────────┐   │
//! │  │  AuthUser   │ │ Router          │ │ ApiError         │   │
//! │  │  extractor  │ │ + Handlers      │ │ envelope         │   │
//! │  └─────────────┘ └─────────────────┘ └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────────┐
//!        │ Control  │   │  Auth    │   │  Scheduler   │
//!        │ Service  │   │ (JWT)    │   │  (admin)     │
//!        └──────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pistonhub_auth::{AuthConfig, HmacValidator};
//! use pistonhub_control::{ControlConfig, ControlService, PistonDispatcher, SchedulerClient};
//! use pistonhub_gateway::{create_router, GatewayConfig, GatewayState};
//! use pistonhub_scheduler::{CronScheduler, SchedulerAdmin, SchedulerConfig};
//! use pistonhub_store::RocksStore;
//! use pistonhub_transport::{MqttTransport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/pistonhub")?);
//! let transport = Arc::new(MqttTransport::connect(TransportConfig::from_env()));
//! let dispatcher = Arc::new(PistonDispatcher::new(store, transport));
//!
//! let scheduler = Arc::new(CronScheduler::new(Arc::clone(&dispatcher), SchedulerConfig::default()));
//! let client: Arc<dyn SchedulerClient> = scheduler.clone();
//! let control = Arc::new(ControlService::new(dispatcher, client, ControlConfig::default()));
//! let validator = Arc::new(HmacValidator::new(&AuthConfig::from_env())?);
//! scheduler.start()?;
//!
//! let admin: Arc<dyn SchedulerAdmin> = scheduler;
//! let state = GatewayState::new(control, validator, admin, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;

pub use auth::AuthUser;
