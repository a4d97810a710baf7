//! Messaging transport for pistonhub.
//!
//! This crate provides the [`Transport`] trait through which piston commands
//! leave the system, and an MQTT-backed [`MqttTransport`]. Commands are sent
//! fire-and-forget; no delivery acknowledgement is awaited.
//!
//! # Example
//!
//! ```no_run
//! use pistonhub_core::{CommandToken, PistonAction, PistonNumber};
//! use pistonhub_transport::{MqttTransport, Transport, TransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MqttTransport::connect(TransportConfig::from_env());
//!
//! let token = CommandToken::new(PistonAction::Activate, PistonNumber::new(3)?);
//! transport.publish("esp32-greenhouse", token, transport.encoding()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! Enable the `test-utils` feature to use [`RecordingTransport`], which keeps
//! every published command in memory and can be switched into a failing mode.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod encoding;
pub mod error;
pub mod mqtt;

pub use config::TransportConfig;
pub use encoding::Encoding;
pub use error::{Result, TransportError};
pub use mqtt::{MqttTransport, Transport};

#[cfg(any(test, feature = "test-utils"))]
pub use mqtt::mock::{PublishedCommand, RecordingTransport};
