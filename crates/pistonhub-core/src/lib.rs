//! Core types and utilities for pistonhub.
//!
//! This crate provides the foundational types used throughout the device control platform:
//!
//! - **Identifiers**: Strongly-typed IDs for users, devices, pistons, and schedules
//! - **Pistons**: Piston numbers, actions, states, and the command token sent to devices
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use pistonhub_core::{CommandToken, DeviceId, PistonAction, PistonNumber, UserId};
//!
//! let owner = UserId::from_hex(
//!     "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
//! ).unwrap();
//! let device_id = DeviceId::generate(&owner, "greenhouse-valves");
//!
//! let piston = PistonNumber::new(3).unwrap();
//! let token = CommandToken::new(PistonAction::Activate, piston);
//! assert_eq!(token.to_string(), "activate:3");
//! # let _ = device_id;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod piston;

pub use error::{CoreError, Result};
pub use ids::{DeviceId, IdError, PistonId, ScheduleId, UserId};
pub use piston::{CommandToken, PistonAction, PistonNumber, PistonState, PISTON_COUNT};
