//! Piston primitives shared by the dispatcher, the scheduler, and the store.
//!
//! A device exposes [`PISTON_COUNT`] addressable actuator channels. Commands
//! are sent to the device as a [`CommandToken`] of the form `<action>:<number>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of pistons on every device.
pub const PISTON_COUNT: u8 = 8;

/// A piston channel number, guaranteed to be in `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct PistonNumber(u8);

impl PistonNumber {
    /// Validate a raw piston number.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPistonNumber` when `n` is outside `1..=8`.
    pub fn new(n: i64) -> Result<Self, CoreError> {
        u8::try_from(n)
            .ok()
            .filter(|v| (1..=PISTON_COUNT).contains(v))
            .map(Self)
            .ok_or(CoreError::InvalidPistonNumber(n))
    }

    /// Return the numeric value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterate over every piston number in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=PISTON_COUNT).map(Self)
    }
}

impl TryFrom<i64> for PistonNumber {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PistonNumber> for u8 {
    fn from(n: PistonNumber) -> Self {
        n.0
    }
}

impl fmt::Display for PistonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a command asks the piston to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PistonAction {
    /// Extend / energize the piston.
    Activate,
    /// Retract / de-energize the piston.
    Deactivate,
}

impl PistonAction {
    /// Lowercase wire form used in command tokens.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        }
    }

    /// The state a piston is in after this action is applied.
    #[must_use]
    pub const fn resulting_state(self) -> PistonState {
        match self {
            Self::Activate => PistonState::Active,
            Self::Deactivate => PistonState::Inactive,
        }
    }
}

impl FromStr for PistonAction {
    type Err = CoreError;

    /// Parse an action, ignoring ASCII case (`ACTIVATE` and `activate` are equal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("activate") {
            Ok(Self::Activate)
        } else if s.eq_ignore_ascii_case("deactivate") {
            Ok(Self::Deactivate)
        } else {
            Err(CoreError::InvalidAction(s.to_string()))
        }
    }
}

impl fmt::Display for PistonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of a piston.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PistonState {
    /// The last command applied was an activation.
    Active,
    /// Never commanded, or the last command applied was a deactivation.
    #[default]
    Inactive,
}

/// The command sent to a device over the messaging transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandToken {
    /// Requested action.
    pub action: PistonAction,
    /// Target piston.
    pub piston: PistonNumber,
}

impl CommandToken {
    /// Build a token for the given action and piston.
    #[must_use]
    pub const fn new(action: PistonAction, piston: PistonNumber) -> Self {
        Self { action, piston }
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.piston.get())
    }
}
