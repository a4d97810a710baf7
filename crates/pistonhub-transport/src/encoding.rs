//! Payload encodings understood by device firmware.

use std::fmt;
use std::str::FromStr;

use pistonhub_core::{CommandToken, PistonAction};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// How a [`CommandToken`] is turned into a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// UTF-8 text of the token, e.g. `activate:3`.
    #[default]
    Plain,
    /// Two bytes: opcode (`0x01` activate, `0x00` deactivate) then piston number.
    Binary,
}

impl Encoding {
    /// Encode a command token into payload bytes.
    #[must_use]
    pub fn encode(self, token: CommandToken) -> Vec<u8> {
        match self {
            Self::Plain => token.to_string().into_bytes(),
            Self::Binary => {
                let opcode = match token.action {
                    PistonAction::Activate => 0x01,
                    PistonAction::Deactivate => 0x00,
                };
                vec![opcode, token.piston.get()]
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "binary" => Ok(Self::Binary),
            other => Err(TransportError::Config(format!("unknown encoding: {other}"))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Binary => f.write_str("binary"),
        }
    }
}
