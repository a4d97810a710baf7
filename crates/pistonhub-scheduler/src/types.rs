//! Types for the scheduler crate.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pistonhub_core::ScheduleId;
use serde::{Deserialize, Serialize};

/// What a scheduled fire does beyond transmitting the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FireScope {
    /// Run the full dispatch path: ownership recheck, transmit, piston
    /// upsert, and telemetry append.
    #[default]
    Unified,
    /// Transmit only. Piston state and telemetry are left untouched.
    TransmitOnly,
}

impl FromStr for FireScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unified" => Ok(Self::Unified),
            "transmit_only" | "transmit-only" => Ok(Self::TransmitOnly),
            other => Err(format!("unknown fire scope: {other}")),
        }
    }
}

impl fmt::Display for FireScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unified => f.write_str("unified"),
            Self::TransmitOnly => f.write_str("transmit_only"),
        }
    }
}

/// A registered trigger as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    /// Schedule the trigger belongs to.
    pub schedule_id: ScheduleId,
    /// When the trigger fires next.
    pub next_fire_at: DateTime<Utc>,
}

/// Configuration for the cron scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the engine registers triggers at all.
    pub enabled: bool,
    /// A fire later than this many seconds is logged as a misfire.
    pub misfire_grace_seconds: u64,
    /// What a fire does.
    pub fire_scope: FireScope,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            misfire_grace_seconds: 60,
            fire_scope: FireScope::Unified,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `SCHEDULER_ENABLED`: `false` or `0` disables the engine
    /// - `SCHEDULER_MISFIRE_GRACE_SECONDS`: Lateness tolerated before a fire is logged as a misfire
    /// - `SCHEDULER_FIRE_SCOPE`: `unified` (default) or `transmit_only`
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SCHEDULER_ENABLED") {
            config.enabled = !matches!(val.to_ascii_lowercase().as_str(), "false" | "0" | "no");
        }
        if let Ok(val) = std::env::var("SCHEDULER_MISFIRE_GRACE_SECONDS") {
            if let Ok(n) = val.parse() {
                config.misfire_grace_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("SCHEDULER_FIRE_SCOPE") {
            match val.parse() {
                Ok(scope) => config.fire_scope = scope,
                Err(e) => tracing::warn!(error = %e, "Ignoring SCHEDULER_FIRE_SCOPE"),
            }
        }

        config
    }

    /// The misfire grace period.
    #[must_use]
    pub const fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_seconds)
    }
}
