//! Cron expression evaluation.
//!
//! Schedules use six- or seven-field expressions
//! (`second minute hour day-of-month month day-of-week [year]`). The rest of
//! the system only talks to the [`CronEvaluator`] trait.

use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Narrow interface over a cron engine.
pub trait CronEvaluator: Send + Sync {
    /// Check the syntax of `expression`, returning the parser's diagnostic on failure.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the expression cannot be parsed.
    fn validate(&self, expression: &str) -> Result<(), String>;

    /// Whether `expression` parses.
    fn is_valid(&self, expression: &str) -> bool {
        self.validate(expression).is_ok()
    }

    /// First fire time strictly after `after`, or `None` if the expression is
    /// invalid or will never fire again.
    fn next_fire_after(&self, expression: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// [`CronEvaluator`] backed by the `cron` crate.
///
/// A standalone `?` field ("no specific value") is accepted and treated as `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCron;

impl StandardCron {
    fn parse(expression: &str) -> Result<::cron::Schedule, String> {
        let fields: Vec<&str> = expression
            .split_whitespace()
            .map(|f| if f == "?" { "*" } else { f })
            .collect();
        if !(6..=7).contains(&fields.len()) {
            return Err(format!("expected 6 or 7 fields, got {}", fields.len()));
        }
        ::cron::Schedule::from_str(&fields.join(" ")).map_err(|e| e.to_string())
    }
}

impl CronEvaluator for StandardCron {
    fn validate(&self, expression: &str) -> Result<(), String> {
        Self::parse(expression).map(|_| ())
    }

    fn next_fire_after(&self, expression: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Self::parse(expression).ok()?.after(&after).next()
    }
}
