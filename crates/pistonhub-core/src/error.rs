//! Common error types for pistonhub.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors raised while parsing domain primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A piston number outside `1..=8` was supplied.
    #[error("invalid piston number: {0} (expected 1-8)")]
    InvalidPistonNumber(i64),

    /// An action other than activate/deactivate was supplied.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}
