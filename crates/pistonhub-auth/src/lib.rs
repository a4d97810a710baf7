//! JWT authentication for pistonhub.
//!
//! This crate validates bearer tokens issued by the account service and
//! extracts the caller's [`UserId`](pistonhub_core::UserId):
//!
//! - HS256 signature validation with a shared secret
//! - Expiry and optional issuer checks
//! - A mock validator for handler tests
//!
//! # Example
//!
//! ```no_run
//! use pistonhub_auth::{AuthConfig, HmacValidator, JwtValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = HmacValidator::new(&AuthConfig::from_env())?;
//!
//! // In a request handler:
//! let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims = validator.validate(token).await?;
//!
//! println!("User ID: {}", claims.user_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwt::{HmacValidator, JwtValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for token validation.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret.
    pub secret: String,
    /// Expected `iss` claim; not checked when `None`.
    pub issuer: Option<String>,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `JWT_SECRET`: Shared signing secret
    /// - `JWT_ISSUER`: Expected issuer (optional)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            issuer: std::env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
        }
    }
}
