//! JWT validation and claims extraction.
//!
//! Tokens are HS256-signed with a shared secret. The `sub` claim carries the
//! hex-encoded user ID that every ownership check is made against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use pistonhub_core::UserId;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Validated claims extracted from a JWT.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The user ID extracted from the `sub` claim.
    pub user_id: UserId,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    exp: u64,
}

/// Validator for HS256 tokens signed with a shared secret.
pub struct HmacValidator {
    key: DecodingKey,
    validation: Validation,
}

impl HmacValidator {
    /// Create a validator from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the secret is empty.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(AuthError::Internal("JWT secret is empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }
}

#[async_trait]
impl JwtValidator for HmacValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let token_data = decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = token_data.claims;
        let user_id = UserId::from_hex(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        tracing::trace!(user_id = %user_id, "token validated");
        Ok(ValidatedClaims {
            user_id,
            expires_at,
        })
    }
}

/// A mock JWT validator for testing.
///
/// This validator accepts any token in the format `test-token:<user_hex>`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockJwtValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let user_hex = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<user>".to_string()))?;

        let user_id = UserId::from_hex(user_hex).map_err(|_| AuthError::InvalidUserId)?;

        Ok(ValidatedClaims {
            user_id,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "unit-test-secret";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
    }

    fn user_hex() -> String {
        "ab".repeat(32)
    }

    fn sign(claims: &Claims<'_>, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            secret: SECRET.to_string(),
            issuer: issuer.map(str::to_string),
        }
    }

    fn in_one_hour() -> i64 {
        (Utc::now() + chrono::Duration::hours(1)).timestamp()
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let validator = HmacValidator::new(&config(None)).unwrap();
        let sub = user_hex();
        let token = sign(
            &Claims {
                sub: &sub,
                exp: in_one_hour(),
                iss: None,
            },
            SECRET,
        );

        let claims = validator.validate(&token).await.unwrap();
        assert_eq!(claims.user_id.to_hex(), sub);
    }

    #[tokio::test]
    async fn expired_token_rejected() {
        let validator = HmacValidator::new(&config(None)).unwrap();
        let sub = user_hex();
        let token = sign(
            &Claims {
                sub: &sub,
                exp: (Utc::now() - chrono::Duration::hours(1)).timestamp(),
                iss: None,
            },
            SECRET,
        );

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let validator = HmacValidator::new(&config(None)).unwrap();
        let sub = user_hex();
        let token = sign(
            &Claims {
                sub: &sub,
                exp: in_one_hour(),
                iss: None,
            },
            "some-other-secret",
        );

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn issuer_checked_when_configured() {
        let validator = HmacValidator::new(&config(Some("pistonhub"))).unwrap();
        let sub = user_hex();
        let token = sign(
            &Claims {
                sub: &sub,
                exp: in_one_hour(),
                iss: Some("someone-else"),
            },
            SECRET,
        );

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[tokio::test]
    async fn malformed_subject_rejected() {
        let validator = HmacValidator::new(&config(None)).unwrap();
        let token = sign(
            &Claims {
                sub: "alice",
                exp: in_one_hour(),
                iss: None,
            },
            SECRET,
        );

        let result = validator.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidUserId)));
    }

    #[test]
    fn empty_secret_rejected() {
        let cfg = AuthConfig {
            secret: String::new(),
            issuer: None,
        };
        assert!(matches!(
            HmacValidator::new(&cfg),
            Err(AuthError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn mock_validator_works() {
        let validator = MockJwtValidator;
        let token = format!("test-token:{}", user_hex());

        let claims = validator.validate(&token).await.unwrap();
        assert_eq!(claims.user_id.to_hex(), user_hex());
    }

    #[tokio::test]
    async fn mock_validator_rejects_invalid() {
        let validator = MockJwtValidator;

        assert!(validator.validate("invalid-token").await.is_err());
        assert!(matches!(
            validator.validate("test-token:not-hex").await,
            Err(AuthError::InvalidUserId)
        ));
    }
}
