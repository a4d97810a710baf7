//! Bearer-token extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use pistonhub_auth::{JwtValidator, ValidatedClaims};
use pistonhub_control::DeviceControl;
use pistonhub_core::UserId;

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated caller.
///
/// Extracted from `Authorization: Bearer <token>`. Every device and schedule
/// operation is scoped to `user_id`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The caller's user ID (`sub` claim).
    pub user_id: UserId,
}

impl AuthUser {
    /// Create an `AuthUser` from validated claims.
    #[must_use]
    pub const fn from_claims(claims: &ValidatedClaims) -> Self {
        Self {
            user_id: claims.user_id,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl<C, V> FromRequestParts<Arc<GatewayState<C, V>>> for AuthUser
where
    C: DeviceControl + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state.jwt_validator.validate(token).await?;

        Ok(Self::from_claims(&claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::{Duration, Utc};

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/devices");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn auth_user_from_claims() {
        let user_id = UserId::from_bytes([7u8; 32]);
        let claims = ValidatedClaims {
            user_id,
            expires_at: Utc::now() + Duration::hours(1),
        };

        assert_eq!(AuthUser::from_claims(&claims).user_id, user_id);
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer  "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
