//! Bearer sessions. A signed JWT names the account; handlers receive the
//! caller as an explicit [`AuthenticatedUser`] argument.

use std::fmt;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::UserId;
use crate::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HMAC signing keys plus the session lifetime. Cheap to clone.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<KeyMaterial>,
}

struct KeyMaterial {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            inner: Arc::new(KeyMaterial {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                ttl,
            }),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::days(i64::from(config.token_ttl_days)),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Sign a token for `user` valid from `now` for the configured lifetime.
    pub fn issue(&self, user: &UserId, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = Claims {
            sub: user.0.clone(),
            iat: now.timestamp(),
            exp: (now + self.inner.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(SessionError::Signing)
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.inner.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unable to sign session token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("session token expired")]
    Expired,
    #[error("session token invalid")]
    Invalid,
}

/// The caller of a protected route, resolved from `Authorization: Bearer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| unauthorized("Not authorized, no token"))?;

        let keys = SessionKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "rejected session token");
            unauthorized("Not authorized, token failed")
        })?;

        Ok(Self(UserId(claims.sub)))
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn keys() -> SessionKeys {
        SessionKeys::new(b"unit-test-secret", Duration::days(30))
    }

    #[test]
    fn issued_tokens_verify_with_subject_and_lifetime() {
        let keys = keys();
        let now = Utc::now();
        let token = keys
            .issue(&UserId("user-7".to_string()), now)
            .expect("token signs");

        let claims = keys.verify(&token).expect("token verifies");
        assert_eq!(claims.sub, "user-7");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn tokens_from_other_secrets_are_rejected() {
        let other = SessionKeys::new(b"someone-else", Duration::days(30));
        let token = other
            .issue(&UserId("user-7".to_string()), Utc::now())
            .expect("token signs");

        assert!(matches!(keys().verify(&token), Err(SessionError::Invalid)));
        assert!(matches!(keys().verify("garbage"), Err(SessionError::Invalid)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = keys();
        let issued = Utc::now() - Duration::days(31);
        let token = keys
            .issue(&UserId("user-7".to_string()), issued)
            .expect("token signs");

        assert!(matches!(keys.verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn debug_output_omits_key_material() {
        let rendered = format!("{:?}", keys());
        assert!(!rendered.contains("unit-test-secret"));
    }

    #[tokio::test]
    async fn extractor_requires_bearer_header() {
        let keys = keys();
        let (mut parts, _) = Request::builder()
            .uri("/api/users/profile")
            .body(())
            .expect("request builds")
            .into_parts();

        let rejection = match AuthenticatedUser::from_request_parts(&mut parts, &keys).await {
            Ok(user) => panic!("unexpected user {user:?}"),
            Err(response) => response,
        };
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn extractor_resolves_user_from_token() {
        let keys = keys();
        let token = keys
            .issue(&UserId("user-9".to_string()), Utc::now())
            .expect("token signs");
        let (mut parts, _) = Request::builder()
            .uri("/api/users/profile")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .expect("request builds")
            .into_parts();

        let user = match AuthenticatedUser::from_request_parts(&mut parts, &keys).await {
            Ok(user) => user,
            Err(response) => panic!("token rejected with {}", response.status()),
        };
        assert_eq!(user, AuthenticatedUser(UserId("user-9".to_string())));
    }
}
