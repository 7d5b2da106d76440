use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError};

/// Lifetime of every issued bearer token.
pub const TOKEN_LIFETIME_DAYS: i64 = 1;

/// Claims
///
/// The payload signed into every bearer token. The email is the only identity the
/// service knows about; there is no server-side session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The customer's email, as passed to `PUT /user/{email}`.
    pub email: String,
    /// Issued At (seconds since the epoch).
    pub iat: usize,
    /// Expiration Time (seconds since the epoch). Tokens past this are rejected.
    pub exp: usize,
}

/// issue_token
///
/// Signs a fresh HS256 token for `email`, valid for `TOKEN_LIFETIME_DAYS`.
/// Every call yields a new token, even for the same email.
pub fn issue_token(email: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        email: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Checks signature and expiry against `secret` and returns the decoded claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("bearer token expired"),
            kind => tracing::debug!(?kind, "bearer token rejected"),
        }
        ApiError::InvalidToken
    })
}

/// AuthUser
///
/// The verified identity of a request on a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The email claim of the presented token.
    pub email: String,
}

/// AuthUser Extractor Implementation
///
/// Usable as a handler argument or through `auth_middleware`:
/// 1. No `Authorization` header → `ApiError::MissingToken` (401).
/// 2. Header present but not a valid, unexpired `Bearer` token signed with the
///    configured secret → `ApiError::InvalidToken` (403).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(ApiError::MissingToken)?;

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::InvalidToken)?;

        let claims = verify_token(token, &config.jwt_secret)?;

        Ok(AuthUser {
            email: claims.email,
        })
    }
}
