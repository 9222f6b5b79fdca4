use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Access tokens stay valid for one hour after issuance.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Claims
///
/// The payload signed into every access token. The resource side only ever
/// checks the signature and `exp`; the identity claims ride along for the
/// handlers and the dashboard shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's record id in the Users table.
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp. Tokens past this point are rejected everywhere.
    pub exp: usize,
}

impl Claims {
    /// Claims for a fresh login, expiring `TOKEN_TTL_SECS` from now.
    pub fn new(sub: String, email: String, role: String) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub,
            email,
            role,
            iat: now as usize,
            exp: (now + TOKEN_TTL_SECS) as usize,
        }
    }
}

/// Signs a claim set into a bearer token with the configured secret.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the decoded claims of a
/// token that passed signature and expiry validation. Nothing is looked up in
/// the record store; the token is the whole credential.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any guarded handler and as the basis of the admin
/// router's middleware layer.
///
/// Rejection: 401 with an empty body on a missing header, a malformed bearer
/// value, a bad signature, or an expired token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    // Allows the extractor to pull the AppConfig (for the signing secret).
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        // Token extraction: the Authorization header, "Bearer " prefixed.
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;

        // Expired, tampered, and malformed tokens all reject the same way.
        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let claims = token_data.claims;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}
