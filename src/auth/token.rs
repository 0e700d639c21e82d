use axum::http::HeaderValue;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::Principal;
use crate::models::Role;

/// Lifetime of a login token: one day.
pub const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Claims
///
/// The payload signed into every bearer token. `role` is a closed enum, so a token carrying
/// any other role string fails to decode and is treated as invalid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject: the author id, or the fixed admin sentinel.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Only present on author tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// No `Authorization` header, or not of the form `Bearer <token>`.
    #[error("no bearer token supplied")]
    Missing,
    #[error("token expired")]
    Expired,
    /// Bad signature, malformed token, or undecodable claims.
    #[error("token invalid")]
    Invalid,
    #[error("token could not be signed")]
    Signing,
}

/// TokenIssuer
///
/// Signs and verifies HS256 tokens with the process-wide secret. Keys are derived once at
/// construction; there is no revocation list, so rotating the secret is the only way to
/// invalidate outstanding tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

/// TokenState
///
/// Shared handle to the issuer, extracted from the application state via `FromRef`.
pub type TokenState = Arc<TokenIssuer>;

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, TOKEN_TTL_SECS)
    }

    pub fn with_ttl(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // No grace period: a token is expired the second after its `exp`.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Issues a token for `principal`, valid from now for the configured lifetime.
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: principal.id(),
            email: principal.email().to_string(),
            role: principal.role(),
            display_name: principal.display_name().map(str::to_owned),
            iat: now,
            exp: now + self.ttl_secs,
        };
        self.sign(&claims)
    }

    /// Signs arbitrary claims as-is.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| {
            tracing::error!("token signing failed: {:?}", e);
            TokenError::Signing
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => {
                    tracing::debug!("token rejected: {:?}", e);
                    Err(TokenError::Invalid)
                }
            },
        }
    }

    /// Extracts and verifies the token from an `Authorization: Bearer <token>` header value.
    pub fn verify_bearer(&self, header: Option<&HeaderValue>) -> Result<Claims, TokenError> {
        let token = header
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::Missing)?;

        self.verify(token)
    }
}
