//! Bearer JWT verification and the user extractors
//!
//! Tokens are minted by an external auth service; this service only checks
//! the HMAC signature, expiry and the optional issuer/audience, then reads
//! the user id from `sub` (or `user_id`).

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::{Error, Result},
};

/// JWT claims this service reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    #[serde(alias = "user_id")]
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Username (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Verifies HMAC-signed access tokens
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let algorithm = match config.algorithm.to_uppercase().as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            alg => {
                return Err(Error::Config(Box::new(figment::Error::from(format!(
                    "Unsupported JWT algorithm: {alg} (expected HS256, HS384 or HS512)"
                )))))
            }
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_secret(config.secret.as_bytes())),
            validation,
        })
    }

    /// Check signature and registered claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Verify a token and resolve the user it names
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser> {
        let claims = self.verify(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| {
            Error::Unauthorized("Token subject is not a user id".to_string())
        })?;
        Ok(CurrentUser {
            id,
            username: claims.username,
        })
    }
}

/// Bearer token from the Authorization header.
///
/// `Ok(None)` when the header is absent, an error when it is present but
/// not a Bearer token.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| Error::Unauthorized("Invalid Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(Some(token)),
        _ => Err(Error::Unauthorized(
            "Invalid Authorization header format".to_string(),
        )),
    }
}

/// Authenticated caller; rejects with 401 when no valid token is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: Option<String>,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = extract_token(&parts.headers)?.ok_or_else(|| {
            Error::Unauthorized("Authentication credentials were not provided".to_string())
        })?;
        JwtVerifier::from_ref(state).authenticate(token)
    }
}

/// Caller if a token was sent. A missing header yields `None`; an invalid
/// token is still rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        match extract_token(&parts.headers)? {
            Some(token) => Ok(Self(Some(JwtVerifier::from_ref(state).authenticate(token)?))),
            None => Ok(Self(None)),
        }
    }
}
