//! Token codec: issue and verify signed session tokens.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;

/// Marketplace role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "provider" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject (user id).
    pub sub: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenPayload {
    /// Payload issued now and valid for `ttl_secs`.
    pub fn new(sub: impl Into<String>, role: Option<Role>, email: Option<String>, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: sub.into(),
            iat: now,
            exp: now + ttl_secs,
            role,
            email,
        }
    }

    /// Strict comparison: a token expiring this very second is expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// Errors produced while issuing or decoding tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Narrow interface over the signing scheme.
pub trait TokenCodec: Send + Sync {
    /// Verify the signature and structure of `token`. Expiry is not checked here.
    fn decode(&self, token: &str) -> Result<TokenPayload, TokenError>;

    /// Sign a payload into a token string.
    fn issue(&self, payload: &TokenPayload) -> Result<String, TokenError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    #[serde(flatten)]
    payload: TokenPayload,
}

/// HS256 JWT codec.
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl JwtCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is decided by the gate so it can redirect instead of reject.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iat", "iss"]);
        validation.set_issuer(&[issuer.as_str()]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.secret.as_bytes(), config.issuer.clone())
    }
}

impl TokenCodec for JwtCodec {
    fn decode(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let payload = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.payload)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        // Identity claims are forwarded as headers
        if !is_header_safe(&payload.sub) {
            return Err(TokenError::Malformed("subject is empty or not a valid header value".into()));
        }
        if payload.email.as_deref().is_some_and(|e| !is_header_safe(e)) {
            return Err(TokenError::Malformed("email is not a valid header value".into()));
        }
        Ok(payload)
    }

    fn issue(&self, payload: &TokenPayload) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            payload: payload.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

fn is_header_safe(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_control)
}
