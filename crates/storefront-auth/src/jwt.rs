//! JWT token management

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Registration waiting for its activation link to be followed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Password change waiting for its confirmation link to be followed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReset {
    pub email: String,
    pub password_hash: String,
}

/// Payload carried by a signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenClaims {
    PendingRegistration(PendingRegistration),
    PendingReset(PendingReset),
    Session { id: i64 },
}

impl TokenClaims {
    fn kind(&self) -> &'static str {
        match self {
            TokenClaims::PendingRegistration(_) => "pending_registration",
            TokenClaims::PendingReset(_) => "pending_reset",
            TokenClaims::Session { .. } => "session",
        }
    }
}

/// Wire claims: the payload plus registered time claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    data: TokenClaims,
    /// Expiration time (Unix timestamp)
    exp: i64,
    /// Issued at (Unix timestamp)
    iat: i64,
}

/// Lifetimes of the tokens issued by the API
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    /// Activation and password-reset links
    pub confirmation: Duration,
    /// Login sessions
    pub session: Duration,
    /// Sessions re-issued by the refresh endpoint
    pub refresh: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            confirmation: Duration::minutes(10),
            session: Duration::minutes(90),
            refresh: Duration::minutes(15),
        }
    }
}

/// Signs and verifies tokens with a single HMAC secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    /// Create a signer; an empty secret is refused
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::SigningKeyMissing);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign `claims` with an absolute expiry of now + `ttl`
    pub fn issue(&self, claims: &TokenClaims, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let wire = Claims {
            data: claims.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        debug!("Issuing {} token", claims.kind());

        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Check signature and expiry and return the payload
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.data),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                Err(AuthError::ExpiredToken)
            }
            Err(e) => {
                debug!("Token rejected: {}", e);
                Err(AuthError::InvalidToken)
            }
        }
    }

    /// Verify a session token and return the identity id it names
    pub fn verify_session(&self, token: &str) -> Result<i64, AuthError> {
        match self.verify(token)? {
            TokenClaims::Session { id } => Ok(id),
            _ => Err(AuthError::InvalidToken),
        }
    }

    pub fn verify_registration(&self, token: &str) -> Result<PendingRegistration, AuthError> {
        match self.verify(token)? {
            TokenClaims::PendingRegistration(pending) => Ok(pending),
            _ => Err(AuthError::InvalidToken),
        }
    }

    pub fn verify_reset(&self, token: &str) -> Result<PendingReset, AuthError> {
        match self.verify(token)? {
            TokenClaims::PendingReset(pending) => Ok(pending),
            _ => Err(AuthError::InvalidToken),
        }
    }
}
