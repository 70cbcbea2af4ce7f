//! Session tokens: HS256 JWTs carrying the subject's identity.
//!
//! Tokens are self-contained. Nothing is stored server side; a token is valid
//! exactly when its signature matches the configured key and `now < exp`.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

pub const ISSUER: &str = "gatehouse";
pub const AUDIENCE: &str = "user";
pub const TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Error)]
pub enum Error {
    #[error("signing key is not configured")]
    MissingKey,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(subject: Uuid, issued_at: i64) -> Self {
        Self {
            sub: subject,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECONDS,
        }
    }
}

/// Issues and verifies session tokens with a process-wide symmetric key.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_key: bool,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            has_key: !key.is_empty(),
        }
    }

    /// Issue a token for `subject`, valid for one hour from now.
    ///
    /// # Errors
    /// Returns [`Error::MissingKey`] when no key is configured, or
    /// [`Error::Signing`] when encoding fails.
    pub fn issue(&self, subject: Uuid) -> Result<String, Error> {
        self.issue_at(subject, now_unix_seconds())
    }

    /// Issue a token as if the current time were `issued_at` (unix seconds).
    ///
    /// # Errors
    /// Same as [`issue`](Self::issue).
    pub fn issue_at(&self, subject: Uuid, issued_at: i64) -> Result<String, Error> {
        if !self.has_key {
            return Err(Error::MissingKey);
        }
        let claims = Claims::new(subject, issued_at);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Error::Signing)
    }

    /// Check signature, issuer, audience and expiry, and return the claims.
    ///
    /// # Errors
    /// Returns [`Error::Invalid`] for any token that is not currently valid.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        if !self.has_key {
            // HMAC accepts an empty key; never treat such a signature as valid.
            return Err(Error::Invalid(ErrorKind::InvalidKeyFormat.into()));
        }
        let claims = decode::<Claims>(token, &self.decoding, &validation())
            .map(|data| data.claims)
            .map_err(Error::Invalid)?;
        // the decoder still accepts `exp == now`
        if claims.exp <= now_unix_seconds() {
            return Err(Error::Invalid(ErrorKind::ExpiredSignature.into()));
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"***")
            .field("has_key", &self.has_key)
            .finish()
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
    validation
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
