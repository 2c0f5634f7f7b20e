//! Signed session tokens and single-use email sign-in tokens.
//!
//! A session token is an HS256 JWT carrying the account id and email. The
//! server keeps no session table: a token is valid while its signature
//! verifies and its `exp` is in the future.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;
use crate::storage::models::VerificationToken;
use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,
    #[error("Session token signature mismatch")]
    BadSignature,
    #[error("Session expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                SessionError::BadSignature
            }
            _ => SessionError::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// The authenticated caller, handed explicitly to handlers that need one.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Signing keys and lifetime for session tokens
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Build keys from configuration, generating a throwaway secret when
    /// none is configured.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ring::error::Unspecified> {
        let ttl = Duration::hours(config.ttl_hours);
        match config.secret {
            Some(ref secret) => Ok(Self::new(secret.as_bytes(), ttl)),
            None => {
                tracing::warn!(
                    "SESSION_SECRET not set; using a random key. Sessions will not survive a restart."
                );
                Ok(Self::new(&random_bytes(32)?, ttl))
            }
        }
    }

    /// Issue a token for an account, valid for the configured lifetime.
    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user_id, email, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(Session {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Fill `len` bytes from the system CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, ring::error::Unspecified> {
    let mut buf = vec![0u8; len];
    SystemRandom::new().fill(&mut buf)?;
    Ok(buf)
}

/// Tokens are stored by digest so a database dump cannot be replayed.
pub fn token_digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(digest::digest(&digest::SHA256, token.as_bytes()).as_ref())
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Random source failure")]
    Random,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Create and store a single-use sign-in token for `email`.
pub fn issue_verification_token(
    db: &Database,
    email: &str,
    ttl: Duration,
) -> Result<String, VerificationError> {
    let bytes = random_bytes(32).map_err(|_| VerificationError::Random)?;
    let token = URL_SAFE_NO_PAD.encode(bytes);

    db.put_verification_token(
        &token_digest(&token),
        &VerificationToken {
            identifier: email.to_lowercase(),
            expires: Utc::now() + ttl,
        },
    )?;
    Ok(token)
}

/// Consume a sign-in token. Returns true only for an unexpired token that
/// was issued for `email`; the token is gone afterwards either way.
pub fn consume_verification_token(
    db: &Database,
    email: &str,
    token: &str,
) -> Result<bool, DatabaseError> {
    let stored = db.take_verification_token(&token_digest(token))?;
    Ok(stored.is_some_and(|t| t.identifier == email.to_lowercase() && t.expires > Utc::now()))
}
