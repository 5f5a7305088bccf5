//! HS256 access tokens.
//!
//! The signing secret lives inside a [`JwtService`] value rather than in a
//! global, so tests and services can each hold their own keys.

use crate::CryptoError;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;
const MIN_SECRET_LEN: usize = 16;

/// Access token claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub email: String,
}

impl Claims {
    /// Resolve the subject claim into a user id.
    pub fn user_id(&self) -> Result<Uuid, CryptoError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| CryptoError::InvalidToken("subject is not a user id".to_string()))
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl JwtService {
    /// Build a service from a shared secret and the access token lifetime.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, CryptoError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(CryptoError::WeakSecret(secret.len()));
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Lifetime applied by [`JwtService::issue_token`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue an access token for `user_id` with the configured lifetime.
    pub fn issue_token(&self, user_id: Uuid, email: &str) -> Result<String, CryptoError> {
        self.issue_token_with_ttl(user_id, email, self.ttl)
    }

    pub fn issue_token_with_ttl(
        &self,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
    ) -> Result<String, CryptoError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            email: email.to_string(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CryptoError::Encode(e.to_string()))
    }

    /// Decode and verify a token. Expired tokens and bad signatures are errors.
    pub fn decode_token(&self, token: &str) -> Result<Claims, CryptoError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CryptoError::Expired,
                _ => CryptoError::InvalidToken(e.to_string()),
            })
    }
}
