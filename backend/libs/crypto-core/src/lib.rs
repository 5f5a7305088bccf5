//! Credential primitives shared by the showcase services.
//!
//! - [`password`]: Argon2id hashing and verification
//! - [`jwt`]: HS256 access tokens bound to an explicit [`jwt::JwtService`] value
//!
//! Nothing in this crate keeps process-wide key state; callers construct the
//! service once at startup and hand it to whoever needs it.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtService};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
    #[error("token encoding failed: {0}")]
    Encode(String),
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("signing secret too short: {0} bytes")]
    WeakSecret(usize),
}
