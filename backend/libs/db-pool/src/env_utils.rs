//! Environment variable parsing.
//!
//! A missing variable falls back to its default; a present but unparseable
//! one is an error instead of being silently replaced.

use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("environment variable {0} is required")]
    Missing(String),
    #[error("environment variable {key} has invalid value {value:?}")]
    Invalid { key: String, value: String },
}

/// Parse `key`, or return `default` when it is unset or blank.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, EnvError> {
    Ok(env_optional(key)?.unwrap_or(default))
}

/// Parse `key` when it is set and non-blank.
pub fn env_optional<T: FromStr>(key: &str) -> Result<Option<T>, EnvError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|_| EnvError::Invalid {
                    key: key.to_string(),
                    value: raw,
                })
        }
        _ => Ok(None),
    }
}
