//! Wire format for client-facing errors.
//!
//! Every HTTP error leaves the service as `{"detail": "...", "timestamp": "..."}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self::at(detail, Utc::now())
    }

    pub fn at(detail: impl Into<String>, when: DateTime<Utc>) -> Self {
        Self {
            detail: detail.into(),
            timestamp: when.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
