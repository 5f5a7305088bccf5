use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of an uploaded clip.
///
/// ```text
/// uploaded --claim--> processing --complete--> processed --publish--> public
///                          \
///                           --fail--> failed
/// ```
///
/// `Public` is stored as `status = 'processed'` plus `is_public = true`, so a
/// public video is always a processed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
    Public,
}

/// Something that moves a video between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    /// Worker takes ownership of an upload
    Claim,
    /// Probe and transcode succeeded
    Complete,
    /// Probe rejected the media or the pipeline broke
    Fail,
    /// Owner makes a processed video votable
    Publish,
}

impl VideoEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Publish => "publish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a video that is {}", .event.as_str(), .from.as_str())]
pub struct TransitionError {
    pub from: VideoStatus,
    pub event: VideoEvent,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Public => "public",
        }
    }

    /// Rebuild the status from the `(status, is_public)` column pair.
    ///
    /// `is_public` on anything but `processed` is not a valid row.
    pub fn from_columns(status: &str, is_public: bool) -> Option<Self> {
        match (status, is_public) {
            ("uploaded", false) => Some(Self::Uploaded),
            ("processing", false) => Some(Self::Processing),
            ("processed", false) => Some(Self::Processed),
            ("processed", true) => Some(Self::Public),
            ("failed", false) => Some(Self::Failed),
            _ => None,
        }
    }

    /// Value stored in the `status` column.
    pub fn status_column(&self) -> &'static str {
        match self {
            Self::Public => "processed",
            other => other.as_str(),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Public)
    }

    /// Owners may delete anything that is not public.
    pub fn is_deletable(&self) -> bool {
        !self.is_public()
    }

    /// The single transition function. Every status change goes through here.
    pub fn apply(self, event: VideoEvent) -> Result<VideoStatus, TransitionError> {
        use VideoEvent::*;
        use VideoStatus::*;

        match (self, event) {
            (Uploaded, Claim) => Ok(Processing),
            (Processing, Complete) => Ok(Processed),
            (Processing, Fail) => Ok(Failed),
            (Processed, Publish) => Ok(Public),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    /// Blob key of the current asset: the raw upload until processing
    /// completes, the rendered asset afterwards
    pub storage_key: String,
    pub status: VideoStatus,
    pub failure_reason: Option<String>,
    pub duration_seconds: Option<i32>,
    pub file_size_bytes: i64,
    pub votes_count: i32,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn has_rendered_asset(&self) -> bool {
        matches!(self.status, VideoStatus::Processed | VideoStatus::Public)
    }
}

/// Row inserted when an upload is accepted
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub storage_key: String,
    pub file_size_bytes: i64,
}

impl NewVideo {
    pub fn into_video(self, uploaded_at: DateTime<Utc>) -> Video {
        Video {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            original_filename: self.original_filename,
            storage_key: self.storage_key,
            status: VideoStatus::Uploaded,
            failure_reason: None,
            duration_seconds: None,
            file_size_bytes: self.file_size_bytes,
            votes_count: 0,
            uploaded_at,
            processed_at: None,
        }
    }
}
