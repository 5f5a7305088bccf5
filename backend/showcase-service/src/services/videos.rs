/// Owner-facing video operations: upload acceptance, listing, publish, delete
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::VideoRepository;
use crate::error::{AppError, Result};
use crate::models::{NewVideo, Video, VideoEvent, VideoStatus};
use crate::services::job_queue::{JobQueue, ProcessingJob};
use crate::storage::{BlobStore, Namespace};

pub const MAX_TITLE_CHARS: usize = 200;

/// A parsed multipart upload
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub title: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub struct VideoService {
    videos: Arc<dyn VideoRepository>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
    max_upload_bytes: usize,
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            videos,
            blobs,
            queue,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Store the raw bytes, create the row in `uploaded`, queue processing.
    pub async fn accept_upload(&self, owner_id: Uuid, form: UploadForm) -> Result<Video> {
        let title = validate_title(&form.title)?;
        validate_content_type(form.content_type.as_deref())?;
        if form.bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if form.bytes.len() > self.max_upload_bytes {
            return Err(too_large(self.max_upload_bytes));
        }

        let video_id = Uuid::new_v4();
        let file_size_bytes = form.bytes.len() as i64;
        let storage_key = self
            .blobs
            .save(form.bytes, &format!("{}.mp4", video_id), Namespace::Uploads)
            .await?;

        let new_video = NewVideo {
            id: video_id,
            owner_id,
            title,
            original_filename: form
                .filename
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "upload.mp4".to_string()),
            storage_key: storage_key.clone(),
            file_size_bytes,
        };
        let video = match self.videos.create(new_video).await {
            Ok(video) => video,
            Err(e) => {
                warn!(video_id = %video_id, key = %storage_key, "Orphaned upload blob after failed insert");
                return Err(e);
            }
        };

        let job = ProcessingJob {
            video_id: video.id,
            source_key: storage_key,
        };
        if let Err(e) = self.queue.try_enqueue(job) {
            // The row stays `uploaded` and is redelivered on the next start.
            warn!(video_id = %video.id, error = %e, "Processing job not queued, left in uploaded");
        }

        info!(video_id = %video.id, owner_id = %owner_id, bytes = file_size_bytes, "Upload accepted");
        Ok(video)
    }

    pub async fn list_owned(&self, owner_id: Uuid) -> Result<Vec<Video>> {
        self.videos.list_by_owner(owner_id).await
    }

    /// Missing is `NotFound`; someone else's is `Forbidden`.
    pub async fn get_owned(&self, owner_id: Uuid, video_id: Uuid) -> Result<Video> {
        let video = self
            .videos
            .find_by_id(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

        if !video.is_owned_by(owner_id) {
            return Err(AppError::Forbidden(
                "You don't have permission to access this video".to_string(),
            ));
        }
        Ok(video)
    }

    pub async fn publish(&self, owner_id: Uuid, video_id: Uuid) -> Result<Video> {
        let video = self.get_owned(owner_id, video_id).await?;
        let target = video.status.apply(VideoEvent::Publish).map_err(|_| {
            AppError::InvalidState(format!(
                "Video must be processed before publishing (current: {})",
                video.status
            ))
        })?;

        if !self.videos.publish(video_id).await? {
            return Err(AppError::InvalidState(
                "Video changed state while publishing".to_string(),
            ));
        }

        info!(video_id = %video_id, "Video published");
        Ok(Video {
            status: target,
            ..video
        })
    }

    /// Remove the record, then its blob (best-effort). Public videos stay.
    pub async fn delete(&self, owner_id: Uuid, video_id: Uuid) -> Result<()> {
        let video = self.get_owned(owner_id, video_id).await?;
        if !video.status.is_deletable() || !self.videos.delete_unpublished(video_id).await? {
            return Err(AppError::Conflict("Cannot delete a public video".to_string()));
        }

        if !self.blobs.delete(&video.storage_key).await {
            warn!(video_id = %video_id, key = %video.storage_key, "Video blob was already gone");
        }
        info!(video_id = %video_id, "Video deleted");
        Ok(())
    }

    /// Locator for the rendered asset, once there is one.
    pub fn processed_url(&self, video: &Video) -> Option<String> {
        video.has_rendered_asset().then(|| self.asset_url(video))
    }

    /// Public videos use the anonymous locator; anything else is only
    /// reachable through the owner-checked media route.
    pub fn asset_url(&self, video: &Video) -> String {
        if video.status.is_public() {
            self.blobs.resolve(&video.storage_key)
        } else {
            format!("/api/videos/{}/media", video.id)
        }
    }

    /// File behind `processed/{file_name}`, only while its video is public.
    pub async fn public_asset(&self, file_name: &str) -> Result<PathBuf> {
        let not_found = || AppError::NotFound("Video not found".to_string());
        let video_id = file_name
            .strip_suffix(".mp4")
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(not_found)?;

        let key = format!("{}/{}", Namespace::Processed.as_str(), file_name);
        match self.videos.find_by_id(video_id).await? {
            Some(video) if video.status.is_public() && video.storage_key == key => {
                Ok(self.blobs.path_of(&key)?)
            }
            _ => Err(not_found()),
        }
    }

    /// Current asset of an owned video: the render, or the raw upload before that.
    pub async fn owned_asset(&self, owner_id: Uuid, video_id: Uuid) -> Result<PathBuf> {
        let video = self.get_owned(owner_id, video_id).await?;
        Ok(self.blobs.path_of(&video.storage_key)?)
    }
}

pub fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    let chars = title.chars().count();
    if chars == 0 || chars > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_content_type(content_type: Option<&str>) -> Result<()> {
    let is_video = content_type
        .and_then(|ct| ct.trim().parse::<mime::Mime>().ok())
        .map_or(false, |m| m.type_() == mime::VIDEO);
    if !is_video {
        return Err(AppError::Validation("File must be a video".to_string()));
    }
    Ok(())
}

pub fn too_large(limit: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "File size exceeds maximum allowed size of {}MB",
        limit / (1024 * 1024)
    ))
}

/// Status shown to clients; public videos report `processed` plus `is_public`.
pub fn reported_status(status: VideoStatus) -> &'static str {
    status.status_column()
}
