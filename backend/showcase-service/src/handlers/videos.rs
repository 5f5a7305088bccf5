use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::Video;
use crate::services::videos::{reported_status, too_large, validate_content_type, VideoService};
use crate::services::UploadForm;

/// Upper bound for the `title` text field
const MAX_TITLE_FIELD_BYTES: usize = 4 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub task_id: Uuid,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VideoListItem {
    pub video_id: Uuid,
    pub title: String,
    pub status: &'static str,
    pub is_public: bool,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoDetail {
    pub video_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub status: &'static str,
    pub is_public: bool,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_url: Option<String>,
    pub original_url: Option<String>,
    pub votes: i32,
    pub duration_seconds: Option<i32>,
    pub file_size_bytes: i64,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoActionResponse {
    pub message: &'static str,
    pub video_id: Uuid,
}

fn list_item(service: &VideoService, video: Video) -> VideoListItem {
    VideoListItem {
        processed_url: service.processed_url(&video),
        video_id: video.id,
        title: video.title,
        status: reported_status(video.status),
        is_public: video.status.is_public(),
        uploaded_at: video.uploaded_at,
        processed_at: video.processed_at,
    }
}

fn detail(service: &VideoService, video: Video) -> VideoDetail {
    let processed_url = service.processed_url(&video);
    let original_url = processed_url
        .is_none()
        .then(|| service.asset_url(&video));

    VideoDetail {
        processed_url,
        original_url,
        video_id: video.id,
        title: video.title,
        original_filename: video.original_filename,
        status: reported_status(video.status),
        is_public: video.status.is_public(),
        uploaded_at: video.uploaded_at,
        processed_at: video.processed_at,
        votes: video.votes_count,
        duration_seconds: video.duration_seconds,
        file_size_bytes: video.file_size_bytes,
        failure_reason: video.failure_reason,
    }
}

/// Read the `title` and `video_file` fields. The file is rejected as soon
/// as its declared type is wrong or it grows past `max_bytes`.
async fn read_upload_form(mut payload: Multipart, max_bytes: usize) -> Result<UploadForm> {
    let mut title: Option<String> = None;
    let mut file: Option<(Option<String>, Option<String>, BytesMut)> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| {
                        AppError::Validation(format!("Malformed multipart body: {}", e))
                    })?;
                    if buf.len() + chunk.len() > MAX_TITLE_FIELD_BYTES {
                        return Err(AppError::Validation("Title is too long".to_string()));
                    }
                    buf.extend_from_slice(&chunk);
                }
                let text = String::from_utf8(buf.to_vec())
                    .map_err(|_| AppError::Validation("Title must be UTF-8 text".to_string()))?;
                title = Some(text);
            }
            "video_file" => {
                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                validate_content_type(content_type.as_deref())?;
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string);

                let mut buf = BytesMut::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| {
                        AppError::Validation(format!("Malformed multipart body: {}", e))
                    })?;
                    if buf.len() + chunk.len() > max_bytes {
                        return Err(too_large(max_bytes));
                    }
                    buf.extend_from_slice(&chunk);
                }
                file = Some((filename, content_type, buf));
            }
            _ => {
                // Drain unknown fields so the stream can advance.
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| {
                        AppError::Validation(format!("Malformed multipart body: {}", e))
                    })?;
                }
            }
        }
    }

    let title = title.ok_or_else(|| AppError::Validation("Field 'title' is required".to_string()))?;
    let (filename, content_type, bytes) = file
        .ok_or_else(|| AppError::Validation("Field 'video_file' is required".to_string()))?;

    Ok(UploadForm {
        title,
        filename,
        content_type,
        bytes: bytes.freeze(),
    })
}

/// POST /api/videos/upload
pub async fn upload(
    state: web::Data<AppState>,
    user: UserId,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_upload_form(payload, state.videos.max_upload_bytes()).await?;
    let video = state.videos.accept_upload(user.0, form).await?;

    Ok(HttpResponse::Created().json(UploadResponse {
        message: "Video uploaded successfully. Processing started.",
        task_id: video.id,
        status: reported_status(video.status),
    }))
}

/// GET /api/videos
pub async fn list(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let videos = state.videos.list_owned(user.0).await?;
    let items: Vec<VideoListItem> = videos
        .into_iter()
        .map(|v| list_item(&state.videos, v))
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/videos/{video_id}
pub async fn get(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video = state.videos.get_owned(user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail(&state.videos, video)))
}

/// PUT /api/videos/{video_id}/publish
pub async fn publish(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video = state.videos.publish(user.0, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(VideoActionResponse {
        message: "Video published successfully",
        video_id: video.id,
    }))
}

/// DELETE /api/videos/{video_id}
pub async fn delete(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    state.videos.delete(user.0, video_id).await?;

    Ok(HttpResponse::Ok().json(VideoActionResponse {
        message: "Video deleted successfully",
        video_id,
    }))
}
