//! Video file delivery
//!
//! Nothing under the storage root is served wholesale. Anonymous viewers get
//! rendered files of public videos; owners get whatever their video currently
//! points at.
use actix_files::NamedFile;
use actix_web::web;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::middleware::UserId;

async fn open(path: std::path::PathBuf) -> Result<NamedFile> {
    NamedFile::open_async(&path)
        .await
        .map_err(|_| AppError::NotFound("Video file not found".to_string()))
}

/// GET /storage/processed/{file_name}
pub async fn public_asset(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<NamedFile> {
    let file = state.videos.public_asset(&path.into_inner()).await?;
    open(file).await
}

/// GET /api/videos/{video_id}/media
pub async fn owned_asset(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<Uuid>,
) -> Result<NamedFile> {
    let file = state.videos.owned_asset(user.0, path.into_inner()).await?;
    open(file).await
}
