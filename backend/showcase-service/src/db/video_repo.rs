use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::VideoRepository;
use crate::error::{AppError, Result};
use crate::models::{
    NewVideo, Pagination, PublicVideo, RankingEntry, Video, VideoEvent, VideoStatus,
};

const VIDEO_COLUMNS: &str = "id, user_id, title, original_filename, file_path, status, \
     is_public, failure_reason, duration_seconds, file_size_bytes, votes_count, \
     uploaded_at, processed_at";

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    original_filename: String,
    file_path: String,
    status: String,
    is_public: bool,
    failure_reason: Option<String>,
    duration_seconds: Option<i32>,
    file_size_bytes: i64,
    votes_count: i32,
    uploaded_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<VideoRow> for Video {
    type Error = AppError;

    fn try_from(row: VideoRow) -> Result<Self> {
        let status = VideoStatus::from_columns(&row.status, row.is_public).ok_or_else(|| {
            AppError::Internal(format!(
                "video {} has invalid status {:?} (public={})",
                row.id, row.status, row.is_public
            ))
        })?;

        Ok(Video {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            original_filename: row.original_filename,
            storage_key: row.file_path,
            status,
            failure_reason: row.failure_reason,
            duration_seconds: row.duration_seconds,
            file_size_bytes: row.file_size_bytes,
            votes_count: row.votes_count,
            uploaded_at: row.uploaded_at,
            processed_at: row.processed_at,
        })
    }
}

pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a conditional status change: the row moves from `from` to whatever
    /// `from.apply(event)` yields, and only if it is still in `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: VideoStatus,
        event: VideoEvent,
    ) -> Result<bool> {
        let to = from.apply(event)?;

        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = $2, is_public = $3
            WHERE id = $1 AND status = $4 AND is_public = $5
            "#,
        )
        .bind(id)
        .bind(to.status_column())
        .bind(to.is_public())
        .bind(from.status_column())
        .bind(from.is_public())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn create(&self, video: NewVideo) -> Result<Video> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            r#"
            INSERT INTO videos (id, user_id, title, original_filename, file_path, status, file_size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(video.id)
        .bind(video.owner_id)
        .bind(&video.title)
        .bind(&video.original_filename)
        .bind(&video.storage_key)
        .bind(VideoStatus::Uploaded.status_column())
        .bind(video.file_size_bytes)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Video::try_from).transpose()
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = $1 ORDER BY uploaded_at DESC, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Video::try_from).collect()
    }

    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos \
             WHERE status = $1 AND is_public = $2 ORDER BY uploaded_at ASC, id"
        ))
        .bind(status.status_column())
        .bind(status.is_public())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Video::try_from).collect()
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<bool> {
        self.transition(id, VideoStatus::Uploaded, VideoEvent::Claim)
            .await
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        storage_key: &str,
        duration_seconds: i32,
    ) -> Result<bool> {
        let from = VideoStatus::Processing;
        let to = from.apply(VideoEvent::Complete)?;

        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = $2, file_path = $3, duration_seconds = $4,
                failure_reason = NULL, processed_at = NOW()
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(id)
        .bind(to.status_column())
        .bind(storage_key)
        .bind(duration_seconds)
        .bind(from.status_column())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool> {
        let from = VideoStatus::Processing;
        let to = from.apply(VideoEvent::Fail)?;

        let result = sqlx::query(
            r#"
            UPDATE videos
            SET status = $2, failure_reason = $3, processed_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(to.status_column())
        .bind(reason)
        .bind(from.status_column())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn publish(&self, id: Uuid) -> Result<bool> {
        self.transition(id, VideoStatus::Processed, VideoEvent::Publish)
            .await
    }

    async fn delete_unpublished(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1 AND NOT is_public")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_public(&self, page: Pagination) -> Result<Vec<PublicVideo>> {
        let rows = sqlx::query_as::<_, PublicVideo>(
            r#"
            SELECT v.id AS video_id, v.title, v.file_path AS storage_key,
                   u.first_name, u.last_name, u.city, v.votes_count
            FROM videos v
            JOIN users u ON u.id = v.user_id
            WHERE v.is_public AND v.status = 'processed'
            ORDER BY v.uploaded_at DESC, v.id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn rankings(&self, city: Option<&str>, page: Pagination) -> Result<Vec<RankingEntry>> {
        let rows = sqlx::query_as::<_, RankingEntry>(
            r#"
            SELECT v.id AS video_id, v.title, u.first_name, u.last_name, u.city, v.votes_count
            FROM videos v
            JOIN users u ON u.id = v.user_id
            WHERE v.is_public AND v.status = 'processed'
              AND ($1::TEXT IS NULL OR u.city = $1)
            ORDER BY v.votes_count DESC, v.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(city)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
