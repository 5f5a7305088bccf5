use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::VideoRepository;
use crate::error::Result;
use crate::models::{Pagination, RankingQuery};
use crate::storage::BlobStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub position: i64,
    pub video_id: Uuid,
    pub title: String,
    pub username: String,
    pub city: String,
    pub votes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicVideoItem {
    pub video_id: Uuid,
    pub title: String,
    pub processed_url: String,
    pub username: String,
    pub city: String,
    pub votes: i32,
}

/// Read side of the public catalog
pub struct RankingService {
    videos: Arc<dyn VideoRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl RankingService {
    pub fn new(videos: Arc<dyn VideoRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { videos, blobs }
    }

    /// Public videos by votes, positions numbered from `offset + 1`.
    pub async fn rankings(&self, query: &RankingQuery) -> Result<Vec<RankedItem>> {
        let page = query.page()?;
        let rows = self.videos.rankings(query.city_filter(), page).await?;

        Ok(rows
            .into_iter()
            .zip(page.first_position()..)
            .map(|(row, position)| RankedItem {
                position,
                video_id: row.video_id,
                title: row.title,
                username: format!("{} {}", row.first_name, row.last_name),
                city: row.city,
                votes: row.votes_count,
            })
            .collect())
    }

    pub async fn public_videos(&self, page: Pagination) -> Result<Vec<PublicVideoItem>> {
        page.check()?;
        let rows = self.videos.list_public(page).await?;

        Ok(rows
            .into_iter()
            .map(|row| PublicVideoItem {
                processed_url: self.blobs.resolve(&row.storage_key),
                video_id: row.video_id,
                title: row.title,
                username: format!("{} {}", row.first_name, row.last_name),
                city: row.city,
                votes: row.votes_count,
            })
            .collect())
    }
}
