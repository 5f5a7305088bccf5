//! In-process store implementing every repository trait.
//!
//! A single mutex guards all tables, so a conditional update or a
//! check-and-insert is atomic the same way a row lock makes it atomic in
//! PostgreSQL. Used by the test suites and by `STORE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CastOutcome, UserRepository, VideoRepository, VoteRepository};
use crate::error::{AppError, Result};
use crate::models::{
    NewUser, NewVideo, Pagination, PublicVideo, RankingEntry, User, Video, VideoEvent,
    VideoStatus,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    videos: HashMap<Uuid, Video>,
    votes: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    /// Apply `event` to the video if it is currently in `from`.
    fn transition(
        &mut self,
        id: Uuid,
        from: VideoStatus,
        event: VideoEvent,
    ) -> Result<Option<&mut Video>> {
        let to = from.apply(event)?;
        match self.videos.get_mut(&id) {
            Some(video) if video.status == from => {
                video.status = to;
                Ok(Some(video))
            }
            _ => Ok(None),
        }
    }

    fn page<T>(rows: Vec<T>, page: Pagination) -> Vec<T> {
        rows.into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect()
    }

    fn public_videos(&self) -> impl Iterator<Item = (&Video, &User)> {
        self.videos
            .values()
            .filter(|v| v.status == VideoStatus::Public)
            .filter_map(move |v| self.users.get(&v.owner_id).map(|u| (v, u)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            city: user.city,
            country: user.country,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl VideoRepository for MemoryStore {
    async fn create(&self, video: NewVideo) -> Result<Video> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&video.owner_id) {
            return Err(AppError::Internal(format!(
                "video owner {} does not exist",
                video.owner_id
            )));
        }
        let created = video.into_video(Utc::now());
        tables.videos.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>> {
        Ok(self.tables.lock().await.videos.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>> {
        let tables = self.tables.lock().await;
        let mut videos: Vec<Video> = tables
            .videos
            .values()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(videos)
    }

    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>> {
        let tables = self.tables.lock().await;
        let mut videos: Vec<Video> = tables
            .videos
            .values()
            .filter(|v| v.status == status)
            .cloned()
            .collect();
        videos.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(videos)
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .transition(id, VideoStatus::Uploaded, VideoEvent::Claim)?
            .is_some())
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        storage_key: &str,
        duration_seconds: i32,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.transition(id, VideoStatus::Processing, VideoEvent::Complete)? {
            Some(video) => {
                video.storage_key = storage_key.to_string();
                video.duration_seconds = Some(duration_seconds);
                video.failure_reason = None;
                video.processed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.transition(id, VideoStatus::Processing, VideoEvent::Fail)? {
            Some(video) => {
                video.failure_reason = Some(reason.to_string());
                video.processed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn publish(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .transition(id, VideoStatus::Processed, VideoEvent::Publish)?
            .is_some())
    }

    async fn delete_unpublished(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.videos.get(&id) {
            Some(video) if video.status.is_deletable() => {
                tables.videos.remove(&id);
                tables.votes.retain(|(_, video_id)| *video_id != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_public(&self, page: Pagination) -> Result<Vec<PublicVideo>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<(&Video, &User)> = tables.public_videos().collect();
        rows.sort_by(|(a, _), (b, _)| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));

        let rows = rows
            .into_iter()
            .map(|(v, u)| PublicVideo {
                video_id: v.id,
                title: v.title.clone(),
                storage_key: v.storage_key.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                city: u.city.clone(),
                votes_count: v.votes_count,
            })
            .collect();
        Ok(Tables::page(rows, page))
    }

    async fn rankings(&self, city: Option<&str>, page: Pagination) -> Result<Vec<RankingEntry>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<(&Video, &User)> = tables
            .public_videos()
            .filter(|(_, u)| city.map_or(true, |c| u.city == c))
            .collect();
        rows.sort_by(|(a, _), (b, _)| b.votes_count.cmp(&a.votes_count).then(a.id.cmp(&b.id)));

        let rows = rows
            .into_iter()
            .map(|(v, u)| RankingEntry {
                video_id: v.id,
                title: v.title.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                city: u.city.clone(),
                votes_count: v.votes_count,
            })
            .collect();
        Ok(Tables::page(rows, page))
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn cast(&self, voter_id: Uuid, video_id: Uuid) -> Result<CastOutcome> {
        let mut tables = self.tables.lock().await;

        let votable = tables
            .videos
            .get(&video_id)
            .map_or(false, |v| v.status == VideoStatus::Public);
        if !votable {
            return Ok(CastOutcome::NotVotable);
        }
        if !tables.votes.insert((voter_id, video_id)) {
            return Ok(CastOutcome::Duplicate);
        }

        match tables.videos.get_mut(&video_id) {
            Some(video) => {
                video.votes_count += 1;
                Ok(CastOutcome::Recorded {
                    votes_count: video.votes_count,
                })
            }
            None => Ok(CastOutcome::NotVotable),
        }
    }
}
