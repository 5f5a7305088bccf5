/// Persistence for users, videos and votes
///
/// Each repository is a trait so services can run against PostgreSQL in
/// production and [`MemoryStore`] in tests. Status writes are conditional on
/// the current status; the `bool` they return says whether the row moved.
pub mod memory;
pub mod user_repo;
pub mod video_repo;
pub mod vote_repo;

pub use memory::MemoryStore;
pub use user_repo::PgUserRepository;
pub use video_repo::PgVideoRepository;
pub use vote_repo::PgVoteRepository;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    NewUser, NewVideo, Pagination, PublicVideo, RankingEntry, User, Video, VideoStatus,
};

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    tracing::debug!("Running database migrations");
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. A taken email is `AppError::Conflict`.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: NewVideo) -> Result<Video>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Video>>;
    /// Owner's videos, newest first
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>>;
    /// Videos currently in `status`, oldest first
    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>>;

    /// `uploaded -> processing`, only if the row is still `uploaded`.
    async fn claim_for_processing(&self, id: Uuid) -> Result<bool>;
    /// `processing -> processed`, swapping in the rendered asset.
    async fn mark_processed(&self, id: Uuid, storage_key: &str, duration_seconds: i32)
        -> Result<bool>;
    /// `processing -> failed`.
    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool>;
    /// `processed -> public`.
    async fn publish(&self, id: Uuid) -> Result<bool>;
    /// Delete the row unless it is public.
    async fn delete_unpublished(&self, id: Uuid) -> Result<bool>;

    /// Public videos, newest first
    async fn list_public(&self, page: Pagination) -> Result<Vec<PublicVideo>>;
    /// Public videos by vote count (desc), ties broken by id
    async fn rankings(&self, city: Option<&str>, page: Pagination) -> Result<Vec<RankingEntry>>;
}

/// Result of trying to record a ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Recorded { votes_count: i32 },
    /// The (voter, video) pair already has a vote
    Duplicate,
    /// Video missing or not public
    NotVotable,
}

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Insert the vote and bump the counter as one atomic unit.
    async fn cast(&self, voter_id: Uuid, video_id: Uuid) -> Result<CastOutcome>;
}
